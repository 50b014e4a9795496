//! Seeded hashing of fixed-width keys.
//!
//! Every function in this crate computes the same fingerprint regardless of the
//! hardware it runs on. The implementation is picked once per process: an AES-NI
//! (x86_64) or ARMv8 AES (aarch64) backend when the host supports it, a software
//! AES backend otherwise. The choice can be pinned to the software backend by setting
//! `COLIDX_HASH_BACKEND=portable`.
//!
//! Fingerprints are persisted (bloom filters are built at write time and probed at
//! query time), so the hashing schedule is a format-level constant.

mod aes;
mod backend;
mod capabilities;

#[cfg(target_arch = "aarch64")]
mod aarch64;
#[cfg(target_arch = "x86_64")]
mod x86;


use xxhash_rust::xxh3::{xxh3_64, xxh3_128};

use backend::backend;

pub use backend::{BackendPreference, HASH_BACKEND_ENV};
pub use capabilities::Capabilities;

/// Computes the fingerprint of a 32-bit key.
#[inline]
pub fn hash32(value: u32, seed: u64) -> u64 {
    backend().hash32(value, seed)
}

/// Computes the fingerprint of a 64-bit key.
#[inline]
pub fn hash64(value: u64, seed: u64) -> u64 {
    backend().hash64(value, seed)
}

/// Computes the fingerprint of a 128-bit key.
#[inline]
pub fn hash128(value: u128, seed: u64) -> u64 {
    backend().hash128(value, seed)
}

/// Computes the fingerprints of `values` into `hashes`; `hashes[i]` is
/// `hash32(values[i], seed)`.
///
/// # Panics
///
/// Panics if the slices differ in length.
pub fn multi_hash32(values: &[u32], seed: u64, hashes: &mut [u64]) {
    assert_eq!(values.len(), hashes.len(), "multi_hash32: length mismatch");
    backend().multi_hash32(values, seed, hashes)
}

/// Computes the fingerprints of `values` into `hashes`; `hashes[i]` is
/// `hash64(values[i], seed)`.
///
/// # Panics
///
/// Panics if the slices differ in length.
pub fn multi_hash64(values: &[u64], seed: u64, hashes: &mut [u64]) {
    assert_eq!(values.len(), hashes.len(), "multi_hash64: length mismatch");
    backend().multi_hash64(values, seed, hashes)
}

/// Computes the fingerprints of `values` into `hashes`; `hashes[i]` is
/// `hash128(values[i], seed)`.
///
/// # Panics
///
/// Panics if the slices differ in length.
pub fn multi_hash128(values: &[u128], seed: u64, hashes: &mut [u64]) {
    assert_eq!(values.len(), hashes.len(), "multi_hash128: length mismatch");
    backend().multi_hash128(values, seed, hashes)
}

/// Reduces a variable-length value to a 64-bit key (XXH3-64).
///
/// The result is a key, not a fingerprint: it still has to be hashed with the
/// instance seed before it is fed into a table or a filter.
#[inline]
pub fn key64_of_bytes(value: &[u8]) -> u64 {
    xxh3_64(value)
}

/// Reduces a variable-length value to a 128-bit key (XXH3-128).
#[inline]
pub fn key128_of_bytes(value: &[u8]) -> u128 {
    xxh3_128(value)
}

mod sealed {
    pub trait Sealed {}

    impl Sealed for u32 {}
    impl Sealed for u64 {}
    impl Sealed for u128 {}
}

/// A fixed-width key: `u32`, `u64` or `u128`.
///
/// Equality is bitwise; every bit pattern, including zero, is a legal key.
pub trait Key: sealed::Sealed + Copy + Eq + Default + std::fmt::Debug + Send + Sync + 'static {
    /// Width of the key in bits.
    const BITS: u32;

    /// Computes the fingerprint of the key under `seed`.
    fn hash(self, seed: u64) -> u64;

    /// Computes the fingerprints of `values` into `hashes`.
    ///
    /// # Panics
    ///
    /// Panics if the slices differ in length.
    fn multi_hash(values: &[Self], seed: u64, hashes: &mut [u64]);

    /// Convenience form of [`Key::multi_hash`] allocating the output.
    fn multi_hash_vec(values: &[Self], seed: u64) -> Vec<u64> {
        let mut hashes = vec![0u64; values.len()];
        Self::multi_hash(values, seed, &mut hashes);
        hashes
    }
}

impl Key for u32 {
    const BITS: u32 = 32;

    #[inline]
    fn hash(self, seed: u64) -> u64 {
        hash32(self, seed)
    }

    fn multi_hash(values: &[u32], seed: u64, hashes: &mut [u64]) {
        multi_hash32(values, seed, hashes)
    }
}

impl Key for u64 {
    const BITS: u32 = 64;

    #[inline]
    fn hash(self, seed: u64) -> u64 {
        hash64(self, seed)
    }

    fn multi_hash(values: &[u64], seed: u64, hashes: &mut [u64]) {
        multi_hash64(values, seed, hashes)
    }
}

impl Key for u128 {
    const BITS: u32 = 128;

    #[inline]
    fn hash(self, seed: u64) -> u64 {
        hash128(self, seed)
    }

    fn multi_hash(values: &[u128], seed: u64, hashes: &mut [u64]) {
        multi_hash128(values, seed, hashes)
    }
}
