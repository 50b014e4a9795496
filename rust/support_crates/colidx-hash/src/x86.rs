//! AES-NI backend for x86_64.

use std::arch::x86_64::{
    __m128i, _mm_aesenc_si128, _mm_cvtsi128_si64, _mm_set_epi64x, _mm_setzero_si128,
    _mm_xor_si128,
};

use crate::{aes::ROUND_KEYS, backend::HashBackend, capabilities::Capabilities};

/// Number of independent states kept in flight by the batched kernels. `AESENC` has a
/// latency of several cycles but a throughput of one or two per cycle.
const LANES: usize = 4;

pub(crate) struct AesNiBackend(());

static AES_NI: AesNiBackend = AesNiBackend(());

impl AesNiBackend {
    /// Returns the backend if the host supports AES-NI.
    pub(crate) fn get() -> Option<&'static AesNiBackend> {
        Capabilities::get().aes.then_some(&AES_NI)
    }
}

impl HashBackend for AesNiBackend {
    fn name(&self) -> &'static str {
        "aes-ni"
    }

    #[inline]
    fn hash32(&self, value: u32, seed: u64) -> u64 {
        debug_assert!(Capabilities::get().aes);
        // SAFETY: `AesNiBackend` is only reachable through `get()`, which checks the
        // AES capability.
        unsafe { hash_small(value as u64, seed) }
    }

    #[inline]
    fn hash64(&self, value: u64, seed: u64) -> u64 {
        debug_assert!(Capabilities::get().aes);
        // SAFETY: see `hash32`.
        unsafe { hash_small(value, seed) }
    }

    #[inline]
    fn hash128(&self, value: u128, seed: u64) -> u64 {
        debug_assert!(Capabilities::get().aes);
        // SAFETY: see `hash32`.
        unsafe { hash_wide(value, seed) }
    }

    fn multi_hash32(&self, values: &[u32], seed: u64, hashes: &mut [u64]) {
        debug_assert!(Capabilities::get().aes);
        // SAFETY: see `hash32`.
        unsafe { multi_hash_small(values, seed, hashes) }
    }

    fn multi_hash64(&self, values: &[u64], seed: u64, hashes: &mut [u64]) {
        debug_assert!(Capabilities::get().aes);
        // SAFETY: see `hash32`.
        unsafe { multi_hash_small(values, seed, hashes) }
    }

    fn multi_hash128(&self, values: &[u128], seed: u64, hashes: &mut [u64]) {
        debug_assert!(Capabilities::get().aes);
        // SAFETY: see `hash32`.
        unsafe { multi_hash_wide(values, seed, hashes) }
    }
}

#[inline]
#[target_feature(enable = "aes")]
fn set_u128(value: u128) -> __m128i {
    _mm_set_epi64x((value >> 64) as i64, value as i64)
}

#[inline]
#[target_feature(enable = "aes")]
fn low_u64(state: __m128i) -> u64 {
    _mm_cvtsi128_si64(state) as u64
}

#[inline]
#[target_feature(enable = "aes")]
fn hash_small(value: u64, seed: u64) -> u64 {
    let mut state = _mm_set_epi64x(value as i64, seed as i64);
    state = _mm_aesenc_si128(state, set_u128(ROUND_KEYS[0]));
    state = _mm_aesenc_si128(state, set_u128(ROUND_KEYS[1]));
    state = _mm_aesenc_si128(state, set_u128(ROUND_KEYS[2]));
    low_u64(state)
}

#[inline]
#[target_feature(enable = "aes")]
fn seed_key(seed: u64) -> __m128i {
    let spread = _mm_set_epi64x(seed.rotate_left(32) as i64, seed as i64);
    _mm_aesenc_si128(spread, set_u128(ROUND_KEYS[0]))
}

#[inline]
#[target_feature(enable = "aes")]
fn hash_wide(value: u128, seed: u64) -> u64 {
    let mut state = _mm_xor_si128(set_u128(value), seed_key(seed));
    state = _mm_aesenc_si128(state, set_u128(ROUND_KEYS[1]));
    state = _mm_aesenc_si128(state, set_u128(ROUND_KEYS[2]));
    state = _mm_aesenc_si128(state, set_u128(ROUND_KEYS[3]));
    low_u64(state)
}

#[target_feature(enable = "aes")]
fn multi_hash_small<T>(values: &[T], seed: u64, hashes: &mut [u64])
where
    T: Copy + Into<u64>,
{
    let k0 = set_u128(ROUND_KEYS[0]);
    let k1 = set_u128(ROUND_KEYS[1]);
    let k2 = set_u128(ROUND_KEYS[2]);

    let mut value_chunks = values.chunks_exact(LANES);
    let mut hash_chunks = hashes.chunks_exact_mut(LANES);
    for (chunk, out) in (&mut value_chunks).zip(&mut hash_chunks) {
        let mut states = [_mm_setzero_si128(); LANES];
        for (state, &value) in states.iter_mut().zip(chunk) {
            let value: u64 = value.into();
            *state = _mm_set_epi64x(value as i64, seed as i64);
        }
        for key in [k0, k1, k2] {
            for state in states.iter_mut() {
                *state = _mm_aesenc_si128(*state, key);
            }
        }
        for (hash, state) in out.iter_mut().zip(states) {
            *hash = low_u64(state);
        }
    }
    for (hash, &value) in hash_chunks
        .into_remainder()
        .iter_mut()
        .zip(value_chunks.remainder())
    {
        *hash = hash_small(value.into(), seed);
    }
}

#[target_feature(enable = "aes")]
fn multi_hash_wide(values: &[u128], seed: u64, hashes: &mut [u64]) {
    let seeded = seed_key(seed);
    let k1 = set_u128(ROUND_KEYS[1]);
    let k2 = set_u128(ROUND_KEYS[2]);
    let k3 = set_u128(ROUND_KEYS[3]);

    let mut value_chunks = values.chunks_exact(LANES);
    let mut hash_chunks = hashes.chunks_exact_mut(LANES);
    for (chunk, out) in (&mut value_chunks).zip(&mut hash_chunks) {
        let mut states = [_mm_setzero_si128(); LANES];
        for (state, &value) in states.iter_mut().zip(chunk) {
            *state = _mm_xor_si128(set_u128(value), seeded);
        }
        for key in [k1, k2, k3] {
            for state in states.iter_mut() {
                *state = _mm_aesenc_si128(*state, key);
            }
        }
        for (hash, state) in out.iter_mut().zip(states) {
            *hash = low_u64(state);
        }
    }
    for (hash, &value) in hash_chunks
        .into_remainder()
        .iter_mut()
        .zip(value_chunks.remainder())
    {
        *hash = hash_wide(value, seed);
    }
}
