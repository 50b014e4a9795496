//! ARMv8 crypto extension backend for aarch64.
//!
//! `AESE` performs AddRoundKey before SubBytes/ShiftRows, so an x86 `AESENC` round is
//! `AESMC(AESE(state, 0)) ^ key`.

use std::arch::aarch64::{
    uint8x16_t, vaeseq_u8, vaesmcq_u8, vdupq_n_u8, veorq_u8, vld1q_u8, vst1q_u8,
};

use crate::{
    aes::{ROUND_KEYS, spread_seed},
    backend::HashBackend,
    capabilities::Capabilities,
};

pub(crate) struct ArmAesBackend(());

static ARM_AES: ArmAesBackend = ArmAesBackend(());

impl ArmAesBackend {
    /// Returns the backend if the host supports the AES instructions.
    pub(crate) fn get() -> Option<&'static ArmAesBackend> {
        Capabilities::get().aes.then_some(&ARM_AES)
    }
}

impl HashBackend for ArmAesBackend {
    fn name(&self) -> &'static str {
        "armv8-aes"
    }

    #[inline]
    fn hash32(&self, value: u32, seed: u64) -> u64 {
        debug_assert!(Capabilities::get().aes);
        // SAFETY: `ArmAesBackend` is only reachable through `get()`, which checks the
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
}

#[inline]
#[target_feature(enable = "aes")]
#[allow(unused_unsafe)]
fn load(value: u128) -> uint8x16_t {
    let bytes = value.to_le_bytes();
    // SAFETY: `bytes` holds 16 readable bytes.
    unsafe { vld1q_u8(bytes.as_ptr()) }
}

#[inline]
#[target_feature(enable = "aes")]
#[allow(unused_unsafe)]
fn low_u64(state: uint8x16_t) -> u64 {
    let mut bytes = [0u8; 16];
    // SAFETY: `bytes` holds 16 writable bytes.
    unsafe { vst1q_u8(bytes.as_mut_ptr(), state) };
    u128::from_le_bytes(bytes) as u64
}

#[inline]
#[target_feature(enable = "aes")]
#[allow(unused_unsafe)]
fn aesenc(state: uint8x16_t, key: uint8x16_t) -> uint8x16_t {
    unsafe { veorq_u8(vaesmcq_u8(vaeseq_u8(state, vdupq_n_u8(0))), key) }
}

#[inline]
#[target_feature(enable = "aes")]
fn hash_small(value: u64, seed: u64) -> u64 {
    let mut state = load(((value as u128) << 64) | seed as u128);
    state = aesenc(state, load(ROUND_KEYS[0]));
    state = aesenc(state, load(ROUND_KEYS[1]));
    state = aesenc(state, load(ROUND_KEYS[2]));
    low_u64(state)
}

#[inline]
#[target_feature(enable = "aes")]
#[allow(unused_unsafe)]
fn hash_wide(value: u128, seed: u64) -> u64 {
    let seeded = aesenc(load(spread_seed(seed)), load(ROUND_KEYS[0]));
    let mut state = unsafe { veorq_u8(load(value), seeded) };
    state = aesenc(state, load(ROUND_KEYS[1]));
    state = aesenc(state, load(ROUND_KEYS[2]));
    state = aesenc(state, load(ROUND_KEYS[3]));
    low_u64(state)
}
