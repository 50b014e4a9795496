//! Software AES round and the fixed hashing schedule shared by every backend.
//!
//! A fingerprint is defined as a short sequence of AES encryption rounds
//! (`AESENC` semantics: ShiftRows, SubBytes, MixColumns, then XOR with the round key)
//! applied to a 128-bit state built from the key and the seed:
//!
//! - 32/64-bit keys: the state holds the seed in its low 64 bits and the zero-extended
//!   key in its high 64 bits; three rounds with `ROUND_KEYS[0..3]`.
//! - 128-bit keys: the state is `key ^ aesenc(spread(seed), ROUND_KEYS[0])`; three
//!   rounds with `ROUND_KEYS[1..4]`.
//!
//! The fingerprint is the low 64 bits of the final state. 128-bit values are mapped to
//! AES states in little-endian byte order, which is the order in which `_mm_loadu_si128`
//! and `vld1q_u8` load them.

/// Fixed round keys (hex digits of the fractional part of pi). Changing any of them
/// changes every persisted fingerprint.
pub(crate) const ROUND_KEYS: [u128; 4] = [
    0x243f_6a88_85a3_08d3_1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0_082e_fa98_ec4e_6c89,
    0x4528_21e6_38d0_1377_be54_66cf_34e9_0c6c,
    0xc0ac_29b7_c97c_50dd_3f84_d5b5_b547_0917,
];

/// The AES S-box, generated at compile time from the multiplicative inverse in
/// GF(2^8) followed by the affine transform.
pub(crate) const SBOX: [u8; 256] = build_sbox();

const fn build_sbox() -> [u8; 256] {
    let mut sbox = [0u8; 256];
    // Invariant: p * q == 1 in GF(2^8).
    let mut p: u8 = 1;
    let mut q: u8 = 1;
    loop {
        // p *= 3
        p = p ^ (p << 1) ^ if p & 0x80 != 0 { 0x1b } else { 0 };
        // q /= 3
        q ^= q << 1;
        q ^= q << 2;
        q ^= q << 4;
        if q & 0x80 != 0 {
            q ^= 0x09;
        }
        let x = q ^ q.rotate_left(1) ^ q.rotate_left(2) ^ q.rotate_left(3) ^ q.rotate_left(4);
        sbox[p as usize] = x ^ 0x63;
        if p == 1 {
            break;
        }
    }
    sbox[0] = 0x63;
    sbox
}

#[inline(always)]
fn xtime(x: u8) -> u8 {
    (x << 1) ^ if x & 0x80 != 0 { 0x1b } else { 0 }
}

#[inline(always)]
pub(crate) fn mix_column(a: [u8; 4]) -> [u8; 4] {
    let [a0, a1, a2, a3] = a;
    [
        xtime(a0) ^ xtime(a1) ^ a1 ^ a2 ^ a3,
        a0 ^ xtime(a1) ^ xtime(a2) ^ a2 ^ a3,
        a0 ^ a1 ^ xtime(a2) ^ xtime(a3) ^ a3,
        xtime(a0) ^ a0 ^ a1 ^ a2 ^ xtime(a3),
    ]
}

/// One AES encryption round, bit-exact with `_mm_aesenc_si128(state, key)`.
#[inline]
pub(crate) fn aesenc(state: u128, key: u128) -> u128 {
    let s = state.to_le_bytes();
    let mut out = [0u8; 16];
    for c in 0..4 {
        // Byte `r + 4 * c` is row `r` of column `c`; row `r` rotates left by `r`.
        let column = [
            SBOX[s[4 * c] as usize],
            SBOX[s[4 * ((c + 1) % 4) + 1] as usize],
            SBOX[s[4 * ((c + 2) % 4) + 2] as usize],
            SBOX[s[4 * ((c + 3) % 4) + 3] as usize],
        ];
        out[4 * c..4 * c + 4].copy_from_slice(&mix_column(column));
    }
    u128::from_le_bytes(out) ^ key
}

/// Spreads a 64-bit seed over a full AES state.
#[inline(always)]
pub(crate) fn spread_seed(seed: u64) -> u128 {
    (seed as u128) | ((seed.rotate_left(32) as u128) << 64)
}

/// Reference fingerprint of a key of up to 64 bits.
#[inline]
pub(crate) fn hash_small(value: u64, seed: u64) -> u64 {
    let mut state = ((value as u128) << 64) | seed as u128;
    state = aesenc(state, ROUND_KEYS[0]);
    state = aesenc(state, ROUND_KEYS[1]);
    state = aesenc(state, ROUND_KEYS[2]);
    state as u64
}

/// Reference fingerprint of a 128-bit key.
#[inline]
pub(crate) fn hash_wide(value: u128, seed: u64) -> u64 {
    let mut state = value ^ aesenc(spread_seed(seed), ROUND_KEYS[0]);
    state = aesenc(state, ROUND_KEYS[1]);
    state = aesenc(state, ROUND_KEYS[2]);
    state = aesenc(state, ROUND_KEYS[3]);
    state as u64
}
