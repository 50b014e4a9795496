//! The 256-bit block of a split-block bloom filter.

use byteorder::{ByteOrder, LittleEndian};

/// Odd multipliers selecting one bit per block word. Shared with the Parquet
/// split-block bloom filter, so the on-disk bits are interchangeable.
pub const SALT: [u32; 8] = [
    0x47b6_137b,
    0x4497_4d91,
    0x8824_ad5b,
    0xa2b7_289d,
    0x7054_95c7,
    0x2df1_424b,
    0x9efc_4947,
    0x5c6b_fb31,
];

/// Eight 32-bit words. Inserting a value sets exactly one bit in every word.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C, align(32))]
pub struct Block {
    words: [u32; 8],
}

impl Block {
    /// Serialized size of a block.
    pub const BYTES: usize = 32;

    /// Number of bits in a block.
    pub const BITS: usize = Self::BYTES * 8;

    pub const fn new() -> Block {
        Block { words: [0; 8] }
    }

    pub const fn from_words(words: [u32; 8]) -> Block {
        Block { words }
    }

    pub fn words(&self) -> &[u32; 8] {
        &self.words
    }

    /// The per-word bits selected by `x`: for word `i`, bit `(x * SALT[i]) >> 27`
    /// (the top five bits of the wrapped 32-bit product).
    #[inline]
    pub fn mask(x: u32) -> [u32; 8] {
        let mut mask = [0u32; 8];
        for (m, salt) in mask.iter_mut().zip(SALT) {
            *m = 1u32 << (x.wrapping_mul(salt) >> 27);
        }
        mask
    }

    #[inline]
    pub fn insert(&mut self, x: u32) {
        let mask = Self::mask(x);
        for (word, m) in self.words.iter_mut().zip(mask) {
            *word |= m;
        }
    }

    /// Returns `true` if every bit selected by `x` is set.
    #[inline]
    pub fn check(&self, x: u32) -> bool {
        let mask = Self::mask(x);
        self.words
            .iter()
            .zip(mask)
            .fold(true, |hit, (&word, m)| hit & (word & m != 0))
    }

    /// ORs the bits of `other` into this block.
    #[inline]
    pub fn merge(&mut self, other: &Block) {
        for (word, &o) in self.words.iter_mut().zip(&other.words) {
            *word |= o;
        }
    }

    pub fn from_le_bytes(bytes: &[u8; Self::BYTES]) -> Block {
        let mut words = [0u32; 8];
        LittleEndian::read_u32_into(bytes, &mut words);
        Block { words }
    }

    pub fn to_le_bytes(&self) -> [u8; Self::BYTES] {
        let mut bytes = [0u8; Self::BYTES];
        LittleEndian::write_u32_into(&self.words, &mut bytes);
        bytes
    }

    /// Decodes a block from the first 32 bytes of `src`.
    ///
    /// # Panics
    ///
    /// Panics if `src` is shorter than [`Block::BYTES`].
    #[inline]
    pub(crate) fn decode(src: &[u8]) -> Block {
        let mut words = [0u32; 8];
        LittleEndian::read_u32_into(&src[..Self::BYTES], &mut words);
        Block { words }
    }
}
