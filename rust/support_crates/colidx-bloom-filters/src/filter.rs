//! In-memory split-block bloom filter.

use std::io::Write;

use colidx_common::{Result, error::Error, verify_data};
use colidx_hash::Key;

use crate::block::Block;

/// Number of blocks needed for `num_values` values at `bits_per_value` bits each:
/// the bit count is rounded up to whole bytes, then to whole blocks.
pub fn num_blocks_of(num_values: usize, bits_per_value: usize) -> usize {
    let num_bytes = num_values.saturating_mul(bits_per_value).div_ceil(8);
    num_bytes.div_ceil(Block::BYTES)
}

/// Largest number of blocks a filter may hold: [`block_index`] scales the high 32 bits
/// of a hash by the block count in 64-bit arithmetic.
pub const MAX_BLOCKS: usize = u32::MAX as usize;

/// Clamps a requested block count to `[1, MAX_BLOCKS]`.
#[inline]
pub(crate) fn clamp_num_blocks(num_blocks: usize) -> usize {
    num_blocks.clamp(1, MAX_BLOCKS)
}

/// Maps the high 32 bits of `hash` onto `[0, num_blocks)`.
///
/// `num_blocks` must not exceed [`MAX_BLOCKS`].
#[inline]
pub fn block_index(hash: u64, num_blocks: usize) -> usize {
    debug_assert!(num_blocks <= MAX_BLOCKS);
    (((hash >> 32) * num_blocks as u64) >> 32) as usize
}

/// A split-block bloom filter held in memory.
///
/// A hash selects one block through its high 32 bits ([`block_index`]), and the low
/// 32 bits select one bit in each of the block's eight words. The serialized form is
/// the concatenation of the blocks in little-endian word order, with no header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    blocks: Vec<Block>,
}

impl Filter {
    /// Creates an empty filter of `num_blocks` blocks. A filter always holds at
    /// least one block and at most [`MAX_BLOCKS`].
    pub fn new(num_blocks: usize) -> Filter {
        Filter {
            blocks: vec![Block::new(); clamp_num_blocks(num_blocks)],
        }
    }

    /// Creates an empty filter sized by [`num_blocks_of`].
    pub fn with_capacity(num_values: usize, bits_per_value: usize) -> Filter {
        Filter::new(num_blocks_of(num_values, bits_per_value))
    }

    /// Decodes a serialized filter. The length must be a positive multiple of
    /// [`Block::BYTES`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Filter> {
        verify_filter_size(bytes.len() as u64)?;
        let blocks = bytes.chunks_exact(Block::BYTES).map(Block::decode).collect();
        Ok(Filter { blocks })
    }

    pub(crate) fn from_blocks(blocks: Vec<Block>) -> Filter {
        debug_assert!(!blocks.is_empty());
        Filter { blocks }
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Size of the serialized filter in bytes.
    pub fn size_in_bytes(&self) -> usize {
        self.blocks.len() * Block::BYTES
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    #[inline]
    pub fn insert(&mut self, hash: u64) {
        let index = block_index(hash, self.blocks.len());
        self.blocks[index].insert(hash as u32);
    }

    /// Returns `false` if the value behind `hash` was definitely never inserted.
    #[inline]
    pub fn check(&self, hash: u64) -> bool {
        let index = block_index(hash, self.blocks.len());
        self.blocks[index].check(hash as u32)
    }

    pub fn insert_bulk(&mut self, hashes: &[u64]) {
        for &hash in hashes {
            self.insert(hash);
        }
    }

    /// Checks every hash, writing the answers to `results`.
    ///
    /// # Panics
    ///
    /// Panics if `hashes` and `results` differ in length.
    pub fn check_bulk(&self, hashes: &[u64], results: &mut [bool]) {
        assert_eq!(
            hashes.len(),
            results.len(),
            "check_bulk: length mismatch"
        );
        for (result, &hash) in results.iter_mut().zip(hashes) {
            *result = self.check(hash);
        }
    }

    pub fn insert_key<K: Key>(&mut self, key: K, seed: u64) {
        self.insert(key.hash(seed));
    }

    pub fn check_key<K: Key>(&self, key: K, seed: u64) -> bool {
        self.check(key.hash(seed))
    }

    /// Hashes `keys` in one batch and inserts them.
    pub fn insert_keys<K: Key>(&mut self, keys: &[K], seed: u64) {
        self.insert_bulk(&K::multi_hash_vec(keys, seed));
    }

    /// ORs `other` into this filter. Both filters must have the same number of blocks
    /// and must have been built with the same hash seed.
    pub fn merge(&mut self, other: &Filter) -> Result<()> {
        if self.blocks.len() != other.blocks.len() {
            return Err(Error::invalid_arg(
                "other",
                format!(
                    "cannot merge a filter of {} blocks into one of {} blocks",
                    other.blocks.len(),
                    self.blocks.len()
                ),
            ));
        }
        for (block, o) in self.blocks.iter_mut().zip(&other.blocks) {
            block.merge(o);
        }
        Ok(())
    }

    /// Clears every bit.
    pub fn reset(&mut self) {
        self.blocks.fill(Block::new());
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.size_in_bytes());
        for block in &self.blocks {
            bytes.extend_from_slice(&block.to_le_bytes());
        }
        bytes
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for block in &self.blocks {
            writer.write_all(&block.to_le_bytes())?;
        }
        Ok(())
    }

    /// Estimated false positive probability once `num_values` distinct values have been
    /// inserted.
    ///
    /// The number of values landing in a block is modelled as Poisson with mean
    /// `num_values / num_blocks`. A block holding `j` values answers a foreign value
    /// positively with probability `(1 - (31/32)^j)^8`.
    pub fn false_positive_rate(&self, num_values: usize) -> f64 {
        if num_values == 0 {
            return 0.0;
        }
        let lambda = num_values as f64 / self.blocks.len() as f64;
        let miss = 31.0f64 / 32.0;
        let limit = (lambda + 12.0 * lambda.sqrt() + 32.0).ceil() as usize;
        let mut poisson = (-lambda).exp();
        let mut rate = 0.0;
        for j in 0..=limit {
            if j > 0 {
                poisson *= lambda / j as f64;
            }
            rate += poisson * (1.0 - miss.powi(j as i32)).powi(8);
        }
        rate.min(1.0)
    }
}

pub(crate) fn verify_filter_size(size: u64) -> Result<()> {
    verify_data!(size, size > 0);
    verify_data!(size, size % Block::BYTES as u64 == 0);
    verify_data!(size, size / Block::BYTES as u64 <= MAX_BLOCKS as u64);
    Ok(())
}
