//! Zero-copy access to a serialized filter.

use colidx_common::Result;
use colidx_hash::Key;

use crate::{
    block::Block,
    filter::{Filter, block_index, verify_filter_size},
};

/// A read-only filter over serialized bytes.
///
/// The size is validated once on construction. A check decodes only the 32 bytes of
/// the addressed block, so the view works on unaligned buffers such as a slice of a
/// larger file image.
#[derive(Debug, Clone, Copy)]
pub struct FilterView<'a> {
    bytes: &'a [u8],
    num_blocks: usize,
}

impl<'a> FilterView<'a> {
    pub fn new(bytes: &'a [u8]) -> Result<FilterView<'a>> {
        verify_filter_size(bytes.len() as u64)?;
        Ok(FilterView {
            bytes,
            num_blocks: bytes.len() / Block::BYTES,
        })
    }

    pub fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Decodes the block at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn block(&self, index: usize) -> Block {
        Block::decode(&self.bytes[index * Block::BYTES..])
    }

    #[inline]
    pub fn check(&self, hash: u64) -> bool {
        self.block(block_index(hash, self.num_blocks)).check(hash as u32)
    }

    pub fn check_key<K: Key>(&self, key: K, seed: u64) -> bool {
        self.check(key.hash(seed))
    }

    /// Copies the view into an owned, mutable filter.
    pub fn to_filter(&self) -> Filter {
        Filter::from_blocks(
            self.bytes
                .chunks_exact(Block::BYTES)
                .map(Block::decode)
                .collect(),
        )
    }
}

impl<'a> TryFrom<&'a [u8]> for FilterView<'a> {
    type Error = colidx_common::error::Error;

    fn try_from(bytes: &'a [u8]) -> Result<FilterView<'a>> {
        FilterView::new(bytes)
    }
}
