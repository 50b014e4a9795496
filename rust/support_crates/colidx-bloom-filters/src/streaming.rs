//! Filter checks that read a single block from storage.
//!
//! Large filters are rarely worth loading in full for a handful of lookups. A
//! [`StreamingFilter`] keeps only the filter size and the reader; every check issues
//! exactly one 32-byte positional read into a buffer owned by the caller.

use colidx_common::{Result, error::Error};
use colidx_hash::Key;
use colidx_io::ReadAt;

use crate::{
    block::Block,
    filter::{block_index, verify_filter_size},
};

/// A serialized filter accessed through a [`ReadAt`] source.
#[derive(Debug, Clone)]
pub struct StreamingFilter<R> {
    reader: R,
    num_blocks: usize,
}

impl<R: ReadAt> StreamingFilter<R> {
    /// Opens a filter spanning the whole of `reader`.
    pub fn new(reader: R) -> Result<StreamingFilter<R>> {
        let size = reader
            .size()
            .map_err(|e| Error::io("bloom filter size", e))?;
        StreamingFilter::with_size(reader, size)
    }

    /// Opens a filter of `size` bytes starting at offset 0 of `reader`, for callers
    /// that already know the size from their metadata.
    pub fn with_size(reader: R, size: u64) -> Result<StreamingFilter<R>> {
        verify_filter_size(size)?;
        Ok(StreamingFilter {
            reader,
            num_blocks: (size / Block::BYTES as u64) as usize,
        })
    }

    pub fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Reads the block addressed by `hash` into `buf` and checks it.
    ///
    /// A failed read is returned as an error rather than as either answer.
    pub fn check_hash(&self, hash: u64, buf: &mut [u8; Block::BYTES]) -> Result<bool> {
        check_block(&self.reader, self.num_blocks, hash, buf)
    }

    pub fn check_key<K: Key>(
        &self,
        key: K,
        seed: u64,
        buf: &mut [u8; Block::BYTES],
    ) -> Result<bool> {
        self.check_hash(key.hash(seed), buf)
    }
}

/// One-shot check of a filter of `size` bytes stored at offset 0 of `reader`.
pub fn check_at<R: ReadAt + ?Sized>(
    reader: &R,
    size: u64,
    hash: u64,
    buf: &mut [u8; Block::BYTES],
) -> Result<bool> {
    verify_filter_size(size)?;
    check_block(reader, (size / Block::BYTES as u64) as usize, hash, buf)
}

#[inline]
fn check_block<R: ReadAt + ?Sized>(
    reader: &R,
    num_blocks: usize,
    hash: u64,
    buf: &mut [u8; Block::BYTES],
) -> Result<bool> {
    let index = block_index(hash, num_blocks);
    let pos = index as u64 * Block::BYTES as u64;
    reader
        .read_at(pos, buf)
        .map_err(|e| Error::io(format!("bloom filter block {index} at offset {pos}"), e))?;
    Ok(Block::from_le_bytes(buf).check(hash as u32))
}
