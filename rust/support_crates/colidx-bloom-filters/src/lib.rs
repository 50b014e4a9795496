//! Split-block bloom filters for column chunks.
//!
//! A filter is an array of 256-bit [`Block`]s. A 64-bit fingerprint selects one block
//! through its high 32 bits and sets one bit in each of the block's eight words through
//! its low 32 bits, so a check touches a single 32-byte region. The layout is the one of
//! the Parquet split-block bloom filter.
//!
//! This crate provides:
//!
//! - [`Filter`]: an owned, mutable filter, and its serialized form
//! - [`FilterView`]: checks against serialized bytes without copying them
//! - [`StreamingFilter`]: checks that read one block through a [`colidx_io::ReadAt`]
//! - [`BloomFilterCollector`]: builds a filter sized for the distinct values of a chunk
//!
//! ```
//! use colidx_bloom_filters::{Filter, FilterView};
//!
//! let mut filter = Filter::with_capacity(100, 10);
//! filter.insert_keys(&[7u64, 11, 13], 0x5eed);
//! assert!(filter.check_key(11u64, 0x5eed));
//!
//! let bytes = filter.to_bytes();
//! let view = FilterView::new(&bytes).unwrap();
//! assert!(view.check_key(13u64, 0x5eed));
//! ```

pub mod block;
pub mod builder;
pub mod config;
pub mod filter;
pub mod streaming;
pub mod view;

#[cfg(test)]
mod test;

pub use block::{Block, SALT};
pub use builder::BloomFilterCollector;
pub use config::*;
pub use filter::{Filter, MAX_BLOCKS, block_index, num_blocks_of};
pub use streaming::{StreamingFilter, check_at};
pub use view::FilterView;
