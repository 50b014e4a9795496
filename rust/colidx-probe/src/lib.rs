//! Probe tables for dictionary encoding.
//!
//! A probe table assigns a dense, stable `u32` index to every distinct key it sees:
//! the first distinct key receives index 0, the next new key index 1, and so on.
//! Re-probing a known key returns its original index. Indices are never renumbered,
//! even when the table is grown.
//!
//! Two layouts are provided:
//! - [`Uint32Table`]: 32-bit keys stored in cache-line sized groups of seven entries.
//! - [`FlaggedTable`] ([`Uint64Table`], [`Uint128Table`]): one key per slot, with an
//!   occupancy bitmap so that zero remains a legal key.
//!
//! Tables never grow on their own. The owner sizes them up front
//! (`for_distinct_count`), or checks [`ProbeTable::needs_grow`] and calls
//! [`ProbeTable::grow`] between batches. A probe that finds neither its key nor a
//! free position after visiting the whole table fails with
//! [`ErrorKind::CapacityExhausted`](colidx_common::error::ErrorKind::CapacityExhausted).
//!
//! ```
//! use colidx_probe::{ProbeTable, Uint64Table};
//!
//! let mut table = Uint64Table::for_distinct_count(100, 0x5eed).unwrap();
//! let (indices, distinct) = table.insert_or_lookup(&[10, 20, 10, 0, 20]).unwrap();
//! assert_eq!(indices, vec![0, 1, 0, 2, 1]);
//! assert_eq!(distinct, 3);
//! assert_eq!(table.dictionary(), vec![10, 20, 0]);
//! ```

use colidx_common::Result;
use colidx_hash::Key;

mod flagged;
mod grouped;

pub use flagged::{FlaggedTable, Uint64Table, Uint128Table};
pub use grouped::{GROUP_SIZE, Uint32Table};

/// Tables are considered full at 7/8 of their capacity.
pub const MAX_LOAD_NUMERATOR: usize = 7;
pub const MAX_LOAD_DENOMINATOR: usize = 8;

/// Largest number of distinct keys a table can index (indices are `u32`).
pub const MAX_DISTINCT_KEYS: usize = u32::MAX as usize;

/// Key-typed interface shared by all probe table layouts.
///
/// Mutation requires `&mut self`: at most one insertion is in flight per table. Once
/// the encoding pass is over the table can be shared and queried through `&self`.
pub trait ProbeTable {
    type Key: Key;

    /// The seed mixed into every fingerprint of this table.
    fn seed(&self) -> u64;

    /// Number of distinct keys, which is also the next index to be assigned.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of distinct keys the table can hold.
    fn capacity(&self) -> usize;

    /// Assigns or looks up the index of every key.
    ///
    /// `hashes[i]` must be the fingerprint of `keys[i]` under [`ProbeTable::seed`].
    /// On return `indices[i]` holds the index of `keys[i]`. Returns the number of keys
    /// that were new to the table.
    ///
    /// On error, keys preceding the failing one have been indexed.
    fn probe(&mut self, keys: &[Self::Key], hashes: &[u64], indices: &mut [u32])
    -> Result<usize>;

    /// Looks up a key without inserting it.
    fn lookup_hashed(&self, key: Self::Key, hash: u64) -> Option<u32>;

    fn lookup(&self, key: Self::Key) -> Option<u32> {
        self.lookup_hashed(key, key.hash(self.seed()))
    }

    /// Hashes `keys` with the table seed and probes them. Returns the indices and the
    /// distinct count after the batch.
    fn insert_or_lookup(&mut self, keys: &[Self::Key]) -> Result<(Vec<u32>, usize)> {
        let hashes = <Self::Key as Key>::multi_hash_vec(keys, self.seed());
        let mut indices = vec![0u32; keys.len()];
        self.probe(keys, &hashes, &mut indices)?;
        Ok((indices, self.len()))
    }

    /// The distinct keys ordered by index.
    fn dictionary(&self) -> Vec<Self::Key>;

    /// Removes every key, keeping the allocation and the seed.
    fn reset(&mut self);

    /// Returns `true` if `additional` more distinct keys would push the table above
    /// its maximum load factor.
    fn needs_grow(&self, additional: usize) -> bool {
        !within_max_load(self.len().saturating_add(additional), self.capacity())
    }

    /// Rehashes every entry into a table able to hold at least `min_capacity` distinct
    /// keys. Existing indices are preserved.
    fn grow(&mut self, min_capacity: usize) -> Result<()>;

    /// Grows the table if `additional` more distinct keys would exceed the maximum
    /// load factor.
    fn reserve(&mut self, additional: usize) -> Result<()> {
        if self.needs_grow(additional) {
            let required = sized_capacity(self.len().saturating_add(additional));
            self.grow(required.max(self.capacity().saturating_mul(2)))?;
        }
        Ok(())
    }
}

#[inline]
pub(crate) fn within_max_load(len: usize, capacity: usize) -> bool {
    let len = len as u128 * MAX_LOAD_DENOMINATOR as u128;
    len <= capacity as u128 * MAX_LOAD_NUMERATOR as u128
}

/// The capacity that keeps `distinct_count` keys within the maximum load factor.
#[inline]
pub(crate) fn sized_capacity(distinct_count: usize) -> usize {
    distinct_count
        .saturating_mul(MAX_LOAD_DENOMINATOR)
        .div_ceil(MAX_LOAD_NUMERATOR)
        .max(1)
}
