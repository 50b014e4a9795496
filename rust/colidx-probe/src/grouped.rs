//! Probe table for 32-bit keys with cache-line sized groups.

use colidx_common::{Result, error::Error, verify_arg};
use colidx_hash::Key;

use crate::{MAX_DISTINCT_KEYS, ProbeTable, sized_capacity};

/// Number of entries held by one group.
pub const GROUP_SIZE: usize = 7;

/// Seven keys, their indices and the occupancy count fill exactly one cache line.
#[derive(Debug, Clone, Copy, Default)]
#[repr(C, align(64))]
struct Group {
    len: u32,
    keys: [u32; GROUP_SIZE],
    indices: [u32; GROUP_SIZE],
}

impl Group {
    #[inline]
    fn find(&self, key: u32) -> Option<u32> {
        let len = self.len as usize;
        self.keys[..len]
            .iter()
            .position(|&k| k == key)
            .map(|pos| self.indices[pos])
    }

    #[inline]
    fn is_full(&self) -> bool {
        self.len as usize == GROUP_SIZE
    }

    #[inline]
    fn push(&mut self, key: u32, index: u32) {
        let len = self.len as usize;
        debug_assert!(len < GROUP_SIZE);
        self.keys[len] = key;
        self.indices[len] = index;
        self.len += 1;
    }
}

/// Dictionary probe table for 32-bit keys.
///
/// A key lives in group `hash mod group_count`; when that group already holds seven
/// entries the key moves on to the next group, wrapping around at the end of the table.
#[derive(Debug, Clone)]
pub struct Uint32Table {
    seed: u64,
    groups: Vec<Group>,
    len: usize,
}

impl Uint32Table {
    /// Creates an empty table with `group_count` groups, able to hold
    /// `7 * group_count` distinct keys.
    pub fn new(group_count: usize, seed: u64) -> Result<Uint32Table> {
        verify_arg!(group_count, group_count > 0);
        verify_arg!(
            group_count,
            group_count.saturating_mul(GROUP_SIZE) <= MAX_DISTINCT_KEYS
        );
        Ok(Uint32Table {
            seed,
            groups: vec![Group::default(); group_count],
            len: 0,
        })
    }

    /// Creates a table that keeps `distinct_count` keys within the maximum load factor.
    pub fn for_distinct_count(distinct_count: usize, seed: u64) -> Result<Uint32Table> {
        Uint32Table::new(group_count_for(sized_capacity(distinct_count)), seed)
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    #[inline]
    fn probe_one(&mut self, key: u32, hash: u64) -> Result<u32> {
        let group_count = self.groups.len();
        let mut group_idx = (hash % group_count as u64) as usize;
        for _ in 0..group_count {
            let group = &mut self.groups[group_idx];
            if let Some(index) = group.find(key) {
                return Ok(index);
            }
            if !group.is_full() {
                let index = self.len as u32;
                group.push(key, index);
                self.len += 1;
                return Ok(index);
            }
            group_idx += 1;
            if group_idx == group_count {
                group_idx = 0;
            }
        }
        Err(Error::capacity_exhausted(self.capacity(), self.len))
    }

    /// Places an entry with a known index, used when rehashing.
    fn place(&mut self, key: u32, hash: u64, index: u32) {
        let group_count = self.groups.len();
        let mut group_idx = (hash % group_count as u64) as usize;
        while self.groups[group_idx].is_full() {
            group_idx = (group_idx + 1) % group_count;
        }
        self.groups[group_idx].push(key, index);
    }

    fn entries(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.groups.iter().flat_map(|group| {
            let len = group.len as usize;
            group.keys[..len]
                .iter()
                .copied()
                .zip(group.indices[..len].iter().copied())
        })
    }
}

fn group_count_for(capacity: usize) -> usize {
    capacity.div_ceil(GROUP_SIZE).max(1)
}

impl ProbeTable for Uint32Table {
    type Key = u32;

    fn seed(&self) -> u64 {
        self.seed
    }

    fn len(&self) -> usize {
        self.len
    }

    fn capacity(&self) -> usize {
        self.groups.len() * GROUP_SIZE
    }

    fn probe(&mut self, keys: &[u32], hashes: &[u64], indices: &mut [u32]) -> Result<usize> {
        verify_arg!(hashes, hashes.len() == keys.len());
        verify_arg!(indices, indices.len() == keys.len());
        let before = self.len;
        for ((&key, &hash), index) in keys.iter().zip(hashes).zip(indices.iter_mut()) {
            *index = self.probe_one(key, hash)?;
        }
        log::trace!(
            "probed {} keys into {} groups, {} new, {} distinct",
            keys.len(),
            self.groups.len(),
            self.len - before,
            self.len
        );
        Ok(self.len - before)
    }

    fn lookup_hashed(&self, key: u32, hash: u64) -> Option<u32> {
        let group_count = self.groups.len();
        let mut group_idx = (hash % group_count as u64) as usize;
        for _ in 0..group_count {
            let group = &self.groups[group_idx];
            if let Some(index) = group.find(key) {
                return Some(index);
            }
            if !group.is_full() {
                return None;
            }
            group_idx = (group_idx + 1) % group_count;
        }
        None
    }

    fn dictionary(&self) -> Vec<u32> {
        let mut keys = vec![0u32; self.len];
        for (key, index) in self.entries() {
            keys[index as usize] = key;
        }
        keys
    }

    fn reset(&mut self) {
        self.groups.fill(Group::default());
        self.len = 0;
    }

    fn grow(&mut self, min_capacity: usize) -> Result<()> {
        verify_arg!(min_capacity, min_capacity >= self.capacity());
        let group_count = group_count_for(min_capacity);
        if group_count == self.groups.len() {
            return Ok(());
        }
        let mut grown = Uint32Table::new(group_count, self.seed)?;
        let (keys, indices): (Vec<u32>, Vec<u32>) = self.entries().unzip();
        let hashes = u32::multi_hash_vec(&keys, self.seed);
        for ((&key, &hash), &index) in keys.iter().zip(&hashes).zip(&indices) {
            grown.place(key, hash, index);
        }
        grown.len = self.len;
        log::debug!(
            "grew 32-bit probe table from {} to {} groups ({} distinct keys)",
            self.groups.len(),
            group_count,
            self.len
        );
        *self = grown;
        Ok(())
    }
}
