//! Linear-probing table with an occupancy bitmap, used for 64-bit and 128-bit keys.

use colidx_common::{Result, error::Error, verify_arg};
use colidx_hash::Key;

use crate::{MAX_DISTINCT_KEYS, ProbeTable, sized_capacity};

/// Dictionary probe table for 64-bit keys.
pub type Uint64Table = FlaggedTable<u64>;

/// Dictionary probe table for 128-bit keys.
pub type Uint128Table = FlaggedTable<u128>;

/// Open-addressing table with one key per slot.
///
/// The slot count is a power of two and the home slot of a key is
/// `hash mod capacity`. Collisions move on to the next slot, wrapping around. A
/// separate bitmap records which slots were written, so zero keys need no sentinel.
#[derive(Debug, Clone)]
pub struct FlaggedTable<K: Key> {
    seed: u64,
    occupied: Vec<u64>,
    keys: Vec<K>,
    indices: Vec<u32>,
    len: usize,
}

impl<K: Key> FlaggedTable<K> {
    /// Creates an empty table with `capacity` slots. `capacity` must be a power of two.
    pub fn new(capacity: usize, seed: u64) -> Result<FlaggedTable<K>> {
        verify_arg!(capacity, capacity.is_power_of_two());
        verify_arg!(capacity, capacity - 1 <= MAX_DISTINCT_KEYS);
        Ok(FlaggedTable {
            seed,
            occupied: vec![0u64; capacity.div_ceil(64)],
            keys: vec![K::default(); capacity],
            indices: vec![0u32; capacity],
            len: 0,
        })
    }

    /// Creates a table that keeps `distinct_count` keys within the maximum load factor.
    pub fn for_distinct_count(distinct_count: usize, seed: u64) -> Result<FlaggedTable<K>> {
        FlaggedTable::new(slot_count_for(sized_capacity(distinct_count))?, seed)
    }

    #[inline]
    fn mask(&self) -> usize {
        self.keys.len() - 1
    }

    #[inline]
    fn is_occupied(&self, slot: usize) -> bool {
        self.occupied[slot / 64] & (1u64 << (slot % 64)) != 0
    }

    #[inline]
    fn set_occupied(&mut self, slot: usize) {
        self.occupied[slot / 64] |= 1u64 << (slot % 64);
    }

    #[inline]
    fn probe_one(&mut self, key: K, hash: u64) -> Result<u32> {
        let mask = self.mask();
        let mut slot = (hash as usize) & mask;
        for _ in 0..self.keys.len() {
            if !self.is_occupied(slot) {
                let index = self.len as u32;
                self.set_occupied(slot);
                self.keys[slot] = key;
                self.indices[slot] = index;
                self.len += 1;
                return Ok(index);
            }
            if self.keys[slot] == key {
                return Ok(self.indices[slot]);
            }
            slot = (slot + 1) & mask;
        }
        Err(Error::capacity_exhausted(self.keys.len(), self.len))
    }

    /// Places an entry with a known index, used when rehashing.
    fn place(&mut self, key: K, hash: u64, index: u32) {
        let mask = self.mask();
        let mut slot = (hash as usize) & mask;
        while self.is_occupied(slot) {
            slot = (slot + 1) & mask;
        }
        self.set_occupied(slot);
        self.keys[slot] = key;
        self.indices[slot] = index;
    }

    fn entries(&self) -> impl Iterator<Item = (K, u32)> + '_ {
        (0..self.keys.len())
            .filter(|&slot| self.is_occupied(slot))
            .map(|slot| (self.keys[slot], self.indices[slot]))
    }
}

fn slot_count_for(capacity: usize) -> Result<usize> {
    capacity
        .checked_next_power_of_two()
        .ok_or_else(|| Error::invalid_arg("capacity", "too large"))
}

impl<K: Key> ProbeTable for FlaggedTable<K> {
    type Key = K;

    fn seed(&self) -> u64 {
        self.seed
    }

    fn len(&self) -> usize {
        self.len
    }

    fn capacity(&self) -> usize {
        self.keys.len()
    }

    fn probe(&mut self, keys: &[K], hashes: &[u64], indices: &mut [u32]) -> Result<usize> {
        verify_arg!(hashes, hashes.len() == keys.len());
        verify_arg!(indices, indices.len() == keys.len());
        let before = self.len;
        for ((&key, &hash), index) in keys.iter().zip(hashes).zip(indices.iter_mut()) {
            *index = self.probe_one(key, hash)?;
        }
        log::trace!(
            "probed {} {}-bit keys into {} slots, {} new, {} distinct",
            keys.len(),
            K::BITS,
            self.keys.len(),
            self.len - before,
            self.len
        );
        Ok(self.len - before)
    }

    fn lookup_hashed(&self, key: K, hash: u64) -> Option<u32> {
        let mask = self.mask();
        let mut slot = (hash as usize) & mask;
        for _ in 0..self.keys.len() {
            if !self.is_occupied(slot) {
                return None;
            }
            if self.keys[slot] == key {
                return Some(self.indices[slot]);
            }
            slot = (slot + 1) & mask;
        }
        None
    }

    fn dictionary(&self) -> Vec<K> {
        let mut keys = vec![K::default(); self.len];
        for (key, index) in self.entries() {
            keys[index as usize] = key;
        }
        keys
    }

    fn reset(&mut self) {
        self.occupied.fill(0);
        self.len = 0;
    }

    fn grow(&mut self, min_capacity: usize) -> Result<()> {
        verify_arg!(min_capacity, min_capacity >= self.capacity());
        let slot_count = slot_count_for(min_capacity)?;
        if slot_count == self.keys.len() {
            return Ok(());
        }
        let mut grown = FlaggedTable::<K>::new(slot_count, self.seed)?;
        let (keys, indices): (Vec<K>, Vec<u32>) = self.entries().unzip();
        let hashes = K::multi_hash_vec(&keys, self.seed);
        for ((&key, &hash), &index) in keys.iter().zip(&hashes).zip(&indices) {
            grown.place(key, hash, index);
        }
        grown.len = self.len;
        log::debug!(
            "grew {}-bit probe table from {} to {} slots ({} distinct keys)",
            K::BITS,
            self.keys.len(),
            slot_count,
            self.len
        );
        *self = grown;
        Ok(())
    }
}
