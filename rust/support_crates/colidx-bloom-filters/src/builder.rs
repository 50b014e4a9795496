//! Bloom filter builder implementation.

use std::{
    collections::HashSet,
    hash::{BuildHasherDefault, Hasher},
};

use colidx_common::Result;
use colidx_hash::Key;

use crate::{
    CARDINALITY_THRESHOLD,
    block::Block,
    config::BloomFilterConfig,
    filter::{Filter, num_blocks_of},
};

/// Computes optimal bitmap size for a bloom filter.
/// Fixed formula: m = -n * ln(p) / (ln(2)^2)
fn compute_bitmap_size(items_count: usize, fp_p: f64) -> usize {
    assert!(items_count > 0);
    assert!(fp_p > 0.0 && fp_p < 1.0);
    let log2 = std::f64::consts::LN_2;
    let log2_2 = log2 * log2;
    (-(items_count as f64) * fp_p.ln() / log2_2).ceil() as usize
}

/// Passes fingerprints through unchanged: they are already uniformly distributed.
#[derive(Default)]
struct FingerprintHasher(u64);

impl Hasher for FingerprintHasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = self.0.rotate_left(8) ^ b as u64;
        }
    }

    #[inline]
    fn write_u64(&mut self, i: u64) {
        self.0 = i;
    }
}

type FingerprintSet = HashSet<u64, BuildHasherDefault<FingerprintHasher>>;

/// Accumulates distinct fingerprints and sizes the filter once their count is known.
#[derive(Debug)]
pub(crate) struct FilterBuilder {
    hashes: FingerprintSet,
    target_fpp: f64,
    max_filter_size: usize,
    filter: Option<Filter>,
}

impl FilterBuilder {
    pub fn new(initial_capacity: usize, target_fpp: f64, max_filter_size: usize) -> Self {
        let mut hashes = FingerprintSet::default();
        hashes.reserve(initial_capacity);

        Self {
            hashes,
            target_fpp,
            max_filter_size,
            filter: None,
        }
    }

    /// Adds a pre-computed hash value to the filter.
    /// Returns true if this is a new distinct value, false if it's a duplicate.
    pub fn add_hash(&mut self, hash: u64) -> bool {
        self.hashes.insert(hash)
    }

    /// Returns the current number of distinct values tracked.
    pub fn distinct_count(&self) -> usize {
        self.hashes.len()
    }

    /// Number of bits per value reaching the target false positive probability.
    pub fn bits_per_value(&self) -> usize {
        let bitmap_size = compute_bitmap_size(self.hashes.len(), self.target_fpp);
        (bitmap_size as f64 / self.hashes.len() as f64).ceil() as usize
    }

    /// Builds the final bloom filter and stores it in the builder.
    /// Returns true if the filter was successfully built, false if there are no values
    /// or if the filter would be too large.
    pub fn finish(&mut self) -> bool {
        if self.hashes.is_empty() {
            return false;
        }

        let bits_per_value = self.bits_per_value();
        let num_blocks = num_blocks_of(self.hashes.len(), bits_per_value);
        let size = num_blocks.max(1) * Block::BYTES;
        if size > self.max_filter_size {
            log::debug!(
                "bloom filter of {} values at {} bits/value needs {} bytes, limit is {}",
                self.hashes.len(),
                bits_per_value,
                size,
                self.max_filter_size
            );
            return false;
        }

        let mut filter = Filter::new(num_blocks);
        for &hash in &self.hashes {
            filter.insert(hash);
        }
        self.filter = Some(filter);

        true
    }

    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    pub fn into_filter(self) -> Option<Filter> {
        self.filter
    }

    pub fn num_blocks(&self) -> usize {
        self.filter.as_ref().map_or(0, Filter::num_blocks)
    }

    /// Distinct values inserted into the built filter.
    pub fn num_values(&self) -> usize {
        self.filter.as_ref().map_or(0, |_| self.hashes.len())
    }
}

/// Manages distinct value tracking and bloom filter construction for one column chunk.
///
/// Values are fed as they are encoded. The filter is only sized and populated in
/// [`BloomFilterCollector::finish`], once the distinct count is known. Construction is
/// abandoned, and every later call becomes a no-op returning `false`, when the distinct
/// count exceeds the configured threshold.
#[derive(Debug)]
pub struct BloomFilterCollector {
    bloom_filter_builder: Option<FilterBuilder>,
    config: BloomFilterConfig,
    is_finished: bool,
}

impl BloomFilterCollector {
    /// Creates a new bloom filter collector with the given configuration.
    pub fn new(config: BloomFilterConfig) -> Result<Self> {
        config.validate()?;
        let bloom_filter_builder = Some(FilterBuilder::new(
            config.cardinality_threshold.min(CARDINALITY_THRESHOLD / 4),
            config.target_fpp,
            config.max_filter_size,
        ));

        Ok(Self {
            bloom_filter_builder,
            config,
            is_finished: false,
        })
    }

    /// Processes a byte slice value for bloom filter construction.
    /// The bytes are reduced to a 64-bit key, then hashed like any other key.
    /// Returns true if the value was successfully added, false if filter construction
    /// was abandoned.
    pub fn process_value(&mut self, value: &[u8]) -> bool {
        if self.bloom_filter_builder.is_some() {
            self.process_key(colidx_hash::key64_of_bytes(value))
        } else {
            false
        }
    }

    /// Processes a fixed-width key.
    pub fn process_key<K: Key>(&mut self, key: K) -> bool {
        if self.bloom_filter_builder.is_some() {
            self.process_hash(key.hash(self.config.hash_seed))
        } else {
            false
        }
    }

    /// Processes a batch of fixed-width keys, hashing them in one pass.
    pub fn process_keys<K: Key>(&mut self, keys: &[K]) -> bool {
        if self.bloom_filter_builder.is_none() {
            return false;
        }
        K::multi_hash_vec(keys, self.config.hash_seed)
            .into_iter()
            .all(|hash| self.process_hash(hash))
    }

    /// Processes a pre-computed hash value for bloom filter construction.
    /// Returns true if the hash was successfully added, false if filter construction
    /// was abandoned.
    pub fn process_hash(&mut self, hash: u64) -> bool {
        if let Some(ref mut builder) = self.bloom_filter_builder {
            let is_new_value = builder.add_hash(hash);

            if is_new_value && builder.distinct_count() > self.config.cardinality_threshold {
                log::debug!(
                    "abandoning bloom filter: more than {} distinct values",
                    self.config.cardinality_threshold
                );
                self.bloom_filter_builder = None;
                false
            } else {
                true
            }
        } else {
            false
        }
    }

    /// Finalizes the bloom filter construction.
    /// Returns true if the filter was successfully built, false otherwise.
    ///
    /// A filter whose sized form would exceed `max_filter_size` abandons construction,
    /// like exceeding the cardinality threshold does.
    pub fn finish(&mut self) -> bool {
        let Some(builder) = self.bloom_filter_builder.as_mut() else {
            return false;
        };
        self.is_finished = builder.finish();
        if !self.is_finished && builder.distinct_count() > 0 {
            log::debug!(
                "abandoning bloom filter: larger than {} bytes",
                self.config.max_filter_size
            );
            self.bloom_filter_builder = None;
        }
        self.is_finished
    }

    /// Returns the finished filter, if any.
    pub fn filter(&self) -> Option<&Filter> {
        if self.is_finished {
            self.bloom_filter_builder.as_ref().and_then(|b| b.filter())
        } else {
            None
        }
    }

    /// Consumes the collector and returns the finished filter, if any.
    pub fn into_filter(self) -> Option<Filter> {
        if self.is_finished {
            self.bloom_filter_builder.and_then(FilterBuilder::into_filter)
        } else {
            None
        }
    }

    /// The serialized filter, empty until [`Self::finish`] succeeds.
    pub fn filter_data(&self) -> Vec<u8> {
        self.filter().map_or_else(Vec::new, Filter::to_bytes)
    }

    /// Number of blocks of the finished filter, 0 until [`Self::finish`] succeeds.
    pub fn num_blocks(&self) -> usize {
        match &self.bloom_filter_builder {
            Some(builder) if self.is_finished => builder.num_blocks(),
            _ => 0,
        }
    }

    /// Number of distinct values in the finished filter, 0 until [`Self::finish`]
    /// succeeds.
    pub fn num_values(&self) -> usize {
        match &self.bloom_filter_builder {
            Some(builder) if self.is_finished => builder.num_values(),
            _ => 0,
        }
    }

    /// Returns the target false positive probability.
    pub fn target_fpp(&self) -> f64 {
        self.config.target_fpp
    }

    /// Returns the seed the values are hashed with.
    pub fn hash_seed(&self) -> u64 {
        self.config.hash_seed
    }

    /// Returns true once construction has been abandoned.
    pub fn is_abandoned(&self) -> bool {
        self.bloom_filter_builder.is_none()
    }
}
