//! Bloom filter construction settings.

use colidx_common::{Result, verify_arg};

/// Seed mixed into every value hashed for a bloom filter, unless configured otherwise.
/// Readers must check with the same seed the writer used.
pub const BLOOM_FILTER_HASH_SEED: u64 = 0x636f_6c69_6478_4246; // "colidxBF" in hex

/// Maximum number of distinct values that can be added to a bloom filter.
/// When this threshold is exceeded, the bloom filter is abandoned: a column chunk
/// with that many distinct values is better served by its dictionary.
pub const CARDINALITY_THRESHOLD: usize = 1024;

/// Configuration for bloom filter construction.
#[derive(Debug, Clone)]
pub struct BloomFilterConfig {
    /// Maximum number of distinct values before abandoning filter construction.
    pub cardinality_threshold: usize,
    /// Target false positive probability.
    pub target_fpp: f64,
    /// Maximum size of the serialized filter in bytes.
    pub max_filter_size: usize,
    /// Seed passed to the key hash.
    pub hash_seed: u64,
}

impl Default for BloomFilterConfig {
    fn default() -> Self {
        Self {
            cardinality_threshold: CARDINALITY_THRESHOLD,
            target_fpp: 0.01,
            max_filter_size: 1_048_576, // 1MB
            hash_seed: BLOOM_FILTER_HASH_SEED,
        }
    }
}

impl BloomFilterConfig {
    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        verify_arg!(cardinality_threshold, self.cardinality_threshold > 0);
        verify_arg!(
            target_fpp,
            self.target_fpp >= 0.000001 && self.target_fpp <= 0.99
        );
        verify_arg!(max_filter_size, self.max_filter_size >= 32);
        Ok(())
    }
}
