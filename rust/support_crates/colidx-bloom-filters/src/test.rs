//! Bloom filter tests covering the build, serialize and check paths together.

use std::collections::HashSet;

use colidx_hash::Key;
use colidx_io::ReadAt;

use crate::{
    Block, Filter, FilterView, StreamingFilter,
    builder::{BloomFilterCollector, FilterBuilder},
    config::BloomFilterConfig,
};

/// Deterministic 64-bit value stream (SplitMix64).
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

fn generate_keys(count: usize, seed: u64) -> Vec<u64> {
    let mut state = seed;
    (0..count).map(|_| splitmix64(&mut state)).collect()
}

/// Helper function to generate test data sets of different sizes
fn generate_test_data(count: usize, prefix: &str) -> Vec<String> {
    (0..count).map(|i| format!("{prefix}_{i:06}")).collect()
}

/// Helper function to generate non-overlapping test data for false positive testing
fn generate_non_overlapping_test_data(count: usize, prefix: &str) -> Vec<String> {
    (0..count)
        .map(|i| format!("{prefix}_negative_{i:06}"))
        .collect()
}

/// Builds a filter from string values through the collector.
fn build_filter_with_string_values(
    values: &[String],
    target_fpp: f64,
    max_size: usize,
) -> BloomFilterCollector {
    let config = BloomFilterConfig {
        cardinality_threshold: values.len().max(1),
        target_fpp,
        max_filter_size: max_size,
        ..Default::default()
    };
    let mut collector = BloomFilterCollector::new(config).unwrap();
    for value in values {
        assert!(collector.process_value(value.as_bytes()));
    }
    assert!(collector.finish());
    collector
}

/// Fraction of `test_values` (excluding inserted ones) that the filter reports as present.
fn measure_false_positive_rate(
    filter: &Filter,
    seed: u64,
    inserted_values: &[String],
    test_values: &[String],
) -> f64 {
    let inserted_set: HashSet<&String> = inserted_values.iter().collect();
    let mut false_positives = 0;
    let mut true_negatives = 0;

    for value in test_values {
        if !inserted_set.contains(value) {
            let key = colidx_hash::key64_of_bytes(value.as_bytes());
            if filter.check_key(key, seed) {
                false_positives += 1;
            } else {
                true_negatives += 1;
            }
        }
    }

    let total_negatives = false_positives + true_negatives;
    if total_negatives == 0 {
        0.0
    } else {
        false_positives as f64 / total_negatives as f64
    }
}

/// A reader that fails every read.
struct FailingReader {
    size: u64,
}

impl ReadAt for FailingReader {
    fn size(&self) -> std::io::Result<u64> {
        Ok(self.size)
    }

    fn read_at(&self, _pos: u64, _buf: &mut [u8]) -> std::io::Result<()> {
        Err(std::io::Error::other("device unavailable"))
    }
}

#[cfg(test)]
mod builder_tests {
    use super::*;

    #[test]
    fn test_filter_builder_basic_functionality() {
        let mut builder = FilterBuilder::new(100, 0.01, 1024);

        // Test adding values and duplicates
        assert!(builder.add_hash(1u64.hash(0)));
        assert!(builder.add_hash(2u64.hash(0)));
        assert!(!builder.add_hash(1u64.hash(0)));

        assert_eq!(builder.distinct_count(), 2);

        let success = builder.finish();
        assert!(success);

        assert_eq!(builder.num_values(), 2);
        assert_eq!(builder.num_blocks(), 1);
        let filter = builder.filter().unwrap();
        assert!(filter.check_key(1u64, 0));
        assert!(filter.check_key(2u64, 0));
    }

    #[test]
    fn test_filter_builder_empty_filter() {
        let mut builder = FilterBuilder::new(100, 0.01, 1024);
        assert!(!builder.finish());
        assert!(builder.filter().is_none());
        assert_eq!(builder.num_blocks(), 0);
    }

    #[test]
    fn test_filter_builder_sizing() {
        let mut builder = FilterBuilder::new(1000, 0.01, 1 << 20);
        for key in 0..1000u64 {
            builder.add_hash(key.hash(9));
        }
        // -ln(0.01) / ln(2)^2 = 9.59 bits per value.
        assert_eq!(builder.bits_per_value(), 10);
        assert!(builder.finish());
        assert_eq!(builder.num_blocks(), 40);
    }

    #[test]
    fn test_filter_builder_size_limit() {
        let mut builder = FilterBuilder::new(1000, 0.01, 1024);
        for key in 0..1000u64 {
            builder.add_hash(key.hash(9));
        }
        // 40 blocks need 1280 bytes.
        assert!(!builder.finish());
        assert!(builder.filter().is_none());
        assert_eq!(builder.num_blocks(), 0);
    }

    #[test]
    fn test_bloom_filter_collector_abandons_oversized_filter() {
        let config = BloomFilterConfig {
            max_filter_size: 64,
            ..Default::default()
        };
        let mut collector = BloomFilterCollector::new(config).unwrap();
        let keys = (0..1000u64).collect::<Vec<_>>();
        assert!(collector.process_keys(&keys));
        assert!(!collector.is_abandoned());

        // 1000 values at 10 bits/value need 40 blocks, far above 64 bytes.
        assert!(!collector.finish());
        assert!(collector.is_abandoned());
        assert!(!collector.process_key(1000u64));
        assert!(!collector.process_value(b"late"));
        assert!(!collector.finish());
        assert!(collector.filter().is_none());
        assert!(collector.filter_data().is_empty());
        assert_eq!(collector.num_blocks(), 0);
        assert_eq!(collector.num_values(), 0);
    }

    #[test]
    fn test_bloom_filter_collector_empty_finish_is_not_abandoned() {
        let mut collector = BloomFilterCollector::new(BloomFilterConfig::default()).unwrap();
        assert!(!collector.finish());
        assert!(!collector.is_abandoned());
        assert_eq!(collector.num_blocks(), 0);
    }

    #[test]
    fn test_bloom_filter_collector_basic() {
        let config = BloomFilterConfig {
            cardinality_threshold: 5,
            target_fpp: 0.01,
            max_filter_size: 1024,
            ..Default::default()
        };

        let mut collector = BloomFilterCollector::new(config).unwrap();

        // Add values within threshold
        assert!(collector.process_value("test1".as_bytes()));
        assert!(collector.process_value("test2".as_bytes()));
        assert!(collector.process_value("test3".as_bytes()));
        assert!(collector.process_value("test4".as_bytes()));
        assert!(collector.process_value("test5".as_bytes()));
        assert!(!collector.is_abandoned());

        // This should exceed threshold and abandon construction
        assert!(!collector.process_value("test6".as_bytes()));
        assert!(collector.is_abandoned());
        assert!(!collector.process_key(1u32));

        let filter_built = collector.finish();
        assert!(!filter_built);
        assert!(collector.filter().is_none());
        assert!(collector.filter_data().is_empty());
    }

    #[test]
    fn test_bloom_filter_collector_successful_build() {
        let config = BloomFilterConfig {
            cardinality_threshold: 10,
            target_fpp: 0.01,
            max_filter_size: 1024,
            ..Default::default()
        };

        let mut collector = BloomFilterCollector::new(config).unwrap();

        assert!(collector.process_value("test1".as_bytes()));
        assert!(collector.process_key(42u128));
        assert!(collector.process_keys(&[7u32, 8, 9]));

        let filter_built = collector.finish();
        assert!(filter_built);

        assert_eq!(collector.filter_data().len(), collector.num_blocks() * Block::BYTES);
        assert!(collector.num_blocks() > 0);
        assert!(collector.target_fpp() > 0.0);
        assert_eq!(collector.num_values(), 5);

        let seed = collector.hash_seed();
        let filter = collector.into_filter().unwrap();
        assert!(filter.check_key(colidx_hash::key64_of_bytes(b"test1"), seed));
        assert!(filter.check_key(42u128, seed));
        assert!(filter.check_key(8u32, seed));
    }

    #[test]
    fn test_bloom_filter_collector_duplicate_handling() {
        let config = BloomFilterConfig {
            cardinality_threshold: 5,
            target_fpp: 0.01,
            max_filter_size: 1024,
            ..Default::default()
        };

        let mut collector = BloomFilterCollector::new(config).unwrap();

        // Add duplicate values - should not count towards threshold
        assert!(collector.process_value("test1".as_bytes()));
        assert!(collector.process_value("test1".as_bytes())); // Duplicate
        assert!(collector.process_value("test2".as_bytes()));
        assert!(collector.process_value("test2".as_bytes())); // Duplicate
        assert!(collector.process_value("test3".as_bytes()));
        assert!(collector.process_value("test4".as_bytes()));
        assert!(collector.process_value("test5".as_bytes()));

        // This should exceed the threshold and abandon construction
        assert!(!collector.process_value("test6".as_bytes()));

        let filter_built = collector.finish();
        assert!(!filter_built);
    }

    #[test]
    fn test_bloom_filter_collector_rejects_invalid_config() {
        let config = BloomFilterConfig {
            target_fpp: 0.0,
            ..Default::default()
        };
        assert!(BloomFilterCollector::new(config).is_err());
    }
}

#[cfg(test)]
mod layout_tests {
    use super::*;

    #[test]
    fn test_layout_matches_independent_sbbf() {
        let hashes = generate_keys(1000, 77)
            .into_iter()
            .map(|key| key.hash(77))
            .collect::<Vec<_>>();

        let mut reference = sbbf_rs_safe::Filter::new(10, hashes.len());
        for &hash in &hashes {
            reference.insert_hash(hash);
        }
        let reference_bytes = reference.as_bytes();
        assert_eq!(reference_bytes.len() % Block::BYTES, 0);

        let mut filter = Filter::new(reference_bytes.len() / Block::BYTES);
        filter.insert_bulk(&hashes);
        assert_eq!(filter.to_bytes(), reference_bytes);
    }

    #[test]
    fn test_independent_sbbf_bytes_are_readable() {
        let mut reference = sbbf_rs_safe::Filter::new(16, 64);
        let hashes = generate_keys(64, 1);
        for &hash in &hashes {
            reference.insert_hash(hash);
        }
        let view = FilterView::new(reference.as_bytes()).unwrap();
        for &hash in &hashes {
            assert!(view.check(hash));
        }
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn test_in_memory_view_and_streaming_agree() {
        let seed = 0xabcd;
        let keys = generate_keys(5000, 11);
        let mut filter = Filter::with_capacity(keys.len(), 8);
        filter.insert_keys(&keys, seed);

        let bytes = filter.to_bytes();
        let view = FilterView::new(&bytes).unwrap();
        let streaming = StreamingFilter::new(bytes.clone()).unwrap();
        assert_eq!(view.num_blocks(), filter.num_blocks());
        assert_eq!(streaming.num_blocks(), filter.num_blocks());

        let mut buf = [0u8; Block::BYTES];
        let queries = keys.iter().copied().chain(generate_keys(5000, 12));
        for key in queries {
            let hash = key.hash(seed);
            let expected = filter.check(hash);
            assert_eq!(view.check(hash), expected);
            assert_eq!(streaming.check_hash(hash, &mut buf).unwrap(), expected);
            assert_eq!(
                crate::check_at(bytes.as_slice(), bytes.len() as u64, hash, &mut buf).unwrap(),
                expected
            );
        }
    }

    #[test]
    fn test_bulk_checks_match_scalar_checks() {
        let keys = (0..2000u32).collect::<Vec<_>>();
        let mut filter = Filter::with_capacity(1000, 12);
        filter.insert_keys(&keys[..1000], 3);

        let hashes = u32::multi_hash_vec(&keys, 3);
        let mut results = vec![false; hashes.len()];
        filter.check_bulk(&hashes, &mut results);
        for (key, result) in keys.iter().zip(&results) {
            assert_eq!(*result, filter.check_key(*key, 3));
        }
        assert!(results[..1000].iter().all(|&r| r));
    }

    #[test]
    fn test_streaming_read_errors_are_not_answers() {
        let streaming = StreamingFilter::new(FailingReader { size: 4096 }).unwrap();
        let mut buf = [0u8; Block::BYTES];
        for key in 0..16u64 {
            let err = streaming.check_key(key, 0, &mut buf).unwrap_err();
            assert!(err.is_io());
            assert!(err.to_string().contains("device unavailable"));
        }
    }

    #[test]
    fn test_merged_filters_answer_for_both_inputs() {
        let left = generate_keys(300, 20);
        let right = generate_keys(300, 21);
        let mut a = Filter::with_capacity(600, 10);
        let mut b = Filter::with_capacity(600, 10);
        a.insert_keys(&left, 5);
        b.insert_keys(&right, 5);
        a.merge(&b).unwrap();
        for key in left.iter().chain(&right) {
            assert!(a.check_key(*key, 5));
        }
    }
}

#[cfg(test)]
mod false_positive_rate_tests {
    use super::*;

    #[test]
    fn test_complements_at_ten_bits_per_value() {
        let keys = generate_keys(1000, 3);
        let measure = || {
            let mut filter = Filter::with_capacity(keys.len(), 10);
            assert_eq!(filter.num_blocks(), 40);
            filter.insert_keys(&keys, 3);
            assert!(keys.iter().all(|&key| filter.check_key(key, 3)));
            keys.iter().filter(|&&key| filter.check_key(!key, 3)).count()
        };

        let false_positives = measure();
        assert_eq!(false_positives, measure());
        let rate = false_positives as f64 / keys.len() as f64;
        assert!(rate <= 0.01, "false positive rate {rate} above 1%");
    }

    #[test]
    fn test_complements_at_sixteen_bits_per_value() {
        let keys = generate_keys(10_000, 5);
        let mut filter = Filter::with_capacity(keys.len(), 16);
        filter.insert_keys(&keys, 0x5eed);
        let false_positives = keys
            .iter()
            .filter(|&&key| filter.check_key(!key, 0x5eed))
            .count();
        let rate = false_positives as f64 / keys.len() as f64;
        assert!(rate <= 0.005, "false positive rate {rate} above 0.5%");
    }

    #[test]
    fn test_false_positive_rate_varying_data_sizes() {
        let sizes_and_targets = vec![(100, 0.05), (500, 0.015), (1000, 0.01), (5000, 0.02)];

        for (num_values, target_fpp) in sizes_and_targets {
            let max_size = num_values * 16;

            let test_values = generate_test_data(num_values, "test_value");
            let non_inserted_values = generate_non_overlapping_test_data(10_000, "test_value");

            let collector = build_filter_with_string_values(&test_values, target_fpp, max_size);
            let filter = collector.filter().unwrap();

            for value in &test_values {
                let key = colidx_hash::key64_of_bytes(value.as_bytes());
                assert!(filter.check_key(key, collector.hash_seed()));
            }

            let fpp = measure_false_positive_rate(
                filter,
                collector.hash_seed(),
                &test_values,
                &non_inserted_values,
            );
            assert!(
                fpp <= target_fpp + 0.02, // Allow extra 2% for skewing of the results
                "False positive rate {fpp} exceeds target {target_fpp} for size {num_values}"
            );
        }
    }

    #[test]
    fn test_estimate_tracks_measurement() {
        let keys = generate_keys(4000, 8);
        let mut filter = Filter::with_capacity(keys.len(), 10);
        filter.insert_keys(&keys, 8);
        let queries = generate_keys(20_000, 9);
        let measured = queries.iter().filter(|&&key| filter.check_key(key, 8)).count() as f64
            / queries.len() as f64;
        let estimated = filter.false_positive_rate(keys.len());
        assert!(
            (measured - estimated).abs() < 0.005,
            "measured {measured}, estimated {estimated}"
        );
    }
}

#[cfg(test)]
mod property_tests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            rng_seed: proptest::test_runner::RngSeed::Fixed(0),
            failure_persistence: None,
            .. ProptestConfig::default()
        })]

        #[test]
        fn no_false_negatives(
            keys in proptest::collection::vec(any::<u64>(), 1..500),
            seed in any::<u64>(),
            bits_per_value in 1usize..20,
        ) {
            let mut filter = Filter::with_capacity(keys.len(), bits_per_value);
            filter.insert_keys(&keys, seed);
            let bytes = filter.to_bytes();
            let view = FilterView::new(&bytes).unwrap();
            let streaming = StreamingFilter::new(bytes.as_slice()).unwrap();
            let mut buf = [0u8; Block::BYTES];
            for &key in &keys {
                prop_assert!(filter.check_key(key, seed));
                prop_assert!(view.check_key(key, seed));
                prop_assert!(streaming.check_key(key, seed, &mut buf).unwrap());
            }
        }

        #[test]
        fn no_false_negatives_wide_keys(
            keys in proptest::collection::vec(any::<u128>(), 1..200),
            seed in any::<u64>(),
        ) {
            let mut filter = Filter::with_capacity(keys.len(), 8);
            for &key in &keys {
                filter.insert_key(key, seed);
            }
            for &key in &keys {
                prop_assert!(filter.check_key(key, seed));
            }
        }

        #[test]
        fn block_index_in_range(hash in any::<u64>(), num_blocks in 1usize..100_000) {
            let index = crate::block_index(hash, num_blocks);
            prop_assert!(index < num_blocks);
            prop_assert_eq!(index, crate::block_index(hash, num_blocks));
        }
    }
}
