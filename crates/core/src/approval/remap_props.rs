//! Property-based tests for workflow level remapping.

use proptest::prelude::*;
use std::collections::BTreeSet;

use crate::approval::remap::{placement_in, remap_level_numbers};

/// Strategy for a set of distinct global level numbers.
fn arb_level_numbers() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::btree_set(1u32..50, 0..12).prop_map(|set| set.into_iter().collect())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Remapped numbers are exactly 1..=n.
    #[test]
    fn prop_remap_is_contiguous(numbers in arb_level_numbers()) {
        let remapped: BTreeSet<u32> = remap_level_numbers(&numbers).into_iter().collect();
        let expected: BTreeSet<u32> = (1..=u32::try_from(numbers.len()).unwrap()).collect();
        prop_assert_eq!(remapped, expected);
    }

    /// Remapping preserves the relative order of levels.
    #[test]
    fn prop_remap_preserves_order(numbers in arb_level_numbers().prop_shuffle()) {
        let remapped = remap_level_numbers(&numbers);
        for i in 0..numbers.len() {
            for j in 0..numbers.len() {
                prop_assert_eq!(numbers[i] < numbers[j], remapped[i] < remapped[j]);
            }
        }
    }

    /// A placed level orders against every workflow level exactly as its
    /// global number does.
    #[test]
    fn prop_placement_preserves_order(
        numbers in arb_level_numbers(),
        level in 1u32..60,
    ) {
        let rank = placement_in(&numbers, level).rank();
        for (&n, &r) in numbers.iter().zip(&remap_level_numbers(&numbers)) {
            prop_assert_eq!(rank.cmp(&(u64::from(r) * 2)), level.cmp(&n));
        }
    }
}
