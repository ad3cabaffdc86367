//! Property-based tests for the reconciliation engine.

use proptest::prelude::*;

use battery_additive_mixer::additives::{normalize, AdditiveId, Canonical, CompoundSelection};
use battery_additive_mixer::reconcile::reconcile;

const TOLERANCE: f64 = 1e-6;

fn arb_name() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Compound 1".to_string()),
        Just("Compound 2".to_string()),
        Just("Compound 3".to_string()),
        Just("tep".to_string()),
        Just("additive y".to_string()),
        Just("Mystery Salt".to_string()),
        "[A-Za-z ]{1,12}".prop_filter("non-blank", |s| !s.trim().is_empty()),
    ]
}

fn arb_selections() -> impl Strategy<Value = Vec<CompoundSelection>> {
    proptest::collection::vec((arb_name(), 0.0f64..50.0), 0..8).prop_map(|entries| {
        entries
            .into_iter()
            .map(|(name, pct)| CompoundSelection::new(name, pct).unwrap())
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: no selections means only the base slot, holding the remainder
    #[test]
    fn prop_empty_selection_is_base_only(declared in 0.0f64..=100.0) {
        let result = reconcile(&[], declared, 3.0);
        for slot in result.additives.iter() {
            prop_assert_eq!(slot.used, slot.id == AdditiveId::Lp30);
        }
        let base = result.additives.get(AdditiveId::Lp30);
        prop_assert!((base.percentage - (100.0 - declared)).abs() < TOLERANCE);
    }

    /// Property: used percentages = matched additive sums + clamped leftover
    #[test]
    fn prop_used_sum_matches_inputs(
        selections in arb_selections(),
        declared in 0.0f64..200.0,
    ) {
        let result = reconcile(&selections, declared, 3.0);
        let matched: f64 = selections
            .iter()
            .filter_map(|s| match s.canonical() {
                Canonical::Known(id) if !id.is_base() => Some(s.percentage()),
                _ => None,
            })
            .sum();
        let expected = matched + (100.0 - declared).max(0.0);
        prop_assert!((result.additives.used_percentage() - expected).abs() < TOLERANCE);
    }

    /// Property: reconcile is a pure function
    #[test]
    fn prop_reconcile_is_idempotent(
        selections in arb_selections(),
        declared in 0.0f64..200.0,
        volume in 0.1f64..50.0,
    ) {
        prop_assert_eq!(
            reconcile(&selections, declared, volume),
            reconcile(&selections, declared, volume)
        );
    }

    /// Property: nothing negative, base always used, volume follows percentage
    #[test]
    fn prop_slots_are_well_formed(
        selections in arb_selections(),
        declared in 0.0f64..500.0,
        volume in 0.1f64..50.0,
    ) {
        let result = reconcile(&selections, declared, volume);
        prop_assert!(result.additives.get(AdditiveId::Lp30).used);
        for slot in result.additives.iter() {
            prop_assert!(slot.percentage >= 0.0);
            prop_assert!(slot.volume >= 0.0);
            prop_assert_eq!(slot.port, slot.id.port());
            if slot.used {
                prop_assert!((slot.volume - slot.percentage / 100.0 * volume).abs() < TOLERANCE);
            } else {
                prop_assert_eq!(slot.volume, 0.0);
            }
        }
    }

    /// Property: unrecognized keys never name a slot
    #[test]
    fn prop_unrecognized_keys_have_no_slot(name in "[A-Za-z0-9 ]{1,16}") {
        if let Canonical::Unrecognized(key) = normalize(&name) {
            prop_assert!(AdditiveId::from_key(&key).is_none());
            prop_assert!(!key.contains(' '));
        }
    }
}
