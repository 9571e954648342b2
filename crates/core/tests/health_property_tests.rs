//! Property-based integration tests for status aggregation.
//!
//! These tests verify that universal properties hold across all valid inputs,
//! using the `proptest` crate for random test case generation.

use mcp_health_core::health::{aggregate_status, aggregator};
use mcp_health_core::{AggregateSnapshot, ComponentHealth, HealthStatus, HealthSummary};
use proptest::prelude::*;
use std::collections::HashMap;

// =============================================================================
// Generators
// =============================================================================

/// Generates a random status level.
fn arb_status() -> impl Strategy<Value = HealthStatus> {
    prop_oneof![
        Just(HealthStatus::Healthy),
        Just(HealthStatus::Degraded),
        Just(HealthStatus::Unhealthy),
    ]
}

/// Generates a set of component records with unique ids.
fn arb_components(max_count: usize) -> impl Strategy<Value = Vec<ComponentHealth>> {
    proptest::collection::hash_map("[a-z_]{3,12}", arb_status(), 0..=max_count).prop_map(
        |components| {
            components
                .into_iter()
                .map(|(id, status)| ComponentHealth::new(id, status, None, None))
                .collect()
        },
    )
}

fn build(records: &[ComponentHealth]) -> AggregateSnapshot {
    aggregator::snapshot(records)
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// The overall status is never better than the worst component.
    #[test]
    fn prop_overall_status_is_worst_component(
        statuses in proptest::collection::vec(arb_status(), 0..50)
    ) {
        let expected = statuses.iter().copied().max().unwrap_or(HealthStatus::Healthy);
        prop_assert_eq!(aggregate_status(statuses), expected);
    }

    /// One unhealthy component makes the system unhealthy, whatever the rest.
    #[test]
    fn prop_single_unhealthy_dominates(
        mut statuses in proptest::collection::vec(arb_status(), 0..50),
        position in any::<prop::sample::Index>(),
    ) {
        let at = position.index(statuses.len() + 1);
        statuses.insert(at, HealthStatus::Unhealthy);
        prop_assert_eq!(aggregate_status(statuses), HealthStatus::Unhealthy);
    }

    /// Without unhealthy components, any degraded fraction yields degraded.
    #[test]
    fn prop_any_degraded_fraction_is_degraded(
        healthy in 0usize..100,
        degraded in 1usize..100,
    ) {
        let mut statuses = vec![HealthStatus::Healthy; healthy];
        statuses.extend(vec![HealthStatus::Degraded; degraded]);
        prop_assert_eq!(aggregate_status(statuses), HealthStatus::Degraded);
    }

    /// Summary counts add up to the number of components.
    #[test]
    fn prop_summary_counts_are_accurate(
        records in arb_components(60)
    ) {
        let snapshot = build(&records);

        let mut expected: HashMap<HealthStatus, u32> = HashMap::new();
        for record in &records {
            *expected.entry(record.status).or_insert(0) += 1;
        }
        for status in HealthStatus::ALL {
            prop_assert_eq!(
                snapshot.summary.count(status),
                expected.get(&status).copied().unwrap_or(0),
                "Count for {} is off",
                status
            );
        }
        prop_assert_eq!(snapshot.summary.total() as usize, records.len());
        prop_assert_eq!(snapshot.components.len(), records.len());
    }

    /// The snapshot status agrees with aggregating its own components.
    #[test]
    fn prop_snapshot_is_self_consistent(
        records in arb_components(40)
    ) {
        let snapshot = build(&records);
        let recomputed = aggregate_status(snapshot.components.values().map(|c| c.status));
        prop_assert_eq!(snapshot.status, recomputed);
        prop_assert_eq!(snapshot.is_healthy(), recomputed == HealthStatus::Healthy);
    }

    /// Filtering by status returns exactly the matching ids.
    #[test]
    fn prop_components_with_status_filter_correctly(
        records in arb_components(40),
        filter in arb_status(),
    ) {
        let snapshot = build(&records);
        let ids = snapshot.components_with_status(filter);

        for id in &ids {
            prop_assert_eq!(snapshot.components[id].status, filter);
        }
        prop_assert_eq!(ids.len() as u32, snapshot.summary.count(filter));
    }

    /// Status strings parse back regardless of case.
    #[test]
    fn prop_status_parses_case_insensitively(
        status in arb_status(),
        upper in any::<bool>(),
    ) {
        let text = if upper {
            status.as_str().to_uppercase()
        } else {
            status.as_str().to_string()
        };
        prop_assert_eq!(text.parse::<HealthStatus>(), Ok(status));
    }

    /// An empty registry is healthy.
    #[test]
    fn prop_empty_registry_is_healthy(_dummy: u8) {
        let snapshot = build(&[]);
        prop_assert_eq!(snapshot.status, HealthStatus::Healthy);
        prop_assert_eq!(snapshot.summary, HealthSummary::default());
    }
}
