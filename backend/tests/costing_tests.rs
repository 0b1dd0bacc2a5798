//! FIFO costing engine tests
//!
//! Tests for the consumption planner and cost arithmetic, including:
//! - Conservation: planned draws always sum to the requested quantity
//! - FIFO order: oldest layers are exhausted first, deterministically
//! - No over-consumption: a layer is never drawn below zero
//! - Weighted-average and rounding consistency across the engine

use proptest::prelude::*;
use uuid::Uuid;

use shared::fifo::{plan_consumption, weighted_average, LayerView, PlanError};
use shared::money::div_round;

// Helper to build a layer view
fn layer(remaining: i64, unit_cost: i64) -> LayerView {
    LayerView {
        id: Uuid::new_v4(),
        quantity_remaining: remaining,
        unit_cost,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Consuming 25 from (20 @ 5000, 30 @ 6000): 130000 total, 5200 average
    #[test]
    fn test_rounding_worked_example() {
        let layers = vec![layer(20, 5_000), layer(30, 6_000)];
        let plan = plan_consumption(&layers, 25).unwrap();

        assert_eq!(plan.total_cost, 20 * 5_000 + 5 * 6_000);
        assert_eq!(plan.total_cost, 130_000);
        assert_eq!(plan.weighted_average_cost, div_round(130_000, 25));
        assert_eq!(plan.weighted_average_cost, 5_200);
    }

    /// On-hand (20 @ 5000, 30 @ 6000) averages to 5600
    #[test]
    fn test_weighted_average_worked_example() {
        let layers = vec![layer(20, 5_000), layer(30, 6_000)];
        assert_eq!(
            weighted_average(&layers),
            Some(div_round(20 * 5_000 + 30 * 6_000, 50))
        );
        assert_eq!(weighted_average(&layers), Some(5_600));
    }

    /// Creating 10 @ 5000 then consuming exactly 10 drains the layer
    #[test]
    fn test_exact_exhaustion() {
        let layers = vec![layer(10, 5_000)];
        let plan = plan_consumption(&layers, 10).unwrap();

        assert_eq!(plan.takes.len(), 1);
        assert_eq!(plan.takes[0].quantity, 10);
        assert_eq!(plan.total_cost, 50_000);

        // Applying the plan leaves the layer at zero
        let remaining = layers[0].quantity_remaining - plan.takes[0].quantity;
        assert_eq!(remaining, 0);
    }

    /// Requesting 20 from a layer holding 10 fails with accurate figures
    #[test]
    fn test_overdraw_rejected_with_accurate_availability() {
        let layers = vec![layer(10, 5_000)];
        let err = plan_consumption(&layers, 20).unwrap_err();

        assert_eq!(
            err,
            PlanError::Insufficient {
                requested: 20,
                available: 10,
            }
        );
    }

    /// FIFO walks layers in the order given and drains them front to back
    #[test]
    fn test_fifo_consumes_front_to_back() {
        let layers = vec![layer(5, 100), layer(5, 200), layer(5, 300)];
        let plan = plan_consumption(&layers, 12).unwrap();

        assert_eq!(plan.takes.len(), 3);
        assert_eq!(plan.takes[0].quantity, 5);
        assert_eq!(plan.takes[1].quantity, 5);
        assert_eq!(plan.takes[2].quantity, 2);
        assert_eq!(plan.takes[0].unit_cost, 100);
        assert_eq!(plan.takes[2].unit_cost, 300);
        assert_eq!(plan.total_cost, 5 * 100 + 5 * 200 + 2 * 300);
    }

    /// Exhausted layers are inert: skipped by the walk, never drawn from
    #[test]
    fn test_exhausted_layers_are_skipped() {
        let layers = vec![layer(0, 50), layer(3, 150)];
        let plan = plan_consumption(&layers, 2).unwrap();

        assert_eq!(plan.takes.len(), 1);
        assert_eq!(plan.takes[0].layer_id, layers[1].id);
    }

    /// A single-layer draw averages to that layer's unit cost exactly
    #[test]
    fn test_single_layer_average_is_unit_cost() {
        let layers = vec![layer(40, 777)];
        let plan = plan_consumption(&layers, 15).unwrap();

        assert_eq!(plan.weighted_average_cost, 777);
        assert_eq!(plan.total_cost, 15 * 777);
    }

    /// No active layers means no average; callers fall back to product cost
    #[test]
    fn test_no_layers_no_average() {
        assert_eq!(weighted_average(&[]), None);
        assert_eq!(weighted_average(&[layer(0, 1_234)]), None);
    }

    /// Zero and negative requests are rejected before any planning
    #[test]
    fn test_non_positive_quantity_rejected() {
        let layers = vec![layer(10, 100)];
        assert_eq!(
            plan_consumption(&layers, 0),
            Err(PlanError::NonPositiveQuantity(0))
        );
        assert_eq!(
            plan_consumption(&layers, -3),
            Err(PlanError::NonPositiveQuantity(-3))
        );
    }

    /// Zero-cost layers are legal (donated stock) and cost nothing
    #[test]
    fn test_zero_cost_layers() {
        let layers = vec![layer(10, 0), layer(10, 500)];
        let plan = plan_consumption(&layers, 10).unwrap();

        assert_eq!(plan.total_cost, 0);
        assert_eq!(plan.weighted_average_cost, 0);
    }

    /// Rounding is half away from zero everywhere
    #[test]
    fn test_rounding_rule() {
        // 3 units costing 100 total: 33.33.. rounds down
        assert_eq!(div_round(100, 3), 33);
        // 2 units costing 101 total: 50.5 rounds up
        assert_eq!(div_round(101, 2), 51);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for a stack of layers: (remaining, unit_cost) pairs
    fn layer_stack_strategy() -> impl Strategy<Value = Vec<LayerView>> {
        prop::collection::vec((0i64..=500, 0i64..=10_000), 1..12)
            .prop_map(|pairs| pairs.into_iter().map(|(q, c)| layer(q, c)).collect())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Conservation: planned draws sum exactly to the request, and no
        /// draw exceeds its layer's remaining quantity
        #[test]
        fn prop_conservation(
            layers in layer_stack_strategy(),
            quantity in 1i64..=2_000
        ) {
            let available: i64 = layers.iter().map(|l| l.quantity_remaining).sum();

            match plan_consumption(&layers, quantity) {
                Ok(plan) => {
                    prop_assert!(available >= quantity);
                    let drawn: i64 = plan.takes.iter().map(|t| t.quantity).sum();
                    prop_assert_eq!(drawn, quantity);

                    for take in &plan.takes {
                        let source = layers.iter().find(|l| l.id == take.layer_id).unwrap();
                        prop_assert!(take.quantity >= 1);
                        prop_assert!(take.quantity <= source.quantity_remaining);
                    }
                }
                Err(PlanError::Insufficient { requested, available: reported }) => {
                    prop_assert_eq!(requested, quantity);
                    prop_assert_eq!(reported, available);
                    prop_assert!(available < quantity);
                }
                Err(PlanError::NonPositiveQuantity(_)) => {
                    prop_assert!(false, "quantity strategy is strictly positive");
                }
            }
        }

        /// FIFO order: every drawn layer except the last is fully drained,
        /// and draws appear in stack order
        #[test]
        fn prop_fifo_prefix_exhaustion(
            layers in layer_stack_strategy(),
            quantity in 1i64..=2_000
        ) {
            if let Ok(plan) = plan_consumption(&layers, quantity) {
                // Draws follow the stack order
                let positions: Vec<usize> = plan
                    .takes
                    .iter()
                    .map(|t| layers.iter().position(|l| l.id == t.layer_id).unwrap())
                    .collect();
                let mut sorted = positions.clone();
                sorted.sort_unstable();
                prop_assert_eq!(&positions, &sorted);

                // All but the last draw drain their layer completely
                for take in plan.takes.iter().rev().skip(1) {
                    let source = layers.iter().find(|l| l.id == take.layer_id).unwrap();
                    prop_assert_eq!(take.quantity, source.quantity_remaining);
                }
            }
        }

        /// Total cost is the exact sum of per-draw quantity times unit cost
        #[test]
        fn prop_total_cost_exact(
            layers in layer_stack_strategy(),
            quantity in 1i64..=2_000
        ) {
            if let Ok(plan) = plan_consumption(&layers, quantity) {
                let expected: i64 = plan.takes.iter().map(|t| t.quantity * t.unit_cost).sum();
                prop_assert_eq!(plan.total_cost, expected);
                prop_assert_eq!(plan.weighted_average_cost, div_round(expected, quantity));
            }
        }

        /// The weighted-average cost of a draw lies between the cheapest and
        /// the most expensive layer it touched
        #[test]
        fn prop_average_within_drawn_bounds(
            layers in layer_stack_strategy(),
            quantity in 1i64..=2_000
        ) {
            if let Ok(plan) = plan_consumption(&layers, quantity) {
                let min = plan.takes.iter().map(|t| t.unit_cost).min().unwrap();
                let max = plan.takes.iter().map(|t| t.unit_cost).max().unwrap();
                prop_assert!(plan.weighted_average_cost >= min);
                prop_assert!(plan.weighted_average_cost <= max);
            }
        }

        /// Replanning after applying a plan never finds stock that the first
        /// plan already spent (the two plans together never overdraw)
        #[test]
        fn prop_sequential_plans_never_overdraw(
            layers in layer_stack_strategy(),
            first in 1i64..=1_000,
            second in 1i64..=1_000
        ) {
            let available: i64 = layers.iter().map(|l| l.quantity_remaining).sum();

            if let Ok(plan) = plan_consumption(&layers, first) {
                // Apply the first plan
                let mut after: Vec<LayerView> = layers.clone();
                for take in &plan.takes {
                    let l = after.iter_mut().find(|l| l.id == take.layer_id).unwrap();
                    l.quantity_remaining -= take.quantity;
                    prop_assert!(l.quantity_remaining >= 0);
                }

                match plan_consumption(&after, second) {
                    Ok(second_plan) => {
                        let drawn: i64 = second_plan.takes.iter().map(|t| t.quantity).sum();
                        prop_assert!(first + drawn <= available);
                    }
                    Err(PlanError::Insufficient { available: left, .. }) => {
                        prop_assert_eq!(left, available - first);
                    }
                    Err(_) => {}
                }
            }
        }
    }
}
