//! Pure FIFO consumption planning
//!
//! The costing service loads the cost layers of a product (already locked,
//! already ordered oldest-first) and asks this module which layers to draw
//! from and at what cost. Keeping the walk free of I/O makes the hard part
//! of the engine testable without a database.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::money::{div_round, Money};

/// A cost layer as seen by the planner: identity, what is left, at what cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerView {
    pub id: Uuid,
    pub quantity_remaining: i64,
    pub unit_cost: Money,
}

/// One draw against a single layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerTake {
    pub layer_id: Uuid,
    pub quantity: i64,
    pub unit_cost: Money,
}

/// The outcome of planning a consumption: which layers to decrement and the
/// aggregate cost figures the caller records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumptionPlan {
    pub takes: Vec<LayerTake>,
    pub total_cost: Money,
    pub weighted_average_cost: Money,
}

/// Planning failure: the layers on hand cannot cover the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("insufficient cost layers: requested {requested}, available {available}")]
    Insufficient { requested: i64, available: i64 },
    #[error("consumption quantity must be positive, got {0}")]
    NonPositiveQuantity(i64),
}

/// Walk `layers` in the order given (callers supply them ordered by
/// `(acquired_at, id)` ascending) and plan the draws that satisfy `quantity`.
///
/// Fails without planning anything if the summed remaining quantity is short
/// of the request; the `available` figure in the error is exact.
pub fn plan_consumption(layers: &[LayerView], quantity: i64) -> Result<ConsumptionPlan, PlanError> {
    if quantity <= 0 {
        return Err(PlanError::NonPositiveQuantity(quantity));
    }

    let available: i64 = layers.iter().map(|l| l.quantity_remaining).sum();
    if available < quantity {
        return Err(PlanError::Insufficient {
            requested: quantity,
            available,
        });
    }

    let mut takes = Vec::new();
    let mut total_cost: Money = 0;
    let mut needed = quantity;

    for layer in layers {
        if needed == 0 {
            break;
        }
        if layer.quantity_remaining <= 0 {
            continue;
        }
        let take = needed.min(layer.quantity_remaining);
        takes.push(LayerTake {
            layer_id: layer.id,
            quantity: take,
            unit_cost: layer.unit_cost,
        });
        total_cost += take * layer.unit_cost;
        needed -= take;
    }

    Ok(ConsumptionPlan {
        takes,
        total_cost,
        weighted_average_cost: div_round(total_cost, quantity),
    })
}

/// Weighted-average unit cost of the active layers, or `None` when no layer
/// has stock remaining. Callers fall back to the product's last known cost.
pub fn weighted_average(layers: &[LayerView]) -> Option<Money> {
    let quantity: i64 = layers
        .iter()
        .filter(|l| l.quantity_remaining > 0)
        .map(|l| l.quantity_remaining)
        .sum();
    if quantity == 0 {
        return None;
    }
    let value: Money = layers
        .iter()
        .filter(|l| l.quantity_remaining > 0)
        .map(|l| l.quantity_remaining * l.unit_cost)
        .sum();
    Some(div_round(value, quantity))
}
