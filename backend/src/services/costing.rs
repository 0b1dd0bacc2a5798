//! FIFO inventory-costing engine
//!
//! Tracks cost layers (batches of stock acquired at a specific unit cost)
//! per product and consumes them oldest-first when stock leaves. Every
//! consumption is recorded as an append-only row linking back to the order
//! line or adjustment that triggered it.
//!
//! The engine functions in this module are transaction-agnostic: they take
//! the caller's open `PgConnection` and never begin or commit themselves.
//! Callers must hold the product row lock (see
//! [`product::lock_for_update`](crate::services::product::lock_for_update))
//! before invoking any of them; the engine then locks the layer rows it
//! touches, always after the product, so lock order is uniform crate-wide.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use shared::fifo::{self, LayerView, PlanError};
use shared::models::MIGRATION_REFERENCE;
use shared::money::{div_round, Money};

use crate::error::{AppError, AppResult};
use crate::services::product::Product;

/// A batch of stock acquired at a single unit cost.
///
/// `quantity_remaining` only ever decreases; a layer is never deleted, it
/// becomes inert at zero.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CostLayer {
    pub id: Uuid,
    pub product_id: Uuid,
    pub tenant_id: Uuid,
    pub source_adjustment_id: Option<Uuid>,
    pub quantity_acquired: i64,
    pub quantity_remaining: i64,
    pub unit_cost: Money,
    pub reference: Option<String>,
    pub acquired_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// One consumption event against one layer. Append-only: written exactly
/// once, never updated or deleted. `unit_cost` is a snapshot of the layer's
/// cost at consumption time.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Consumption {
    pub id: Uuid,
    pub cost_layer_id: Uuid,
    pub order_item_id: Option<Uuid>,
    pub adjustment_id: Option<Uuid>,
    pub quantity_consumed: i64,
    pub unit_cost: Money,
    pub created_at: DateTime<Utc>,
}

/// The operation a consumption is attributed to. Order lines and
/// adjustments are mutually exclusive.
#[derive(Debug, Clone, Copy)]
pub enum LinkedOperation {
    OrderItem(Uuid),
    Adjustment(Uuid),
}

impl LinkedOperation {
    fn order_item_id(self) -> Option<Uuid> {
        match self {
            LinkedOperation::OrderItem(id) => Some(id),
            LinkedOperation::Adjustment(_) => None,
        }
    }

    fn adjustment_id(self) -> Option<Uuid> {
        match self {
            LinkedOperation::OrderItem(_) => None,
            LinkedOperation::Adjustment(id) => Some(id),
        }
    }
}

/// Result of a consumption: the rows written plus the aggregate cost
/// figures. `total_cost` feeds COGS ledger entries; `weighted_average_cost`
/// is the per-unit cost recorded on the triggering operation.
#[derive(Debug, Clone, Serialize)]
pub struct ConsumeOutcome {
    pub consumptions: Vec<Consumption>,
    pub total_cost: Money,
    pub weighted_average_cost: Money,
}

/// Arguments for creating a cost layer
#[derive(Debug, Clone)]
pub struct CreateLayerArgs {
    pub product_id: Uuid,
    pub tenant_id: Uuid,
    pub quantity: i64,
    pub unit_cost: Money,
    pub source_adjustment_id: Option<Uuid>,
    pub reference: Option<String>,
    /// FIFO ordering key. `None` means the database clock at insert time.
    pub acquired_at: Option<DateTime<Utc>>,
}

/// Outcome of a "set" adjustment, by sign of the stock delta
#[derive(Debug)]
pub enum SetOutcome {
    Increased { layer: CostLayer },
    Decreased { outcome: ConsumeOutcome },
    Unchanged,
}

/// Insert a new cost layer with `quantity_remaining = quantity`.
///
/// Has no side effect on the product row; the caller updates stock and the
/// weighted-average cost separately.
pub async fn create_layer(
    conn: &mut PgConnection,
    args: CreateLayerArgs,
) -> AppResult<CostLayer> {
    if args.quantity <= 0 {
        return Err(AppError::Validation {
            field: "quantity".to_string(),
            message: "Layer quantity must be positive".to_string(),
        });
    }
    if args.unit_cost < 0 {
        return Err(AppError::Validation {
            field: "unit_cost".to_string(),
            message: "Unit cost cannot be negative".to_string(),
        });
    }

    let layer = sqlx::query_as::<_, CostLayer>(
        r#"
        INSERT INTO cost_layers (
            product_id, tenant_id, source_adjustment_id,
            quantity_acquired, quantity_remaining, unit_cost, reference, acquired_at
        )
        VALUES ($1, $2, $3, $4, $4, $5, $6, COALESCE($7, now()))
        RETURNING id, product_id, tenant_id, source_adjustment_id,
                  quantity_acquired, quantity_remaining, unit_cost, reference,
                  acquired_at, created_at
        "#,
    )
    .bind(args.product_id)
    .bind(args.tenant_id)
    .bind(args.source_adjustment_id)
    .bind(args.quantity)
    .bind(args.unit_cost)
    .bind(&args.reference)
    .bind(args.acquired_at)
    .fetch_one(&mut *conn)
    .await?;

    Ok(layer)
}

/// Consume `quantity` units from the product's layers, oldest first.
///
/// Locks the active layers in FIFO order for the rest of the transaction,
/// then either satisfies the whole request or fails with
/// `InsufficientCostLayers` having mutated nothing. Ordering ties on
/// `acquired_at` break on `id`, so consumption order is deterministic.
pub async fn consume_layers(
    conn: &mut PgConnection,
    product_id: Uuid,
    quantity: i64,
    linked: Option<LinkedOperation>,
) -> AppResult<ConsumeOutcome> {
    let layers = sqlx::query_as::<_, CostLayer>(
        r#"
        SELECT id, product_id, tenant_id, source_adjustment_id,
               quantity_acquired, quantity_remaining, unit_cost, reference,
               acquired_at, created_at
        FROM cost_layers
        WHERE product_id = $1 AND quantity_remaining > 0
        ORDER BY acquired_at ASC, id ASC
        FOR UPDATE
        "#,
    )
    .bind(product_id)
    .fetch_all(&mut *conn)
    .await?;

    let views: Vec<LayerView> = layers
        .iter()
        .map(|l| LayerView {
            id: l.id,
            quantity_remaining: l.quantity_remaining,
            unit_cost: l.unit_cost,
        })
        .collect();

    let plan = fifo::plan_consumption(&views, quantity).map_err(|e| match e {
        PlanError::Insufficient {
            requested,
            available,
        } => AppError::InsufficientCostLayers {
            product_id,
            requested,
            available,
        },
        PlanError::NonPositiveQuantity(q) => AppError::Validation {
            field: "quantity".to_string(),
            message: format!("Consumption quantity must be positive, got {}", q),
        },
    })?;

    let mut consumptions = Vec::with_capacity(plan.takes.len());
    for take in &plan.takes {
        consumptions.push(apply_take(conn, take.layer_id, take.quantity, linked).await?);
    }

    Ok(ConsumeOutcome {
        consumptions,
        total_cost: plan.total_cost,
        weighted_average_cost: plan.weighted_average_cost,
    })
}

/// Consume from one specific layer, bypassing FIFO order.
///
/// Used for targeted write-offs ("this damaged batch specifically"). The
/// layer must cover the full quantity on its own.
pub async fn consume_specific_layer(
    conn: &mut PgConnection,
    cost_layer_id: Uuid,
    quantity: i64,
    linked: Option<LinkedOperation>,
) -> AppResult<ConsumeOutcome> {
    if quantity <= 0 {
        return Err(AppError::Validation {
            field: "quantity".to_string(),
            message: format!("Consumption quantity must be positive, got {}", quantity),
        });
    }

    let layer = sqlx::query_as::<_, CostLayer>(
        r#"
        SELECT id, product_id, tenant_id, source_adjustment_id,
               quantity_acquired, quantity_remaining, unit_cost, reference,
               acquired_at, created_at
        FROM cost_layers
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(cost_layer_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Cost layer".to_string()))?;

    if layer.quantity_remaining < quantity {
        return Err(AppError::InsufficientCostLayers {
            product_id: layer.product_id,
            requested: quantity,
            available: layer.quantity_remaining,
        });
    }

    let consumption = apply_take(conn, layer.id, quantity, linked).await?;
    let total_cost = quantity * layer.unit_cost;

    Ok(ConsumeOutcome {
        consumptions: vec![consumption],
        total_cost,
        weighted_average_cost: layer.unit_cost,
    })
}

/// Model a physical stock count correction as an implicit add or remove.
///
/// A positive delta creates one layer at `unit_cost`, falling back to the
/// product's last known cost, then its price. A negative delta consumes
/// FIFO (backfilling legacy stock first). Zero delta is a no-op.
pub async fn handle_set_adjustment(
    conn: &mut PgConnection,
    product: &Product,
    stock_before: i64,
    stock_after: i64,
    unit_cost: Option<Money>,
    source_adjustment_id: Option<Uuid>,
    reference: Option<String>,
) -> AppResult<SetOutcome> {
    let delta = stock_after - stock_before;

    if delta > 0 {
        let layer = create_layer(
            conn,
            CreateLayerArgs {
                product_id: product.id,
                tenant_id: product.tenant_id,
                quantity: delta,
                unit_cost: unit_cost.unwrap_or_else(|| product.fallback_unit_cost()),
                source_adjustment_id,
                reference,
                acquired_at: None,
            },
        )
        .await?;
        Ok(SetOutcome::Increased { layer })
    } else if delta < 0 {
        ensure_layers_exist(conn, product).await?;
        let outcome = consume_layers(
            conn,
            product.id,
            -delta,
            source_adjustment_id.map(LinkedOperation::Adjustment),
        )
        .await?;
        Ok(SetOutcome::Decreased { outcome })
    } else {
        Ok(SetOutcome::Unchanged)
    }
}

/// Weighted-average unit cost over the active layers, `None` when no layer
/// has stock. Uses the same rounding as `consume_layers`.
pub async fn weighted_average_cost(
    conn: &mut PgConnection,
    product_id: Uuid,
) -> AppResult<Option<Money>> {
    let (on_hand, value) = sqlx::query_as::<_, (i64, i64)>(
        r#"
        SELECT COALESCE(SUM(quantity_remaining), 0)::BIGINT,
               COALESCE(SUM(quantity_remaining * unit_cost), 0)::BIGINT
        FROM cost_layers
        WHERE product_id = $1 AND quantity_remaining > 0
        "#,
    )
    .bind(product_id)
    .fetch_one(&mut *conn)
    .await?;

    if on_hand == 0 {
        return Ok(None);
    }
    Ok(Some(div_round(value, on_hand)))
}

/// Backfill a layer for stock that predates FIFO costing.
///
/// Products migrated from a pre-costing system can carry `stock > 0` with no
/// layers at all; consuming from them would fail spuriously. If the product
/// has positive stock and zero active layers, synthesize one covering the
/// full stock at the fallback unit cost, tagged `MIGRATION`. Idempotent.
pub async fn ensure_layers_exist(
    conn: &mut PgConnection,
    product: &Product,
) -> AppResult<Option<CostLayer>> {
    if product.stock <= 0 {
        return Ok(None);
    }

    let active_layers = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM cost_layers WHERE product_id = $1 AND quantity_remaining > 0",
    )
    .bind(product.id)
    .fetch_one(&mut *conn)
    .await?;

    if active_layers > 0 {
        return Ok(None);
    }

    let layer = create_layer(
        conn,
        CreateLayerArgs {
            product_id: product.id,
            tenant_id: product.tenant_id,
            quantity: product.stock,
            unit_cost: product.fallback_unit_cost(),
            source_adjustment_id: None,
            reference: Some(MIGRATION_REFERENCE.to_string()),
            acquired_at: None,
        },
    )
    .await?;

    tracing::debug!(
        product_id = %product.id,
        quantity = layer.quantity_acquired,
        "backfilled cost layer for legacy stock"
    );

    Ok(Some(layer))
}

/// Decrement one layer and record the consumption row.
async fn apply_take(
    conn: &mut PgConnection,
    cost_layer_id: Uuid,
    quantity: i64,
    linked: Option<LinkedOperation>,
) -> AppResult<Consumption> {
    sqlx::query(
        "UPDATE cost_layers SET quantity_remaining = quantity_remaining - $1 WHERE id = $2",
    )
    .bind(quantity)
    .bind(cost_layer_id)
    .execute(&mut *conn)
    .await?;

    let consumption = sqlx::query_as::<_, Consumption>(
        r#"
        INSERT INTO cost_layer_consumptions (
            cost_layer_id, order_item_id, adjustment_id, quantity_consumed, unit_cost
        )
        SELECT id, $2, $3, $4, unit_cost
        FROM cost_layers
        WHERE id = $1
        RETURNING id, cost_layer_id, order_item_id, adjustment_id,
                  quantity_consumed, unit_cost, created_at
        "#,
    )
    .bind(cost_layer_id)
    .bind(linked.and_then(LinkedOperation::order_item_id))
    .bind(linked.and_then(LinkedOperation::adjustment_id))
    .bind(quantity)
    .fetch_one(&mut *conn)
    .await?;

    Ok(consumption)
}

// ----------------------------------------------------------------------------
// Audit / valuation reads
// ----------------------------------------------------------------------------

/// Valuation of a product's on-hand stock from its active layers
#[derive(Debug, Clone, Serialize)]
pub struct ProductValuation {
    pub product_id: Uuid,
    pub sku: String,
    pub on_hand: i64,
    pub unit_cost: Option<Money>,
    pub total_value: Money,
}

/// Costing service for the read-only audit surfaces
#[derive(Clone)]
pub struct CostingService {
    db: PgPool,
}

impl CostingService {
    /// Create a new CostingService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List cost layers for a product, FIFO order, exhausted layers included
    pub async fn list_layers(
        &self,
        tenant_id: Uuid,
        product_id: Uuid,
    ) -> AppResult<Vec<CostLayer>> {
        self.assert_product(tenant_id, product_id).await?;

        let layers = sqlx::query_as::<_, CostLayer>(
            r#"
            SELECT id, product_id, tenant_id, source_adjustment_id,
                   quantity_acquired, quantity_remaining, unit_cost, reference,
                   acquired_at, created_at
            FROM cost_layers
            WHERE product_id = $1 AND tenant_id = $2
            ORDER BY acquired_at ASC, id ASC
            "#,
        )
        .bind(product_id)
        .bind(tenant_id)
        .fetch_all(&self.db)
        .await?;

        Ok(layers)
    }

    /// Consumption trail for a product, newest first
    pub async fn list_consumptions(
        &self,
        tenant_id: Uuid,
        product_id: Uuid,
    ) -> AppResult<Vec<Consumption>> {
        self.assert_product(tenant_id, product_id).await?;

        let consumptions = sqlx::query_as::<_, Consumption>(
            r#"
            SELECT c.id, c.cost_layer_id, c.order_item_id, c.adjustment_id,
                   c.quantity_consumed, c.unit_cost, c.created_at
            FROM cost_layer_consumptions c
            JOIN cost_layers l ON l.id = c.cost_layer_id
            WHERE l.product_id = $1 AND l.tenant_id = $2
            ORDER BY c.created_at DESC, c.id DESC
            "#,
        )
        .bind(product_id)
        .bind(tenant_id)
        .fetch_all(&self.db)
        .await?;

        Ok(consumptions)
    }

    /// Value the product's on-hand stock from its active layers
    pub async fn valuation(
        &self,
        tenant_id: Uuid,
        product_id: Uuid,
    ) -> AppResult<ProductValuation> {
        let sku = self.assert_product(tenant_id, product_id).await?;

        let (on_hand, total_value) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT COALESCE(SUM(quantity_remaining), 0)::BIGINT,
                   COALESCE(SUM(quantity_remaining * unit_cost), 0)::BIGINT
            FROM cost_layers
            WHERE product_id = $1 AND quantity_remaining > 0
            "#,
        )
        .bind(product_id)
        .fetch_one(&self.db)
        .await?;

        let unit_cost = if on_hand > 0 {
            Some(div_round(total_value, on_hand))
        } else {
            None
        };

        Ok(ProductValuation {
            product_id,
            sku,
            on_hand,
            unit_cost,
            total_value,
        })
    }

    async fn assert_product(&self, tenant_id: Uuid, product_id: Uuid) -> AppResult<String> {
        sqlx::query_scalar::<_, String>(
            "SELECT sku FROM products WHERE id = $1 AND tenant_id = $2",
        )
        .bind(product_id)
        .bind(tenant_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }
}
