//! Inventory adjustment service
//!
//! Adjustments are the manual stock-mutation boundary: "add" receives stock
//! at a cost, "remove" writes stock off (FIFO, or one targeted layer), and
//! "set" corrects stock to a counted absolute level. Each one runs as a
//! single transaction around the costing engine and leaves a balance-ledger
//! trail.
//!
//! Cost writeback rules: additions reprice the product to the new weighted
//! average; removals never touch the cost of what remains.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use uuid::Uuid;

use shared::models::{AdjustmentKind, LedgerCategory, LedgerEntryType};
use shared::money::Money;
use shared::validation;

use crate::error::{AppError, AppResult};
use crate::services::costing::{self, ConsumeOutcome, CostLayer, LinkedOperation, SetOutcome};
use crate::services::{ledger, product};

/// Adjustment service
#[derive(Clone)]
pub struct AdjustmentService {
    db: PgPool,
}

/// A recorded inventory adjustment
#[derive(Debug, Clone, Serialize)]
pub struct Adjustment {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub product_id: Uuid,
    pub kind: AdjustmentKind,
    pub quantity: i64,
    pub stock_before: i64,
    pub stock_after: i64,
    pub unit_cost: Option<Money>,
    pub cost_layer_id: Option<Uuid>,
    pub note: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Raw row; `kind` is stored as text
#[derive(Debug, FromRow)]
struct AdjustmentRow {
    id: Uuid,
    tenant_id: Uuid,
    product_id: Uuid,
    kind: String,
    quantity: i64,
    stock_before: i64,
    stock_after: i64,
    unit_cost: Option<i64>,
    cost_layer_id: Option<Uuid>,
    note: Option<String>,
    created_by: Uuid,
    created_at: DateTime<Utc>,
}

impl TryFrom<AdjustmentRow> for Adjustment {
    type Error = AppError;

    fn try_from(row: AdjustmentRow) -> Result<Self, Self::Error> {
        let kind = AdjustmentKind::from_str(&row.kind)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!(e)))?;
        Ok(Adjustment {
            id: row.id,
            tenant_id: row.tenant_id,
            product_id: row.product_id,
            kind,
            quantity: row.quantity,
            stock_before: row.stock_before,
            stock_after: row.stock_after,
            unit_cost: row.unit_cost,
            cost_layer_id: row.cost_layer_id,
            note: row.note,
            created_by: row.created_by,
            created_at: row.created_at,
        })
    }
}

/// Input for applying an adjustment
#[derive(Debug, Deserialize)]
pub struct CreateAdjustmentInput {
    pub product_id: Uuid,
    pub kind: AdjustmentKind,
    /// Units added/removed for add/remove; the target stock level for set.
    pub quantity: i64,
    /// Acquisition cost for add/set increases; defaults to the product's
    /// last known cost, then its price.
    pub unit_cost: Option<Money>,
    /// Target a specific layer (remove only), bypassing FIFO order.
    pub cost_layer_id: Option<Uuid>,
    pub note: Option<String>,
}

/// What an adjustment did, for the API response
#[derive(Debug, Serialize)]
pub struct AdjustmentResult {
    pub adjustment: Adjustment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_layer: Option<CostLayer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumption: Option<ConsumeOutcome>,
}

impl AdjustmentService {
    /// Create a new AdjustmentService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Apply an inventory adjustment atomically
    pub async fn apply(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        input: CreateAdjustmentInput,
    ) -> AppResult<AdjustmentResult> {
        self.validate(&input)?;

        let mut tx = self.db.begin().await?;

        // Product lock first, then layers
        let product = product::lock_for_update(&mut *tx, tenant_id, input.product_id).await?;

        let stock_before = product.stock;
        let stock_after = match input.kind {
            AdjustmentKind::Add => stock_before + input.quantity,
            AdjustmentKind::Remove => stock_before - input.quantity,
            AdjustmentKind::Set => input.quantity,
        };

        // The adjustment row is written first so the engine can link layers
        // and consumptions back to it.
        let adjustment_id = Uuid::new_v4();
        let row = sqlx::query_as::<_, AdjustmentRow>(
            r#"
            INSERT INTO adjustments (
                id, tenant_id, product_id, kind, quantity,
                stock_before, stock_after, unit_cost, cost_layer_id, note, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id, tenant_id, product_id, kind, quantity,
                      stock_before, stock_after, unit_cost, cost_layer_id, note,
                      created_by, created_at
            "#,
        )
        .bind(adjustment_id)
        .bind(tenant_id)
        .bind(product.id)
        .bind(input.kind.as_str())
        .bind(input.quantity)
        .bind(stock_before)
        .bind(stock_after)
        .bind(input.unit_cost)
        .bind(input.cost_layer_id)
        .bind(&input.note)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
        let adjustment: Adjustment = row.try_into()?;

        let reference = input
            .note
            .clone()
            .unwrap_or_else(|| format!("ADJ-{}", adjustment_id));

        let mut created_layer = None;
        let mut consumption = None;

        match input.kind {
            AdjustmentKind::Add => {
                let layer = costing::create_layer(
                    &mut *tx,
                    costing::CreateLayerArgs {
                        product_id: product.id,
                        tenant_id,
                        quantity: input.quantity,
                        unit_cost: input.unit_cost.unwrap_or_else(|| product.fallback_unit_cost()),
                        source_adjustment_id: Some(adjustment_id),
                        reference: Some(reference.clone()),
                        acquired_at: None,
                    },
                )
                .await?;

                let new_cost = costing::weighted_average_cost(&mut *tx, product.id).await?;
                product::write_back(&mut *tx, product.id, stock_after, new_cost).await?;

                ledger::append(
                    &mut *tx,
                    tenant_id,
                    ledger::NewLedgerEntry {
                        product_id: Some(product.id),
                        entry_type: LedgerEntryType::StockIn,
                        category: LedgerCategory::Inventory,
                        quantity: Some(input.quantity),
                        amount: Some(input.quantity * layer.unit_cost),
                        reference: Some(reference),
                    },
                )
                .await?;

                created_layer = Some(layer);
            }
            AdjustmentKind::Remove => {
                let outcome = if let Some(layer_id) = input.cost_layer_id {
                    self.assert_layer_owner(&mut tx, layer_id, product.id).await?;
                    costing::consume_specific_layer(
                        &mut *tx,
                        layer_id,
                        input.quantity,
                        Some(LinkedOperation::Adjustment(adjustment_id)),
                    )
                    .await?
                } else {
                    costing::ensure_layers_exist(&mut *tx, &product).await?;
                    costing::consume_layers(
                        &mut *tx,
                        product.id,
                        input.quantity,
                        Some(LinkedOperation::Adjustment(adjustment_id)),
                    )
                    .await?
                };

                // Removal does not reprice the remaining stock
                product::write_back(&mut *tx, product.id, stock_after, None).await?;

                ledger::append(
                    &mut *tx,
                    tenant_id,
                    ledger::NewLedgerEntry {
                        product_id: Some(product.id),
                        entry_type: LedgerEntryType::StockOut,
                        category: LedgerCategory::Inventory,
                        quantity: Some(-input.quantity),
                        amount: Some(-outcome.total_cost),
                        reference: Some(reference),
                    },
                )
                .await?;

                consumption = Some(outcome);
            }
            AdjustmentKind::Set => {
                let outcome = costing::handle_set_adjustment(
                    &mut *tx,
                    &product,
                    stock_before,
                    stock_after,
                    input.unit_cost,
                    Some(adjustment_id),
                    Some(reference.clone()),
                )
                .await?;

                match outcome {
                    SetOutcome::Increased { layer } => {
                        let new_cost = costing::weighted_average_cost(&mut *tx, product.id).await?;
                        product::write_back(&mut *tx, product.id, stock_after, new_cost).await?;

                        let delta = stock_after - stock_before;
                        ledger::append(
                            &mut *tx,
                            tenant_id,
                            ledger::NewLedgerEntry {
                                product_id: Some(product.id),
                                entry_type: LedgerEntryType::Adjustment,
                                category: LedgerCategory::Inventory,
                                quantity: Some(delta),
                                amount: Some(delta * layer.unit_cost),
                                reference: Some(reference),
                            },
                        )
                        .await?;

                        created_layer = Some(layer);
                    }
                    SetOutcome::Decreased { outcome } => {
                        product::write_back(&mut *tx, product.id, stock_after, None).await?;

                        let delta = stock_after - stock_before;
                        ledger::append(
                            &mut *tx,
                            tenant_id,
                            ledger::NewLedgerEntry {
                                product_id: Some(product.id),
                                entry_type: LedgerEntryType::Adjustment,
                                category: LedgerCategory::Inventory,
                                quantity: Some(delta),
                                amount: Some(-outcome.total_cost),
                                reference: Some(reference),
                            },
                        )
                        .await?;

                        consumption = Some(outcome);
                    }
                    SetOutcome::Unchanged => {}
                }
            }
        }

        tx.commit().await?;

        tracing::info!(
            adjustment_id = %adjustment_id,
            product_id = %product.id,
            kind = %adjustment.kind,
            stock_before,
            stock_after,
            "inventory adjusted"
        );

        Ok(AdjustmentResult {
            adjustment,
            created_layer,
            consumption,
        })
    }

    /// List adjustments for a tenant, newest first
    pub async fn list(&self, tenant_id: Uuid) -> AppResult<Vec<Adjustment>> {
        let rows = sqlx::query_as::<_, AdjustmentRow>(
            r#"
            SELECT id, tenant_id, product_id, kind, quantity,
                   stock_before, stock_after, unit_cost, cost_layer_id, note,
                   created_by, created_at
            FROM adjustments
            WHERE tenant_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Adjustment::try_from).collect()
    }

    fn validate(&self, input: &CreateAdjustmentInput) -> AppResult<()> {
        let quantity_check = match input.kind {
            AdjustmentKind::Add | AdjustmentKind::Remove => {
                validation::validate_quantity(input.quantity)
            }
            AdjustmentKind::Set => validation::validate_stock_level(input.quantity),
        };
        if let Err(message) = quantity_check {
            return Err(AppError::Validation {
                field: "quantity".to_string(),
                message: message.to_string(),
            });
        }

        if let Some(cost) = input.unit_cost {
            if let Err(message) = validation::validate_unit_amount(cost) {
                return Err(AppError::Validation {
                    field: "unit_cost".to_string(),
                    message: message.to_string(),
                });
            }
        }

        if input.cost_layer_id.is_some() && input.kind != AdjustmentKind::Remove {
            return Err(AppError::Validation {
                field: "cost_layer_id".to_string(),
                message: "A specific layer can only be targeted by a remove adjustment"
                    .to_string(),
            });
        }

        Ok(())
    }

    async fn assert_layer_owner(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        cost_layer_id: Uuid,
        product_id: Uuid,
    ) -> AppResult<()> {
        let owner = sqlx::query_scalar::<_, Uuid>(
            "SELECT product_id FROM cost_layers WHERE id = $1",
        )
        .bind(cost_layer_id)
        .fetch_optional(&mut **tx)
        .await?;

        match owner {
            Some(id) if id == product_id => Ok(()),
            _ => Err(AppError::NotFound("Cost layer".to_string())),
        }
    }
}
