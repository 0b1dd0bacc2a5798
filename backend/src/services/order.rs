//! Order placement service
//!
//! The order orchestrator is one of the three business-transaction
//! boundaries around the costing engine. For every line it locks the
//! product, backfills legacy layers if needed, consumes FIFO, records the
//! weighted-average unit cost on the line, and decrements stock. The order's
//! COGS total and revenue land in the financial ledger; each line's stock
//! movement lands in the inventory ledger. All in a single transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::models::{LedgerCategory, LedgerEntryType};
use shared::money::Money;
use shared::validation;

use crate::error::{AppError, AppResult};
use crate::services::costing::{self, LinkedOperation};
use crate::services::{ledger, product};

/// Order service for placement and reads
#[derive(Clone)]
pub struct OrderService {
    db: PgPool,
}

/// A placed order with its monetary totals
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub created_by: Uuid,
    pub total_amount: Money,
    pub total_cost: Money,
    pub created_at: DateTime<Utc>,
}

/// One order line. `unit_cost` is the weighted-average cost of the layers
/// the line consumed, fixed at placement time.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i64,
    pub unit_price: Money,
    pub unit_cost: Money,
    pub created_at: DateTime<Utc>,
}

/// Input for placing an order
#[derive(Debug, Deserialize)]
pub struct CreateOrderInput {
    pub lines: Vec<OrderLineInput>,
}

#[derive(Debug, Deserialize)]
pub struct OrderLineInput {
    pub product_id: Uuid,
    pub quantity: i64,
}

/// An order together with its lines
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl OrderService {
    /// Create a new OrderService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Place an order: consume stock FIFO for every line, atomically
    pub async fn place_order(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        input: CreateOrderInput,
    ) -> AppResult<OrderWithItems> {
        if input.lines.is_empty() {
            return Err(AppError::Validation {
                field: "lines".to_string(),
                message: "Order must have at least one line".to_string(),
            });
        }
        for line in &input.lines {
            if let Err(message) = validation::validate_quantity(line.quantity) {
                return Err(AppError::Validation {
                    field: "quantity".to_string(),
                    message: message.to_string(),
                });
            }
        }

        let mut tx = self.db.begin().await?;

        let order = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (tenant_id, created_by)
            VALUES ($1, $2)
            RETURNING id, tenant_id, created_by, total_amount, total_cost, created_at
            "#,
        )
        .bind(tenant_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(input.lines.len());
        let mut total_amount: Money = 0;
        let mut total_cost: Money = 0;

        for line in &input.lines {
            // Product lock first, then layers
            let product = product::lock_for_update(&mut *tx, tenant_id, line.product_id).await?;
            costing::ensure_layers_exist(&mut *tx, &product).await?;

            let item_id = Uuid::new_v4();
            let outcome = costing::consume_layers(
                &mut *tx,
                product.id,
                line.quantity,
                Some(LinkedOperation::OrderItem(item_id)),
            )
            .await?;

            let item = sqlx::query_as::<_, OrderItem>(
                r#"
                INSERT INTO order_items (id, order_id, product_id, quantity, unit_price, unit_cost)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id, order_id, product_id, quantity, unit_price, unit_cost, created_at
                "#,
            )
            .bind(item_id)
            .bind(order.id)
            .bind(product.id)
            .bind(line.quantity)
            .bind(product.price)
            .bind(outcome.weighted_average_cost)
            .fetch_one(&mut *tx)
            .await?;

            product::write_back(&mut *tx, product.id, product.stock - line.quantity, None).await?;

            ledger::append(
                &mut *tx,
                tenant_id,
                ledger::NewLedgerEntry {
                    product_id: Some(product.id),
                    entry_type: LedgerEntryType::Sale,
                    category: LedgerCategory::Inventory,
                    quantity: Some(-line.quantity),
                    amount: Some(-outcome.total_cost),
                    reference: Some(format!("ORDER-{}", order.id)),
                },
            )
            .await?;

            total_amount += line.quantity * product.price;
            total_cost += outcome.total_cost;
            items.push(item);
        }

        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders
            SET total_amount = $1, total_cost = $2
            WHERE id = $3
            RETURNING id, tenant_id, created_by, total_amount, total_cost, created_at
            "#,
        )
        .bind(total_amount)
        .bind(total_cost)
        .bind(order.id)
        .fetch_one(&mut *tx)
        .await?;

        // Tenant-level money movements: revenue in, COGS out
        ledger::append(
            &mut *tx,
            tenant_id,
            ledger::NewLedgerEntry {
                product_id: None,
                entry_type: LedgerEntryType::Sale,
                category: LedgerCategory::Financial,
                quantity: None,
                amount: Some(total_amount),
                reference: Some(format!("ORDER-{}", order.id)),
            },
        )
        .await?;
        ledger::append(
            &mut *tx,
            tenant_id,
            ledger::NewLedgerEntry {
                product_id: None,
                entry_type: LedgerEntryType::Expense,
                category: LedgerCategory::Financial,
                quantity: None,
                amount: Some(-total_cost),
                reference: Some(format!("ORDER-{}-COGS", order.id)),
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            order_id = %order.id,
            lines = items.len(),
            total_amount,
            total_cost,
            "order placed"
        );

        Ok(OrderWithItems { order, items })
    }

    /// Get an order with its lines
    pub async fn get(&self, tenant_id: Uuid, order_id: Uuid) -> AppResult<OrderWithItems> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, tenant_id, created_by, total_amount, total_cost, created_at
            FROM orders
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(order_id)
        .bind(tenant_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT id, order_id, product_id, quantity, unit_price, unit_cost, created_at
            FROM order_items
            WHERE order_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.db)
        .await?;

        Ok(OrderWithItems { order, items })
    }

    /// List orders for a tenant, newest first
    pub async fn list(&self, tenant_id: Uuid) -> AppResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, tenant_id, created_by, total_amount, total_cost, created_at
            FROM orders
            WHERE tenant_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.db)
        .await?;

        Ok(orders)
    }
}
