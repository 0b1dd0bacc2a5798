//! Product aggregate service
//!
//! Products own the current `stock` and weighted-average `cost` fields that
//! the stock-mutation orchestrators write back after the costing engine
//! returns. Products are archived, never hard-deleted, so cost layers and
//! consumptions outlive them for audit purposes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use shared::models::{LedgerCategory, LedgerEntryType};
use shared::money::Money;
use shared::validation;

use crate::error::{AppError, AppResult};
use crate::services::{costing, ledger};

/// Product service for catalog reads and lifecycle mutations
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

/// A sellable product, tenant-scoped
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub sku: String,
    pub name: String,
    pub price: Money,
    pub cost: Option<Money>,
    pub stock: i64,
    pub archived_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Unit cost to assume when no cost layer can answer: the last known
    /// weighted-average cost, else the sale price.
    pub fn fallback_unit_cost(&self) -> Money {
        self.cost.unwrap_or(self.price)
    }
}

/// Input for creating a product
#[derive(Debug, Deserialize)]
pub struct CreateProductInput {
    pub sku: String,
    pub name: String,
    pub price: Money,
    pub cost: Option<Money>,
    /// Opening stock. When positive, an initial cost layer is created in the
    /// same transaction so the product never needs the legacy backfill.
    pub initial_stock: Option<i64>,
}

/// Lock a product row for the remainder of the enclosing transaction.
///
/// Every stock mutation takes this lock before touching cost layers; the
/// product-then-layers order is the deadlock-avoidance convention for the
/// whole crate.
pub(crate) async fn lock_for_update(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    product_id: Uuid,
) -> AppResult<Product> {
    let product = sqlx::query_as::<_, Product>(
        r#"
        SELECT id, tenant_id, sku, name, price, cost, stock, archived_at, created_at, updated_at
        FROM products
        WHERE id = $1 AND tenant_id = $2
        FOR UPDATE
        "#,
    )
    .bind(product_id)
    .bind(tenant_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

    if product.archived_at.is_some() {
        return Err(AppError::ProductArchived(product.id));
    }

    Ok(product)
}

/// Write back the post-mutation stock level and, when recomputed, the
/// weighted-average cost. `cost: None` leaves the stored cost untouched.
pub(crate) async fn write_back(
    conn: &mut PgConnection,
    product_id: Uuid,
    stock: i64,
    cost: Option<Money>,
) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE products
        SET stock = $1, cost = COALESCE($2, cost), updated_at = now()
        WHERE id = $3
        "#,
    )
    .bind(stock)
    .bind(cost)
    .bind(product_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

impl ProductService {
    /// Create a new ProductService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a product, with an optional opening cost layer
    pub async fn create(&self, tenant_id: Uuid, input: CreateProductInput) -> AppResult<Product> {
        if let Err(message) = validation::validate_sku(&input.sku) {
            return Err(AppError::Validation {
                field: "sku".to_string(),
                message: message.to_string(),
            });
        }
        if let Err(message) = validation::validate_unit_amount(input.price) {
            return Err(AppError::Validation {
                field: "price".to_string(),
                message: message.to_string(),
            });
        }
        if let Some(cost) = input.cost {
            if let Err(message) = validation::validate_unit_amount(cost) {
                return Err(AppError::Validation {
                    field: "cost".to_string(),
                    message: message.to_string(),
                });
            }
        }
        let initial_stock = input.initial_stock.unwrap_or(0);
        if initial_stock < 0 {
            return Err(AppError::Validation {
                field: "initial_stock".to_string(),
                message: "Opening stock cannot be negative".to_string(),
            });
        }

        let sku_taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM products WHERE tenant_id = $1 AND sku = $2)",
        )
        .bind(tenant_id)
        .bind(&input.sku)
        .fetch_one(&self.db)
        .await?;

        if sku_taken {
            return Err(AppError::DuplicateEntry("sku".to_string()));
        }

        let mut tx = self.db.begin().await?;

        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (tenant_id, sku, name, price, cost, stock)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, tenant_id, sku, name, price, cost, stock, archived_at, created_at, updated_at
            "#,
        )
        .bind(tenant_id)
        .bind(&input.sku)
        .bind(&input.name)
        .bind(input.price)
        .bind(input.cost)
        .bind(initial_stock)
        .fetch_one(&mut *tx)
        .await?;

        if initial_stock > 0 {
            let reference = format!("INIT-{}", product.sku);
            costing::create_layer(
                &mut *tx,
                costing::CreateLayerArgs {
                    product_id: product.id,
                    tenant_id,
                    quantity: initial_stock,
                    unit_cost: product.fallback_unit_cost(),
                    source_adjustment_id: None,
                    reference: Some(reference.clone()),
                    acquired_at: None,
                },
            )
            .await?;

            ledger::append(
                &mut *tx,
                tenant_id,
                ledger::NewLedgerEntry {
                    product_id: Some(product.id),
                    entry_type: LedgerEntryType::StockIn,
                    category: LedgerCategory::Inventory,
                    quantity: Some(initial_stock),
                    amount: Some(initial_stock * product.fallback_unit_cost()),
                    reference: Some(reference),
                },
            )
            .await?;
        }

        tx.commit().await?;

        Ok(product)
    }

    /// Get a product by ID
    pub async fn get(&self, tenant_id: Uuid, product_id: Uuid) -> AppResult<Product> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, tenant_id, sku, name, price, cost, stock, archived_at, created_at, updated_at
            FROM products
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(product_id)
        .bind(tenant_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        Ok(product)
    }

    /// List products for a tenant, active first
    pub async fn list(&self, tenant_id: Uuid) -> AppResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, tenant_id, sku, name, price, cost, stock, archived_at, created_at, updated_at
            FROM products
            WHERE tenant_id = $1
            ORDER BY (archived_at IS NOT NULL), created_at DESC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.db)
        .await?;

        Ok(products)
    }

    /// Archive a product. Cost layers and consumptions are retained.
    pub async fn archive(&self, tenant_id: Uuid, product_id: Uuid) -> AppResult<Product> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET archived_at = COALESCE(archived_at, now()), updated_at = now()
            WHERE id = $1 AND tenant_id = $2
            RETURNING id, tenant_id, sku, name, price, cost, stock, archived_at, created_at, updated_at
            "#,
        )
        .bind(product_id)
        .bind(tenant_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        Ok(product)
    }
}
