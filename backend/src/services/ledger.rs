//! Balance ledger service
//!
//! Append-only ledger of stock and financial events with running
//! quantity/value balances. One row per event, written in the same
//! transaction as the triggering mutation, never updated afterwards.
//!
//! Balance scoping: inventory entries run per (tenant, product); financial
//! entries run per tenant with no product. Appends within one scope must
//! serialize so each snapshot chains from the entry before it; `append`
//! takes an advisory lock on the scope because financial entries have no
//! row of their own to lock.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};
use std::str::FromStr;
use uuid::Uuid;

use shared::models::{LedgerCategory, LedgerEntryType};
use shared::money::Money;

use crate::error::{AppError, AppResult};

/// A ledger entry with its post-event balance snapshots
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub product_id: Option<Uuid>,
    pub entry_type: LedgerEntryType,
    pub category: LedgerCategory,
    pub quantity: Option<i64>,
    pub amount: Option<Money>,
    pub balance_qty: i64,
    pub balance_amount: Money,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Raw row; `entry_type`/`category` are stored as text
#[derive(Debug, FromRow)]
struct LedgerRow {
    id: Uuid,
    tenant_id: Uuid,
    product_id: Option<Uuid>,
    entry_type: String,
    category: String,
    quantity: Option<i64>,
    amount: Option<i64>,
    balance_qty: i64,
    balance_amount: i64,
    reference: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<LedgerRow> for LedgerEntry {
    type Error = AppError;

    fn try_from(row: LedgerRow) -> Result<Self, Self::Error> {
        let entry_type = LedgerEntryType::from_str(&row.entry_type)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!(e)))?;
        let category = LedgerCategory::from_str(&row.category)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!(e)))?;
        Ok(LedgerEntry {
            id: row.id,
            tenant_id: row.tenant_id,
            product_id: row.product_id,
            entry_type,
            category,
            quantity: row.quantity,
            amount: row.amount,
            balance_qty: row.balance_qty,
            balance_amount: row.balance_amount,
            reference: row.reference,
            created_at: row.created_at,
        })
    }
}

/// A ledger entry to append; balances are computed at write time
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub product_id: Option<Uuid>,
    pub entry_type: LedgerEntryType,
    pub category: LedgerCategory,
    pub quantity: Option<i64>,
    pub amount: Option<Money>,
    pub reference: Option<String>,
}

/// Append an entry inside the caller's transaction.
///
/// Reads the previous balance in the same scope (tenant + product, where
/// product may be NULL for financial entries) and writes the new running
/// snapshots alongside the event. The scope is locked until commit, so two
/// transactions appending to the same balance cannot both chain off the
/// same previous entry.
pub async fn append(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    entry: NewLedgerEntry,
) -> AppResult<LedgerEntry> {
    // Held to commit. Taken after any product row lock the caller holds,
    // keeping the crate-wide lock order uniform.
    sqlx::query(
        "SELECT pg_advisory_xact_lock(hashtextextended($1::text || '/' || COALESCE($2::text, '-'), 0))",
    )
    .bind(tenant_id)
    .bind(entry.product_id)
    .execute(&mut *conn)
    .await?;

    let previous = sqlx::query_as::<_, (i64, i64)>(
        r#"
        SELECT balance_qty, balance_amount
        FROM ledger_entries
        WHERE tenant_id = $1 AND product_id IS NOT DISTINCT FROM $2
        ORDER BY created_at DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(tenant_id)
    .bind(entry.product_id)
    .fetch_optional(&mut *conn)
    .await?;

    let (prev_qty, prev_amount) = previous.unwrap_or((0, 0));
    let balance_qty = prev_qty + entry.quantity.unwrap_or(0);
    let balance_amount = prev_amount + entry.amount.unwrap_or(0);

    let row = sqlx::query_as::<_, LedgerRow>(
        r#"
        INSERT INTO ledger_entries (
            tenant_id, product_id, entry_type, category,
            quantity, amount, balance_qty, balance_amount, reference
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id, tenant_id, product_id, entry_type, category,
                  quantity, amount, balance_qty, balance_amount, reference, created_at
        "#,
    )
    .bind(tenant_id)
    .bind(entry.product_id)
    .bind(entry.entry_type.as_str())
    .bind(entry.category.as_str())
    .bind(entry.quantity)
    .bind(entry.amount)
    .bind(balance_qty)
    .bind(balance_amount)
    .bind(&entry.reference)
    .fetch_one(&mut *conn)
    .await?;

    row.try_into()
}

/// Ledger service for the read surface
#[derive(Clone)]
pub struct LedgerService {
    db: PgPool,
}

impl LedgerService {
    /// Create a new LedgerService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List ledger entries for a tenant, newest first
    pub async fn list(&self, tenant_id: Uuid) -> AppResult<Vec<LedgerEntry>> {
        let rows = sqlx::query_as::<_, LedgerRow>(
            r#"
            SELECT id, tenant_id, product_id, entry_type, category,
                   quantity, amount, balance_qty, balance_amount, reference, created_at
            FROM ledger_entries
            WHERE tenant_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(LedgerEntry::try_from).collect()
    }

    /// List ledger entries for one product, newest first
    pub async fn list_for_product(
        &self,
        tenant_id: Uuid,
        product_id: Uuid,
    ) -> AppResult<Vec<LedgerEntry>> {
        let rows = sqlx::query_as::<_, LedgerRow>(
            r#"
            SELECT id, tenant_id, product_id, entry_type, category,
                   quantity, amount, balance_qty, balance_amount, reference, created_at
            FROM ledger_entries
            WHERE tenant_id = $1 AND product_id = $2
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(tenant_id)
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(LedgerEntry::try_from).collect()
    }
}
