//! Balance ledger vocabulary
//!
//! The balance ledger is the append-only audit trail of stock and financial
//! events, distinct from the cost layers it summarizes.

use serde::{Deserialize, Serialize};

/// What kind of event a ledger entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEntryType {
    StockIn,
    StockOut,
    Sale,
    Expense,
    Adjustment,
}

impl LedgerEntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerEntryType::StockIn => "stock_in",
            LedgerEntryType::StockOut => "stock_out",
            LedgerEntryType::Sale => "sale",
            LedgerEntryType::Expense => "expense",
            LedgerEntryType::Adjustment => "adjustment",
        }
    }
}

impl std::str::FromStr for LedgerEntryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stock_in" => Ok(LedgerEntryType::StockIn),
            "stock_out" => Ok(LedgerEntryType::StockOut),
            "sale" => Ok(LedgerEntryType::Sale),
            "expense" => Ok(LedgerEntryType::Expense),
            "adjustment" => Ok(LedgerEntryType::Adjustment),
            other => Err(format!("unknown ledger entry type: {other}")),
        }
    }
}

/// Which running balance an entry moves.
///
/// Inventory entries carry a product and move its quantity/value balance;
/// financial entries are tenant-level money movements with no product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerCategory {
    Inventory,
    Financial,
}

impl LedgerCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerCategory::Inventory => "inventory",
            LedgerCategory::Financial => "financial",
        }
    }
}

impl std::str::FromStr for LedgerCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inventory" => Ok(LedgerCategory::Inventory),
            "financial" => Ok(LedgerCategory::Financial),
            other => Err(format!("unknown ledger category: {other}")),
        }
    }
}
