//! Inventory adjustment vocabulary

use serde::{Deserialize, Serialize};

/// How an inventory adjustment changes a product's stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    /// Add `quantity` units at a given (or fallback) unit cost.
    Add,
    /// Remove `quantity` units, FIFO unless a specific layer is targeted.
    Remove,
    /// Set stock to an absolute `quantity`; the delta decides add vs remove.
    Set,
}

impl AdjustmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentKind::Add => "add",
            AdjustmentKind::Remove => "remove",
            AdjustmentKind::Set => "set",
        }
    }
}

impl std::str::FromStr for AdjustmentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(AdjustmentKind::Add),
            "remove" => Ok(AdjustmentKind::Remove),
            "set" => Ok(AdjustmentKind::Set),
            other => Err(format!("unknown adjustment kind: {other}")),
        }
    }
}

impl std::fmt::Display for AdjustmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sentinel reference for layers synthesized by the legacy-stock backfill.
pub const MIGRATION_REFERENCE: &str = "MIGRATION";
