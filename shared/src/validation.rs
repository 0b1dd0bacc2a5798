//! Validation helpers shared by the stock-mutation surfaces

use crate::money::Money;

/// Validate a stock quantity that must be strictly positive.
pub fn validate_quantity(quantity: i64) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Quantity must be positive");
    }
    Ok(())
}

/// Validate a stock level that may be zero (e.g. the target of a "set"
/// adjustment after a count found an empty shelf).
pub fn validate_stock_level(quantity: i64) -> Result<(), &'static str> {
    if quantity < 0 {
        return Err("Stock level cannot be negative");
    }
    Ok(())
}

/// Validate a unit cost or price in minor currency units.
pub fn validate_unit_amount(amount: Money) -> Result<(), &'static str> {
    if amount < 0 {
        return Err("Amount cannot be negative");
    }
    Ok(())
}

/// Validate a SKU: non-empty, no surrounding whitespace.
pub fn validate_sku(sku: &str) -> Result<(), &'static str> {
    if sku.is_empty() {
        return Err("SKU cannot be empty");
    }
    if sku.trim() != sku {
        return Err("SKU cannot have leading or trailing whitespace");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_must_be_positive() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-5).is_err());
    }

    #[test]
    fn stock_level_allows_zero() {
        assert!(validate_stock_level(0).is_ok());
        assert!(validate_stock_level(-1).is_err());
    }

    #[test]
    fn unit_amount_allows_zero() {
        assert!(validate_unit_amount(0).is_ok());
        assert!(validate_unit_amount(-1).is_err());
    }

    #[test]
    fn sku_rules() {
        assert!(validate_sku("SKU-001").is_ok());
        assert!(validate_sku("").is_err());
        assert!(validate_sku(" SKU").is_err());
    }
}
