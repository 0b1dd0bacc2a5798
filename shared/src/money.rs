//! Money arithmetic in integer minor currency units
//!
//! All monetary amounts in the platform are integer minor units (e.g. cents,
//! satang) of a single per-tenant currency. Decimal parsing happens at the
//! HTTP boundary, never here.

/// A monetary amount in minor currency units.
pub type Money = i64;

/// Integer division rounded half away from zero.
///
/// This is the single rounding rule for all cost figures (weighted-average
/// costs, per-unit COGS). Both the FIFO planner and the valuation queries go
/// through here so reported costs never disagree by a unit.
pub fn div_round(numerator: i64, denominator: i64) -> i64 {
    debug_assert!(denominator != 0, "division by zero in money arithmetic");
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    if 2 * remainder.abs() >= denominator.abs() {
        quotient + numerator.signum() * denominator.signum()
    } else {
        quotient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_division_is_unchanged() {
        assert_eq!(div_round(100_000, 20), 5_000);
        assert_eq!(div_round(0, 7), 0);
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(div_round(5, 2), 3);
        assert_eq!(div_round(-5, 2), -3);
        assert_eq!(div_round(7, 2), 4);
    }

    #[test]
    fn rounds_below_half_down() {
        assert_eq!(div_round(10, 3), 3);
        assert_eq!(div_round(-10, 3), -3);
    }

    #[test]
    fn mixed_layer_cost_examples() {
        // 20 @ 5000 + 5 @ 6000 consumed as 25 units
        assert_eq!(div_round(130_000, 25), 5_200);
        // 20 @ 5000 + 30 @ 6000 on hand
        assert_eq!(div_round(20 * 5_000 + 30 * 6_000, 50), 5_600);
    }
}
