//! Exact conversion between display amounts and on-chain base units.
//!
//! Amounts stay in fixed-point [`Decimal`] until the final multiplication
//! into [`U256`]; no floating-point value is ever involved.

use alloy_primitives::U256;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnitsError {
    #[error("amount must not be negative: {0}")]
    Negative(Decimal),

    #[error("amount {amount} has more than {decimals} fractional digits")]
    TooPrecise { amount: Decimal, decimals: u32 },

    #[error("amount {0} does not fit into 256 bits at the configured exponent")]
    Overflow(Decimal),
}

/// Scale a display amount by `10^decimals` into an integer number of base
/// units.
///
/// Fails instead of rounding when the amount carries more fractional
/// digits than the asset supports.
pub fn to_base_units(amount: Decimal, decimals: u32) -> Result<U256, UnitsError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(UnitsError::Negative(amount));
    }

    // Trailing zeros ("100.00") must not count against the exponent.
    let normalized = amount.normalize();
    let scale = normalized.scale();
    if scale > decimals {
        return Err(UnitsError::TooPrecise { amount, decimals });
    }

    let mantissa = U256::from(normalized.mantissa().unsigned_abs());
    let factor = U256::from(10u64)
        .checked_pow(U256::from(decimals - scale))
        .ok_or(UnitsError::Overflow(amount))?;

    mantissa
        .checked_mul(factor)
        .ok_or(UnitsError::Overflow(amount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_scaling_is_exact() {
        assert_eq!(to_base_units(dec("12.34"), 2).unwrap(), U256::from(1234u64));
        assert_eq!(
            to_base_units(dec("1.5"), 18).unwrap(),
            U256::from(1_500_000_000_000_000_000u128)
        );
        assert_eq!(
            to_base_units(dec("100.00"), 18).unwrap(),
            U256::from(100_000_000_000_000_000_000u128)
        );
        // 0.1 + 0.2 style values that floats get wrong
        assert_eq!(
            to_base_units(dec("0.3"), 18).unwrap(),
            U256::from(300_000_000_000_000_000u128)
        );
        assert_eq!(to_base_units(dec("7"), 0).unwrap(), U256::from(7u64));
        assert_eq!(to_base_units(Decimal::ZERO, 18).unwrap(), U256::ZERO);
    }

    #[test]
    fn test_trailing_zeros_do_not_count_as_precision() {
        assert_eq!(to_base_units(dec("12.3400"), 2).unwrap(), U256::from(1234u64));
    }

    #[test]
    fn test_rejects_excess_precision() {
        assert_eq!(
            to_base_units(dec("0.001"), 2),
            Err(UnitsError::TooPrecise {
                amount: dec("0.001"),
                decimals: 2
            })
        );
    }

    #[test]
    fn test_rejects_negative() {
        assert!(matches!(
            to_base_units(dec("-1.00"), 18),
            Err(UnitsError::Negative(_))
        ));
    }

    #[test]
    fn test_large_exponent_uses_full_width() {
        let max = Decimal::MAX;
        let scaled = to_base_units(max, 40).unwrap();
        assert!(scaled > U256::from(u128::MAX));
        assert!(matches!(
            to_base_units(max, 60),
            Err(UnitsError::Overflow(_))
        ));
    }
}
