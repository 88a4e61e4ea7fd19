//! Slippage, Price Conversion and Gas Margin Arithmetic
//!
//! Integer-only helpers shared by the resolver, the gas estimator and
//! the orchestrator. Results always round toward the safer side:
//! minimum outputs round down, never up.

use alloy::primitives::U256;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use thiserror::Error;

use super::amount::pow10;

/// Slippage precision: one part per million of the quoted amount.
const PPM: u64 = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlippageError {
    #[error("slippage {0}% is outside [0, 100)")]
    OutOfRange(Decimal),
}

/// Validate a slippage percentage.
pub fn validate_slippage(percent: Decimal) -> Result<(), SlippageError> {
    if percent.is_sign_negative() || percent >= dec!(100) {
        return Err(SlippageError::OutOfRange(percent));
    }
    Ok(())
}

/// Slippage percentage as parts-per-million, truncated so the
/// tolerance never grows through rounding.
fn slippage_ppm(percent: Decimal) -> Result<u64, SlippageError> {
    validate_slippage(percent)?;
    (percent * dec!(10000))
        .trunc()
        .to_u64()
        .ok_or(SlippageError::OutOfRange(percent))
}

/// Minimum acceptable output: `quoted × (1 − slippage)`, rounded down.
pub fn min_output(quoted: U256, slippage_percent: Decimal) -> Result<U256, SlippageError> {
    let ppm = slippage_ppm(slippage_percent)?;
    let keep = U256::from(PPM - ppm);
    let scale = U256::from(PPM);
    // Split to avoid overflowing U256 when `quoted` is near the top.
    let whole = (quoted / scale) * keep;
    let rest = (quoted % scale) * keep / scale;
    Ok(whole + rest)
}

/// Convert a raw amount of one token into raw units of another at
/// `price` (units of the first token per whole second token), rounded
/// down. `None` on a non-positive price or overflow.
pub fn convert_at_price(
    amount: U256,
    from_decimals: u8,
    to_decimals: u8,
    price: Decimal,
) -> Option<U256> {
    if price <= Decimal::ZERO {
        return None;
    }
    // price = mantissa / 10^scale
    let mantissa = U256::from(u128::try_from(price.mantissa()).ok()?);
    let scale = u8::try_from(price.scale()).ok()?;

    let numerator = amount
        .checked_mul(pow10(to_decimals))?
        .checked_mul(pow10(scale))?;
    let denominator = mantissa.checked_mul(pow10(from_decimals))?;
    Some(numerator / denominator)
}

/// Safety margin applied to every raw gas estimate: exactly `raw × 4/3`
/// rounded down. Saturates only above three quarters of `u64::MAX`.
pub const fn with_gas_margin(raw: u64) -> u64 {
    raw.saturating_add(raw / 3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_percent_of_ninety_nine_million() {
        let min = min_output(U256::from(99_000_000u64), dec!(2)).unwrap();
        assert_eq!(min, U256::from(97_020_000u64));
    }

    #[test]
    fn test_zero_slippage_keeps_quote() {
        let q = U256::from(123_456_789u64);
        assert_eq!(min_output(q, Decimal::ZERO).unwrap(), q);
    }

    #[test]
    fn test_fractional_slippage_rounds_down() {
        // 0.5% of 1001 = 5.005 → keep 995.995 → 995
        let min = min_output(U256::from(1001u64), dec!(0.5)).unwrap();
        assert_eq!(min, U256::from(995u64));
    }

    #[test]
    fn test_slippage_out_of_range() {
        assert!(min_output(U256::from(1u64), dec!(100)).is_err());
        assert!(min_output(U256::from(1u64), dec!(-0.1)).is_err());
    }

    #[test]
    fn test_min_output_near_max_does_not_overflow() {
        let min = min_output(U256::MAX, dec!(1)).unwrap();
        assert!(min < U256::MAX);
    }

    #[test]
    fn test_convert_at_price() {
        // 99 USD (6 decimals) at 1.65 USD per basket token (18 decimals) = 60 tokens.
        let out = convert_at_price(U256::from(99_000_000u64), 6, 18, dec!(1.65)).unwrap();
        assert_eq!(out, U256::from(60u64) * pow10(18));
        assert!(convert_at_price(U256::from(1u64), 6, 18, Decimal::ZERO).is_none());
    }

    #[test]
    fn test_convert_rounds_down() {
        // 10 units at price 3 → 3.33.. → 3
        let out = convert_at_price(U256::from(10u64), 0, 0, dec!(3)).unwrap();
        assert_eq!(out, U256::from(3u64));
    }

    #[test]
    fn test_gas_margin_exact() {
        assert_eq!(with_gas_margin(0), 0);
        assert_eq!(with_gas_margin(1), 1);
        assert_eq!(with_gas_margin(3), 4);
        assert_eq!(with_gas_margin(21_000), 28_000);
        assert_eq!(with_gas_margin(100_000), 133_333);
        assert_eq!(with_gas_margin(u64::MAX), u64::MAX);
    }
}
