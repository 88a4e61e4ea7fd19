//! Token Amounts - Raw Integer Units with Exact Display
//!
//! Every on-chain quantity is carried as a raw `U256` in the token's
//! smallest unit together with its decimals. Display strings are
//! derived by exact integer division; no floating point is involved
//! anywhere, so raw → display → raw is lossless.

use std::fmt;

use alloy::primitives::U256;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Largest decimals value accepted (10^77 is the largest power of ten in U256).
pub const MAX_DECIMALS: u8 = 77;

/// Errors produced when parsing a human-readable amount.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("amount must be greater than zero")]
    NotPositive,
    #[error("'{0}' is not a decimal number")]
    Malformed(String),
    #[error("amount has {got} fractional digits but the token only has {decimals}")]
    TooPrecise { got: usize, decimals: u8 },
    #[error("amount does not fit in 256 bits")]
    Overflow,
    #[error("unsupported token decimals: {0}")]
    UnsupportedDecimals(u8),
}

/// A token quantity in raw smallest units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Amount {
    raw: U256,
    decimals: u8,
}

/// `10^decimals` as a `U256`.
pub fn pow10(decimals: u8) -> U256 {
    U256::from(10u64).pow(U256::from(decimals))
}

impl Amount {
    /// Wrap a raw value.
    pub const fn from_raw(raw: U256, decimals: u8) -> Self {
        Self { raw, decimals }
    }

    /// Zero in the given decimals.
    pub const fn zero(decimals: u8) -> Self {
        Self {
            raw: U256::ZERO,
            decimals,
        }
    }

    /// Parse a human-readable decimal string ("1.5", "0.000001", "42").
    ///
    /// Rejects signs, exponents and more fractional digits than the
    /// token supports; the result is always an exact raw value.
    pub fn parse_units(input: &str, decimals: u8) -> Result<Self, AmountError> {
        if decimals > MAX_DECIMALS {
            return Err(AmountError::UnsupportedDecimals(decimals));
        }
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(AmountError::Empty);
        }

        let (whole, frac) = match trimmed.split_once('.') {
            Some((w, f)) => (w, f),
            None => (trimmed, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(AmountError::Malformed(trimmed.to_string()));
        }
        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(whole) || !all_digits(frac) {
            return Err(AmountError::Malformed(trimmed.to_string()));
        }

        // Trailing zeros never change the value.
        let frac = frac.trim_end_matches('0');
        if frac.len() > usize::from(decimals) {
            return Err(AmountError::TooPrecise {
                got: frac.len(),
                decimals,
            });
        }

        let parse_digits = |s: &str| -> Result<U256, AmountError> {
            if s.is_empty() {
                return Ok(U256::ZERO);
            }
            U256::from_str_radix(s, 10).map_err(|_| AmountError::Overflow)
        };

        let whole_raw = parse_digits(whole)?
            .checked_mul(pow10(decimals))
            .ok_or(AmountError::Overflow)?;
        // `frac` has at most `decimals` digits, so the shift is non-negative.
        let frac_scale = pow10(decimals - u8::try_from(frac.len()).map_err(|_| AmountError::Overflow)?);
        let frac_raw = parse_digits(frac)?
            .checked_mul(frac_scale)
            .ok_or(AmountError::Overflow)?;
        let raw = whole_raw
            .checked_add(frac_raw)
            .ok_or(AmountError::Overflow)?;

        Ok(Self { raw, decimals })
    }

    /// Same as [`Amount::parse_units`] but rejects zero.
    pub fn parse_positive_units(input: &str, decimals: u8) -> Result<Self, AmountError> {
        let amount = Self::parse_units(input, decimals)?;
        if amount.is_zero() {
            return Err(AmountError::NotPositive);
        }
        Ok(amount)
    }

    /// Raw value in smallest units.
    pub const fn raw(&self) -> U256 {
        self.raw
    }

    /// Token decimals.
    pub const fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn is_zero(&self) -> bool {
        self.raw.is_zero()
    }

    /// Exact human-readable rendering, trailing fractional zeros trimmed.
    pub fn display(&self) -> String {
        if self.decimals == 0 {
            return self.raw.to_string();
        }
        let scale = pow10(self.decimals);
        let whole = self.raw / scale;
        let frac = self.raw % scale;
        if frac.is_zero() {
            return whole.to_string();
        }
        let frac_digits = format!(
            "{:0>width$}",
            frac.to_string(),
            width = usize::from(self.decimals)
        );
        format!("{whole}.{}", frac_digits.trim_end_matches('0'))
    }

    /// Lossy conversion for prices and logs. `None` when the value
    /// exceeds `Decimal`'s 96-bit mantissa.
    pub fn to_decimal(&self) -> Option<Decimal> {
        if self.decimals > 28 {
            let scaled = self.raw / pow10(self.decimals - 28);
            let scaled = i128::try_from(scaled).ok()?;
            return Decimal::try_from_i128_with_scale(scaled, 28).ok();
        }
        let raw = i128::try_from(self.raw).ok()?;
        Decimal::try_from_i128_with_scale(raw, u32::from(self.decimals)).ok()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("Amount", 3)?;
        state.serialize_field("raw", &self.raw.to_string())?;
        state.serialize_field("display", &self.display())?;
        state.serialize_field("decimals", &self.decimals)?;
        state.end()
    }
}

/// Serialize a raw `U256` as a base-10 string.
pub fn serialize_raw<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

/// Serialize an optional raw `U256` as a base-10 string or null.
#[allow(clippy::ref_option)]
pub fn serialize_raw_opt<S: Serializer>(
    value: &Option<U256>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => serializer.serialize_some(&v.to_string()),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_trims_trailing_zeros() {
        let a = Amount::from_raw(U256::from(1_500_000u64), 6);
        assert_eq!(a.display(), "1.5");
    }

    #[test]
    fn test_display_small_fraction() {
        let a = Amount::from_raw(U256::from(1u64), 18);
        assert_eq!(a.display(), "0.000000000000000001");
    }

    #[test]
    fn test_display_whole_and_zero_decimals() {
        assert_eq!(Amount::from_raw(U256::from(42_000_000u64), 6).display(), "42");
        assert_eq!(Amount::from_raw(U256::from(7u64), 0).display(), "7");
        assert_eq!(Amount::zero(18).display(), "0");
    }

    #[test]
    fn test_parse_units_exact() {
        let a = Amount::parse_units("1.5", 18).unwrap();
        assert_eq!(a.raw(), U256::from(1_500_000_000_000_000_000u128));
        let b = Amount::parse_units(".25", 2).unwrap();
        assert_eq!(b.raw(), U256::from(25u64));
        let c = Amount::parse_units("3.", 6).unwrap();
        assert_eq!(c.raw(), U256::from(3_000_000u64));
    }

    #[test]
    fn test_parse_trailing_zeros_beyond_precision_ok() {
        let a = Amount::parse_units("1.500000000", 6).unwrap();
        assert_eq!(a.raw(), U256::from(1_500_000u64));
    }

    #[test]
    fn test_parse_rejects_too_precise() {
        let err = Amount::parse_units("0.0000001", 6).unwrap_err();
        assert_eq!(err, AmountError::TooPrecise { got: 7, decimals: 6 });
    }

    #[test]
    fn test_parse_rejects_negative_and_garbage() {
        assert!(matches!(Amount::parse_units("-1", 6), Err(AmountError::Malformed(_))));
        assert!(matches!(Amount::parse_units("1e5", 6), Err(AmountError::Malformed(_))));
        assert!(matches!(Amount::parse_units(".", 6), Err(AmountError::Malformed(_))));
        assert_eq!(Amount::parse_units("  ", 6), Err(AmountError::Empty));
    }

    #[test]
    fn test_parse_positive_rejects_zero() {
        assert_eq!(
            Amount::parse_positive_units("0.000", 6),
            Err(AmountError::NotPositive)
        );
    }

    #[test]
    fn test_to_decimal() {
        let a = Amount::from_raw(U256::from(1_250_000u64), 6);
        assert_eq!(a.to_decimal().unwrap().to_string(), "1.250000");
    }

    #[test]
    fn test_serialize_shape() {
        let a = Amount::from_raw(U256::from(2_000_000u64), 6);
        let json = serde_json::to_value(a).unwrap();
        assert_eq!(json["raw"], "2000000");
        assert_eq!(json["display"], "2");
        assert_eq!(json["decimals"], 6);
    }
}
