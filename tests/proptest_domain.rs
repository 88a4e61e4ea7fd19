//! Property-Based Tests - Domain Layer Invariants
//!
//! Uses `proptest` to verify that amount parsing, slippage math, gas
//! margins, path encoding and address parsing hold across random inputs.

use alloy::primitives::{Address, U256};
use proptest::prelude::*;
use rust_decimal::Decimal;

use paloma_dex_agent::domain::amount::Amount;
use paloma_dex_agent::domain::path::SwapPath;
use paloma_dex_agent::domain::slippage::{convert_at_price, min_output, with_gas_margin};
use paloma_dex_agent::domain::token::parse_address;

// ── Amounts ─────────────────────────────────────────────────

proptest! {
    /// Displaying then re-parsing an amount gives back the same raw value.
    #[test]
    fn amount_display_parses_back(raw in any::<u128>(), decimals in 0u8..=30) {
        let amount = Amount::from_raw(U256::from(raw), decimals);
        let parsed = Amount::parse_units(&amount.display(), decimals).unwrap();
        prop_assert_eq!(parsed.raw(), amount.raw());
    }

    /// More fractional digits than the token has is an error, never a
    /// silent truncation.
    #[test]
    fn excess_precision_is_rejected(whole in 0u64..1_000_000, decimals in 0u8..=8) {
        let text = format!("{whole}.{}1", "0".repeat(usize::from(decimals)));
        prop_assert!(Amount::parse_units(&text, decimals).is_err());
    }
}

// ── Slippage ────────────────────────────────────────────────

proptest! {
    /// The minimum never exceeds the quote and zero slippage keeps it whole.
    #[test]
    fn min_output_is_bounded_by_quote(quoted in any::<u128>(), bps in 0u32..10_000) {
        let quoted = U256::from(quoted);
        let slippage = Decimal::new(i64::from(bps), 2);
        let min = min_output(quoted, slippage).unwrap();
        prop_assert!(min <= quoted);
        prop_assert_eq!(min_output(quoted, Decimal::ZERO).unwrap(), quoted);
    }

    /// More slippage never raises the minimum.
    #[test]
    fn min_output_is_monotonic(quoted in any::<u64>(), a in 0u32..9_999, b in 0u32..9_999) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let quoted = U256::from(quoted);
        let loose = min_output(quoted, Decimal::new(i64::from(hi), 2)).unwrap();
        let tight = min_output(quoted, Decimal::new(i64::from(lo), 2)).unwrap();
        prop_assert!(loose <= tight);
    }

    /// Converting at a price of one between equal decimals is the identity.
    #[test]
    fn conversion_at_par(amount in any::<u64>(), decimals in 0u8..=18) {
        let amount = U256::from(amount);
        prop_assert_eq!(convert_at_price(amount, decimals, decimals, Decimal::ONE), Some(amount));
    }
}

// ── Gas ─────────────────────────────────────────────────────

proptest! {
    /// The margin is exactly a third on top, rounded down, without overflow.
    #[test]
    fn gas_margin_is_four_thirds(raw in any::<u64>()) {
        let padded = with_gas_margin(raw);
        prop_assert!(padded >= raw);
        if raw <= u64::MAX / 4 * 3 {
            prop_assert_eq!(padded, raw + raw / 3);
        }
    }
}

// ── Paths and addresses ─────────────────────────────────────

proptest! {
    /// Packed paths decode to the tokens and fees they were built from.
    #[test]
    fn path_encoding_is_lossless(
        tokens in prop::collection::vec(any::<[u8; 20]>(), 2..5),
        fee in prop::sample::select(vec![100u32, 500, 3_000, 10_000]),
    ) {
        let tokens: Vec<Address> = tokens.into_iter().map(Address::from).collect();
        let fees = vec![fee; tokens.len() - 1];
        let path = SwapPath::new(tokens.clone(), fees.clone()).unwrap();
        let decoded = SwapPath::decode(&path.encode()).unwrap();
        prop_assert_eq!(decoded.tokens(), tokens.as_slice());
        prop_assert_eq!(decoded.fees(), fees.as_slice());
    }

    /// Lower-case, upper-case and checksummed spellings are one address.
    #[test]
    fn address_parsing_ignores_case(bytes in any::<[u8; 20]>()) {
        let address = Address::from(bytes);
        let lower = format!("0x{}", alloy::hex::encode(bytes));
        let upper = format!("0x{}", lower[2..].to_uppercase());
        prop_assert_eq!(parse_address(&lower).unwrap(), address);
        prop_assert_eq!(parse_address(&upper).unwrap(), address);
        prop_assert_eq!(parse_address(&address.to_checksum(None)).unwrap(), address);
    }
}
