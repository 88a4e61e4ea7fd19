//! API Response Types
//!
//! Wire types for the pricing API and the balance index. Numeric fields
//! arrive as JSON numbers or strings depending on the endpoint, so they
//! are read through `serde_json::Value` and parsed explicitly.

use std::str::FromStr;

use alloy::primitives::U256;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

/// `GET /etfapi/v1/customindexprice` body.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomIndexPrice {
  /// Price paid per basket token (USD).
  #[serde(default)]
  pub buy_price: Value,
  /// Price received per basket token (USD).
  #[serde(default)]
  pub sell_price: Value,
}

/// One entry of the balance index response.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexedBalanceEntry {
  /// Chain id, as number or string.
  pub chain_id: Value,
  /// Native balance in wei, as decimal string or number.
  pub native_balance: Value,
}

/// `GET /balances` body of the balance index.
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceIndexResponse {
  #[serde(default)]
  pub balances: Vec<IndexedBalanceEntry>,
}

/// Decimal from a JSON number or numeric string.
pub fn decimal_from_json(value: &Value) -> Option<Decimal> {
  match value {
    Value::String(s) => Decimal::from_str(s.trim())
      .or_else(|_| Decimal::from_scientific(s.trim()))
      .ok(),
    Value::Number(n) => {
      let text = n.to_string();
      Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
    }
    _ => None,
  }
}

/// `u64` from a JSON number or numeric string.
pub fn u64_from_json(value: &Value) -> Option<u64> {
  match value {
    Value::Number(n) => n.as_u64(),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  }
}

/// Raw integer amount from a JSON number, decimal string or `0x` hex string.
pub fn u256_from_json(value: &Value) -> Option<U256> {
  match value {
    Value::Number(n) => n.as_u64().map(U256::from),
    Value::String(s) => {
      let s = s.trim();
      match s.strip_prefix("0x") {
        Some(hex) => U256::from_str_radix(hex, 16).ok(),
        None => U256::from_str_radix(s, 10).ok(),
      }
    }
    _ => None,
  }
}
