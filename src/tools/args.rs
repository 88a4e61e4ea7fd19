//! Tool Arguments - Typed Parameters for Each Tool
//!
//! Callers are loose about JSON types: chain ids arrive as `"137"` or
//! `137`, amounts as `"1.5"` or `1.5`. The deserializers here accept
//! both and keep amounts as text so no precision is lost to `f64`.

use rust_decimal::Decimal;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use crate::domain::chain::ChainId;

fn chain_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ChainId, D::Error> {
  match Value::deserialize(deserializer)? {
    Value::Number(n) => n
      .as_u64()
      .ok_or_else(|| de::Error::custom(format!("chain_id must be a positive integer, got {n}"))),
    Value::String(s) => s
      .trim()
      .parse()
      .map_err(|_| de::Error::custom(format!("chain_id must be a positive integer, got '{s}'"))),
    other => Err(de::Error::custom(format!("chain_id must be a number, got {other}"))),
  }
}

/// Number or string, kept verbatim as text.
fn numeric_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
  match Value::deserialize(deserializer)? {
    Value::Number(n) => Ok(n.to_string()),
    Value::String(s) => Ok(s),
    other => Err(de::Error::custom(format!("expected a number, got {other}"))),
  }
}

fn optional_numeric_text<'de, D: Deserializer<'de>>(
  deserializer: D,
) -> Result<Option<String>, D::Error> {
  match Option::<Value>::deserialize(deserializer)? {
    None | Some(Value::Null) => Ok(None),
    Some(Value::Number(n)) => Ok(Some(n.to_string())),
    Some(Value::String(s)) => Ok(Some(s)),
    Some(other) => Err(de::Error::custom(format!("expected a number, got {other}"))),
  }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoArgs {}

#[derive(Debug, Deserialize)]
pub struct ChainArgs {
  #[serde(deserialize_with = "chain_id")]
  pub chain_id: ChainId,
}

#[derive(Debug, Deserialize)]
pub struct BalanceArgs {
  #[serde(deserialize_with = "chain_id")]
  pub chain_id: ChainId,
  /// ERC-20 address, or absent / `"native"` for the native currency.
  #[serde(default)]
  pub token_address: Option<String>,
  /// Defaults to the signing account.
  #[serde(default)]
  pub wallet_address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddressArgs {
  pub address: String,
}

#[derive(Debug, Deserialize)]
pub struct BasketPriceArgs {
  #[serde(deserialize_with = "chain_id")]
  pub chain_id: ChainId,
  pub etf_token_address: String,
}

#[derive(Debug, Deserialize)]
pub struct BuyArgs {
  #[serde(deserialize_with = "chain_id")]
  pub chain_id: ChainId,
  pub input_token_address: String,
  pub output_token_address: String,
  /// Human units of the input token.
  #[serde(deserialize_with = "numeric_text")]
  pub input_amount: String,
  /// When true `input_amount` is already in smallest units.
  #[serde(default)]
  pub input_amount_is_raw: bool,
  #[serde(default)]
  pub slippage_percent: Option<Decimal>,
  /// Explicit minimum output in raw units; overrides slippage.
  #[serde(default, deserialize_with = "optional_numeric_text")]
  pub min_output_raw: Option<String>,
  #[serde(default)]
  pub recipient: Option<String>,
  /// Hex-encoded packed swap path ending at the stable-value token.
  #[serde(default)]
  pub path: Option<String>,
  /// Seconds from now until the trade deadline.
  #[serde(default)]
  pub deadline_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct SellArgs {
  #[serde(deserialize_with = "chain_id")]
  pub chain_id: ChainId,
  pub token_address: String,
  #[serde(deserialize_with = "numeric_text")]
  pub amount: String,
  #[serde(default)]
  pub amount_is_raw: bool,
  #[serde(default)]
  pub recipient: Option<String>,
  #[serde(default)]
  pub deadline_secs: Option<u64>,
}
