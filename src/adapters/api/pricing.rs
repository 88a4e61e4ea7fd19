//! Paloma DEX Pricing API - `PricingService` over HTTP
//!
//! Basket-token prices come from `/etfapi/v1/customindexprice` and the
//! basket catalogue from `/etfapi/v1/etf`, both keyed by the chain's
//! API name rather than its numeric id.

use alloy::primitives::Address;
use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, instrument};

use crate::domain::chain::ChainConfig;
use crate::ports::pricing::{BasketPrice, PricingError, PricingService};

use super::client::{ApiClient, ApiError};
use super::types::{CustomIndexPrice, decimal_from_json};

/// HTTP adapter for the protocol pricing API.
pub struct PalomaPricingApi {
  client: ApiClient,
}

impl PalomaPricingApi {
  pub fn new(client: ApiClient) -> Self {
    Self { client }
  }

  fn price_path(chain: &ChainConfig, token: Address) -> String {
    format!(
      "/etfapi/v1/customindexprice?chain_id={}&token_evm_address={token}",
      chain.api_name
    )
  }

  fn catalogue_path(chain: &ChainConfig) -> String {
    format!("/etfapi/v1/etf?chain_id={}", chain.api_name)
  }
}

fn map_error(err: ApiError, token: Option<Address>) -> PricingError {
  match (err, token) {
    (ApiError::Status { status, .. }, Some(token)) if status == StatusCode::NOT_FOUND => {
      PricingError::NotFound(token)
    }
    (ApiError::Decode(e), _) => PricingError::Malformed(e),
    (other, _) => PricingError::Unavailable(other.to_string()),
  }
}

/// Interpret a price body.
pub fn parse_price(body: &CustomIndexPrice, token: Address) -> Result<BasketPrice, PricingError> {
  let buy_price = decimal_from_json(&body.buy_price).ok_or(PricingError::NotFound(token))?;
  let sell_price = decimal_from_json(&body.sell_price)
    .ok_or_else(|| PricingError::Malformed(format!("sell_price missing for {token}")))?;
  Ok(BasketPrice {
    buy_price,
    sell_price,
  })
}

#[async_trait]
impl PricingService for PalomaPricingApi {
  #[instrument(skip(self, chain), fields(chain = %chain.api_name, token = %token))]
  async fn basket_price(&self, chain: &ChainConfig, token: Address) -> Result<BasketPrice, PricingError> {
    let body: CustomIndexPrice = self
      .client
      .get_json(&Self::price_path(chain, token))
      .await
      .map_err(|e| map_error(e, Some(token)))?;
    let price = parse_price(&body, token)?;
    debug!(buy = %price.buy_price, sell = %price.sell_price, "Basket price fetched");
    Ok(price)
  }

  #[instrument(skip(self, chain), fields(chain = %chain.api_name))]
  async fn list_baskets(&self, chain: &ChainConfig) -> Result<serde_json::Value, PricingError> {
    self
      .client
      .get_json(&Self::catalogue_path(chain))
      .await
      .map_err(|e| map_error(e, None))
  }
}

#[cfg(test)]
mod tests {
  use alloy::primitives::address;
  use rust_decimal_macros::dec;
  use serde_json::json;

  use super::*;

  const TOKEN: Address = address!("00000000000000000000000000000000000000e1");

  #[test]
  fn test_parse_price() {
    let body: CustomIndexPrice =
      serde_json::from_value(json!({ "buy_price": "1.65", "sell_price": 1.6 })).unwrap();
    let price = parse_price(&body, TOKEN).unwrap();
    assert_eq!(price.buy_price, dec!(1.65));
    assert_eq!(price.sell_price, dec!(1.6));
  }

  #[test]
  fn test_missing_buy_price_is_not_found() {
    let body: CustomIndexPrice = serde_json::from_value(json!({})).unwrap();
    assert_eq!(parse_price(&body, TOKEN), Err(PricingError::NotFound(TOKEN)));
  }

  #[test]
  fn test_404_maps_to_not_found() {
    let err = ApiError::Status {
      status: StatusCode::NOT_FOUND,
      body: String::new(),
    };
    assert_eq!(map_error(err, Some(TOKEN)), PricingError::NotFound(TOKEN));
  }

  #[test]
  fn test_exhausted_maps_to_unavailable() {
    let err = ApiError::Exhausted("server error 502".into());
    assert!(matches!(map_error(err, None), PricingError::Unavailable(_)));
  }
}
