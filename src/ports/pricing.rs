//! Pricing Ports - Off-chain Basket Prices and On-chain Route Quotes
//!
//! Two collaborators feed the price/path resolver: the protocol's HTTP
//! pricing service for basket tokens, and a liquidity router quoter for
//! arbitrary swap legs.

use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::domain::chain::ChainConfig;

/// Buy and sell quote for one basket token, in USD per whole token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BasketPrice {
  /// Price paid per token when buying.
  pub buy_price: Decimal,
  /// Price received per token when selling.
  pub sell_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
  /// Service unreachable or returned a server error.
  #[error("pricing service unavailable: {0}")]
  Unavailable(String),
  /// The service has no price for the token.
  #[error("no price for token {0}")]
  NotFound(Address),
  /// Response could not be interpreted.
  #[error("malformed pricing response: {0}")]
  Malformed(String),
}

/// Protocol pricing service (basket/index tokens).
#[async_trait]
pub trait PricingService: Send + Sync + 'static {
  /// Current buy/sell price of a basket token.
  async fn basket_price(&self, chain: &ChainConfig, token: Address) -> Result<BasketPrice, PricingError>;

  /// Basket tokens listed on a chain, as returned by the service.
  async fn list_baskets(&self, chain: &ChainConfig) -> Result<serde_json::Value, PricingError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuoteError {
  /// The chain has no quoter configured.
  #[error("no route quoter configured for chain {0}")]
  NotConfigured(u64),
  /// The quote call reverted (no pool or no liquidity).
  #[error("no liquidity: {0}")]
  NoLiquidity(String),
  /// Transport failure.
  #[error("quoter unreachable: {0}")]
  Unreachable(String),
}

/// On-chain liquidity router quoter.
#[async_trait]
pub trait RouteQuoter: Send + Sync + 'static {
  /// Output amount for swapping `amount_in` along the packed `path`.
  async fn quote_exact_input(
    &self,
    chain: &ChainConfig,
    path: &Bytes,
    amount_in: U256,
  ) -> Result<U256, QuoteError>;
}
