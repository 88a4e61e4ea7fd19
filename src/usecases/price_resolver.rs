//! Price/Path Resolver Use Case - Basket Prices and Swap Routes
//!
//! Basket-token prices come from the protocol pricing service. Every
//! other leg is priced and routed through the chain's Uniswap V3
//! quoter: candidate paths are quoted concurrently and the best output
//! wins. Slippage only turns a quote into a minimum output; nothing here
//! enforces it.

use std::sync::Arc;

use alloy::primitives::{Address, Bytes, U256};
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::domain::amount::{Amount, pow10};
use crate::domain::chain::{ChainConfig, ChainId, TokenCategory};
use crate::domain::path::{SwapPath, candidate_paths};
use crate::domain::registry::ChainRegistry;
use crate::domain::slippage::min_output;
use crate::domain::token::TokenRef;
use crate::domain::trade::RejectReason;
use crate::error::{Result, TradeError};
use crate::ports::chain_client::ChainClient;
use crate::ports::pricing::{PricingService, QuoteError, RouteQuoter};

/// Where a price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
  PricingService,
  RouteQuote,
}

/// Buy/sell price of `to` in units of `from` (or USD for baskets).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceQuote {
  pub buy_price: Decimal,
  pub sell_price: Decimal,
  pub source: PriceSource,
}

/// A quoted route with its slippage-adjusted minimum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
  /// Packed path bytes.
  pub path: Bytes,
  /// Number of pools crossed.
  pub hops: usize,
  /// Quoted output in raw units of the last token.
  pub quoted_output: U256,
  /// Minimum acceptable output in raw units.
  pub min_output: U256,
  /// Unix deadline forwarded to the connector.
  pub deadline: U256,
}

/// Resolves prices and swap paths.
pub struct PriceResolver {
  registry: Arc<ChainRegistry>,
  chain: Arc<dyn ChainClient>,
  pricing: Arc<dyn PricingService>,
  quoter: Arc<dyn RouteQuoter>,
}

/// Unix seconds of a deadline, as the connectors expect it.
pub fn deadline_seconds(deadline: DateTime<Utc>) -> U256 {
  U256::from(u64::try_from(deadline.timestamp()).unwrap_or_default())
}

impl PriceResolver {
  pub fn new(
    registry: Arc<ChainRegistry>,
    chain: Arc<dyn ChainClient>,
    pricing: Arc<dyn PricingService>,
    quoter: Arc<dyn RouteQuoter>,
  ) -> Self {
    Self {
      registry,
      chain,
      pricing,
      quoter,
    }
  }

  fn resolve_chain(&self, chain_id: ChainId) -> Result<&ChainConfig> {
    self
      .registry
      .resolve(chain_id)
      .map_err(|_| TradeError::UnknownChain(chain_id))
  }

  /// Price of the pair. Basket tokens (on either side) are priced by the
  /// pricing service; anything else by quoting one whole `from` unit.
  #[instrument(skip(self))]
  pub async fn resolve_price(&self, chain_id: ChainId, from: TokenRef, to: TokenRef) -> Result<PriceQuote> {
    let chain = self.resolve_chain(chain_id)?;

    let basket = [to, from].into_iter().find_map(|t| match t {
      TokenRef::Contract(addr) if chain.category_of(addr) == TokenCategory::Basket => Some(addr),
      _ => None,
    });

    if let Some(token) = basket {
      return self.basket_price(chain, token).await;
    }

    let from_decimals = self.decimals_of(chain, from).await?;
    let to_addr = to
      .address()
      .ok_or_else(|| TradeError::NoRouteFound("cannot route into the native currency".to_string()))?;
    let to_decimals = self.decimals_of(chain, to).await?;

    let one = pow10(from_decimals);
    let route = self.best_route(chain, from, to_addr, one).await?;
    let price = Amount::from_raw(route.1, to_decimals)
      .to_decimal()
      .ok_or_else(|| TradeError::NoRouteFound("quote out of range".to_string()))?;

    Ok(PriceQuote {
      buy_price: price,
      sell_price: price,
      source: PriceSource::RouteQuote,
    })
  }

  /// Pricing-service quote for a basket token.
  pub async fn basket_price(&self, chain: &ChainConfig, token: Address) -> Result<PriceQuote> {
    let price = self
      .pricing
      .basket_price(chain, token)
      .await
      .map_err(|e| TradeError::PriceUnavailable(e.to_string()))?;
    if price.buy_price <= Decimal::ZERO {
      return Err(TradeError::PriceUnavailable(format!(
        "non-positive buy price {} for {token}",
        price.buy_price
      )));
    }
    debug!(buy = %price.buy_price, sell = %price.sell_price, "Basket price resolved");
    Ok(PriceQuote {
      buy_price: price.buy_price,
      sell_price: price.sell_price,
      source: PriceSource::PricingService,
    })
  }

  /// Best route from `from` to `to` for `amount_in`, with the minimum
  /// output derived from `slippage_percent` unless `explicit_min` is set.
  #[allow(clippy::too_many_arguments)]
  #[instrument(skip(self))]
  pub async fn resolve_path(
    &self,
    chain_id: ChainId,
    from: TokenRef,
    to: Address,
    amount_in: U256,
    slippage_percent: Decimal,
    explicit_min: Option<U256>,
    deadline: DateTime<Utc>,
  ) -> Result<ResolvedPath> {
    let chain = self.resolve_chain(chain_id)?;
    let (path, quoted) = self.best_route(chain, from, to, amount_in).await?;
    let min = match explicit_min {
      Some(min) => min,
      None => min_output(quoted, slippage_percent)
        .map_err(|e| TradeError::rejected(RejectReason::InvalidSlippage, e.to_string()))?,
    };

    info!(
      hops = path.hops(),
      quoted = %quoted,
      min_output = %min,
      "Route resolved"
    );

    Ok(ResolvedPath {
      path: path.encode(),
      hops: path.hops(),
      quoted_output: quoted,
      min_output: min,
      deadline: deadline_seconds(deadline),
    })
  }

  /// Quote a caller-supplied path.
  pub async fn quote_path(&self, chain_id: ChainId, path: &SwapPath, amount_in: U256) -> Result<U256> {
    let chain = self.resolve_chain(chain_id)?;
    self
      .quoter
      .quote_exact_input(chain, &path.encode(), amount_in)
      .await
      .map_err(|e| TradeError::NoRouteFound(e.to_string()))
  }

  /// Basket catalogue for a chain.
  pub async fn list_baskets(&self, chain_id: ChainId) -> Result<serde_json::Value> {
    let chain = self.resolve_chain(chain_id)?;
    self
      .pricing
      .list_baskets(chain)
      .await
      .map_err(|e| TradeError::PriceUnavailable(e.to_string()))
  }

  async fn decimals_of(&self, chain: &ChainConfig, token: TokenRef) -> Result<u8> {
    match token {
      TokenRef::Native => Ok(chain.native.decimals),
      TokenRef::Contract(addr) => Ok(self.chain.token_metadata(chain.chain_id, addr).await?.decimals),
    }
  }

  async fn best_route(
    &self,
    chain: &ChainConfig,
    from: TokenRef,
    to: Address,
    amount_in: U256,
  ) -> Result<(SwapPath, U256)> {
    let wrapped = chain.contracts.wrapped_native;
    let origin = match from {
      TokenRef::Contract(addr) => addr,
      TokenRef::Native => wrapped.ok_or_else(|| {
        TradeError::NoRouteFound(format!("no wrapped native token configured on {}", chain.name))
      })?,
    };

    let candidates = candidate_paths(origin, to, wrapped);
    if candidates.is_empty() {
      return Err(TradeError::NoRouteFound(format!("{origin} and {to} are the same token")));
    }

    let quotes = join_all(candidates.iter().map(|path| {
      let encoded = path.encode();
      async move { self.quoter.quote_exact_input(chain, &encoded, amount_in).await }
    }))
    .await;

    let mut best: Option<(SwapPath, U256)> = None;
    let mut unreachable = 0usize;
    for (path, quote) in candidates.into_iter().zip(quotes) {
      match quote {
        Ok(out) if !out.is_zero() => {
          if best.as_ref().is_none_or(|(_, b)| out > *b) {
            best = Some((path, out));
          }
        }
        Ok(_) | Err(QuoteError::NoLiquidity(_)) => {}
        Err(QuoteError::NotConfigured(id)) => {
          return Err(TradeError::NoRouteFound(format!(
            "no route quoter configured for chain {id}"
          )));
        }
        Err(QuoteError::Unreachable(e)) => {
          warn!(error = %e, "Quote failed");
          unreachable += 1;
        }
      }
    }

    match best {
      Some(found) => Ok(found),
      None if unreachable > 0 => Err(TradeError::ChainUnreachable(format!(
        "{unreachable} route quotes failed on {}",
        chain.name
      ))),
      None => Err(TradeError::NoRouteFound(format!(
        "no liquidity from {origin} to {to} on {}",
        chain.name
      ))),
    }
  }
}
