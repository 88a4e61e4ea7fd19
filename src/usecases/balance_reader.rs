//! Balance Reader Use Case - Native and ERC-20 Balances
//!
//! Reads balances through the `ChainClient` port and returns exact
//! `Amount`s. No caching and no retries: balances are always read
//! fresh and the caller decides whether a failure is worth retrying.

use std::sync::Arc;

use alloy::primitives::Address;
use futures_util::future::join_all;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::domain::amount::Amount;
use crate::domain::chain::{ChainConfig, ChainId};
use crate::domain::registry::ChainRegistry;
use crate::domain::token::{Token, TokenRef, parse_address};
use crate::error::{Result, TradeError};
use crate::ports::balance_index::BalanceIndex;
use crate::ports::chain_client::{ChainClient, ChainError};

/// Native balance of one chain in a multi-chain overview.
#[derive(Debug, Clone, Serialize)]
pub struct ChainBalance {
  /// Chain id.
  pub chain_id: ChainId,
  /// Chain display name.
  pub name: String,
  /// Native currency symbol.
  pub symbol: String,
  /// Balance, when the read succeeded.
  pub native_balance: Option<Amount>,
  /// Read failure, when it did not.
  pub error: Option<String>,
}

/// A token together with a balance of it.
#[derive(Debug, Clone, Serialize)]
pub struct TokenBalance {
  /// Token descriptor.
  pub token: Token,
  /// Owner of the balance.
  pub owner: Address,
  /// Balance in the token's units.
  pub balance: Amount,
}

/// Reads balances on any registered chain.
pub struct BalanceReader {
  registry: Arc<ChainRegistry>,
  chain: Arc<dyn ChainClient>,
  index: Option<Arc<dyn BalanceIndex>>,
}

fn parse_owner(address: &str) -> Result<Address> {
  parse_address(address).map_err(|e| TradeError::InvalidAddress(e.to_string()))
}

impl BalanceReader {
  /// Create a reader without a balance index.
  pub fn new(registry: Arc<ChainRegistry>, chain: Arc<dyn ChainClient>) -> Self {
    Self {
      registry,
      chain,
      index: None,
    }
  }

  /// Attach a balance aggregation service for multi-chain overviews.
  #[must_use]
  pub fn with_index(mut self, index: Arc<dyn BalanceIndex>) -> Self {
    self.index = Some(index);
    self
  }

  fn resolve(&self, chain_id: ChainId) -> Result<&ChainConfig> {
    self
      .registry
      .resolve(chain_id)
      .map_err(|_| TradeError::UnknownChain(chain_id))
  }

  /// Native balance of an address given as a string.
  pub async fn native_balance(&self, chain_id: ChainId, address: &str) -> Result<Amount> {
    let owner = parse_owner(address)?;
    self.native_balance_of(chain_id, owner).await
  }

  /// Native balance of a parsed address.
  #[instrument(skip(self))]
  pub async fn native_balance_of(&self, chain_id: ChainId, owner: Address) -> Result<Amount> {
    let chain = self.resolve(chain_id)?;
    let raw = self.chain.native_balance(chain_id, owner).await?;
    debug!(raw = %raw, "Native balance read");
    Ok(Amount::from_raw(raw, chain.native.decimals))
  }

  /// ERC-20 balance with addresses given as strings.
  pub async fn token_balance(
    &self,
    chain_id: ChainId,
    token: &str,
    address: &str,
  ) -> Result<TokenBalance> {
    let token = parse_owner(token)?;
    let owner = parse_owner(address)?;
    self.token_balance_of(chain_id, token, owner).await
  }

  /// ERC-20 balance, with symbol and decimals read from the token.
  #[instrument(skip(self))]
  pub async fn token_balance_of(
    &self,
    chain_id: ChainId,
    token: Address,
    owner: Address,
  ) -> Result<TokenBalance> {
    let info = self.token_info(chain_id, TokenRef::Contract(token)).await?;
    let raw = self.chain.token_balance(chain_id, token, owner).await?;
    Ok(TokenBalance {
      balance: Amount::from_raw(raw, info.decimals),
      token: info,
      owner,
    })
  }

  /// Balance of either the native currency or an ERC-20.
  pub async fn balance_of(
    &self,
    chain_id: ChainId,
    token: TokenRef,
    owner: Address,
  ) -> Result<TokenBalance> {
    match token {
      TokenRef::Contract(addr) => self.token_balance_of(chain_id, addr, owner).await,
      TokenRef::Native => {
        let token = self.token_info(chain_id, TokenRef::Native).await?;
        let balance = self.native_balance_of(chain_id, owner).await?;
        Ok(TokenBalance {
          token,
          owner,
          balance,
        })
      }
    }
  }

  /// Resolve a token reference to symbol and decimals.
  pub async fn token_info(&self, chain_id: ChainId, token: TokenRef) -> Result<Token> {
    let chain = self.resolve(chain_id)?;
    match token {
      TokenRef::Native => Ok(Token::native(
        chain_id,
        chain.native.symbol.clone(),
        chain.native.decimals,
      )),
      TokenRef::Contract(addr) => {
        let meta = self
          .chain
          .token_metadata(chain_id, addr)
          .await
          .map_err(|e| match e {
            ChainError::Reverted { .. } | ChainError::Rpc(_) => TradeError::InvalidAddress(format!(
              "{addr} is not an ERC-20 token on chain {chain_id}: {e}"
            )),
            other => TradeError::from(other),
          })?;
        Ok(Token {
          chain_id,
          address: Some(addr),
          symbol: meta.symbol,
          decimals: meta.decimals,
        })
      }
    }
  }

  /// Native balances on every registered chain.
  ///
  /// Uses the balance index when one is attached and falls back to one
  /// concurrent RPC read per chain for anything it did not return.
  #[instrument(skip(self))]
  pub async fn native_balances_all(&self, owner: Address) -> Vec<ChainBalance> {
    let chains = self.registry.list();
    let ids: Vec<ChainId> = chains.iter().map(|c| c.chain_id).collect();

    let indexed = match &self.index {
      Some(index) => match index.native_balances(owner, &ids).await {
        Ok(found) => found,
        Err(e) => {
          warn!(error = %e, "Balance index failed, reading chains directly");
          Vec::new()
        }
      },
      None => Vec::new(),
    };

    let reads = chains.iter().map(|chain| {
      let hit = indexed.iter().find(|b| b.chain_id == chain.chain_id).map(|b| b.native_raw);
      async move {
        let result = match hit {
          Some(raw) => Ok(Amount::from_raw(raw, chain.native.decimals)),
          None => self.native_balance_of(chain.chain_id, owner).await,
        };
        let (native_balance, error) = match result {
          Ok(amount) => (Some(amount), None),
          Err(e) => (None, Some(e.to_string())),
        };
        ChainBalance {
          chain_id: chain.chain_id,
          name: chain.name.clone(),
          symbol: chain.native.symbol.clone(),
          native_balance,
          error,
        }
      }
    });

    join_all(reads).await
  }
}
