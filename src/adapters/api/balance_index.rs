//! HTTP Balance Index - `BalanceIndex` over a JSON Endpoint
//!
//! Fetches native balances for many chains in one request:
//! `GET {base}/balances?address=0x..&chain_ids=1,10,56`. Entries that
//! cannot be parsed are dropped so the caller falls back to RPC for them.

use alloy::primitives::Address;
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::domain::chain::ChainId;
use crate::ports::balance_index::{BalanceIndex, IndexedBalance};

use super::client::ApiClient;
use super::types::{BalanceIndexResponse, u256_from_json, u64_from_json};

fn join_ids(ids: &[ChainId]) -> String {
  ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
}

/// Balance index reached over HTTP.
pub struct HttpBalanceIndex {
  client: ApiClient,
}

impl HttpBalanceIndex {
  pub fn new(client: ApiClient) -> Self {
    Self { client }
  }
}

/// Keep entries for requested chains that parse cleanly.
pub fn collect_balances(body: BalanceIndexResponse, requested: &[ChainId]) -> Vec<IndexedBalance> {
  body
    .balances
    .into_iter()
    .filter_map(|entry| {
      let chain_id = u64_from_json(&entry.chain_id)?;
      if !requested.contains(&chain_id) {
        return None;
      }
      match u256_from_json(&entry.native_balance) {
        Some(native_raw) => Some(IndexedBalance { chain_id, native_raw }),
        None => {
          warn!(chain_id, "Unparseable indexed balance, ignoring");
          None
        }
      }
    })
    .collect()
}

#[async_trait]
impl BalanceIndex for HttpBalanceIndex {
  #[instrument(skip(self, chain_ids), fields(chains = chain_ids.len()))]
  async fn native_balances(&self, owner: Address, chain_ids: &[ChainId]) -> Result<Vec<IndexedBalance>> {
    let path = format!("/balances?address={owner}&chain_ids={}", join_ids(chain_ids));
    let body: BalanceIndexResponse = self
      .client
      .get_json(&path)
      .await
      .context("Balance index request failed")?;
    let balances = collect_balances(body, chain_ids);
    debug!(returned = balances.len(), "Indexed balances fetched");
    Ok(balances)
  }
}
