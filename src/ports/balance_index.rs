//! Balance Index Port - Optional Balance Aggregation Service
//!
//! An indexer that returns native balances for many chains in one
//! request. When none is configured, or it fails, callers read each
//! chain over RPC instead.

use alloy::primitives::{Address, U256};
use async_trait::async_trait;

use crate::domain::chain::ChainId;

/// Native balance of one address on one chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedBalance {
  /// Chain the balance was read on.
  pub chain_id: ChainId,
  /// Balance in wei.
  pub native_raw: U256,
}

/// Balance aggregation service.
#[async_trait]
pub trait BalanceIndex: Send + Sync + 'static {
  /// Native balances for `owner` across `chain_ids`. Chains the index
  /// does not cover are simply absent from the result.
  async fn native_balances(
    &self,
    owner: Address,
    chain_ids: &[ChainId],
  ) -> anyhow::Result<Vec<IndexedBalance>>;
}
