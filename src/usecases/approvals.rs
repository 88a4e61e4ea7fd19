//! Allowance & Approval Manager - ERC-20 Spend Allowances
//!
//! Reads the current allowance before every trade and, only when it is
//! short, approves exactly the required amount and waits for that
//! approval to be mined. Allowances are never cached and never set to
//! the maximum.

use std::sync::Arc;

use alloy::primitives::{Address, B256, U256};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::domain::abi::ContractCall;
use crate::domain::chain::ChainId;
use crate::error::{Result, TradeError};
use crate::ports::chain_client::ChainClient;

use super::confirmation::ConfirmationPoller;
use super::gas_estimator::GasEstimator;

/// What `ensure_allowance` had to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AllowanceStatus {
  /// The existing allowance already covered the amount.
  AlreadySufficient,
  /// An approval transaction was mined.
  Approved { tx_hash: B256 },
}

impl AllowanceStatus {
  pub const fn tx_hash(&self) -> Option<B256> {
    match self {
      Self::AlreadySufficient => None,
      Self::Approved { tx_hash } => Some(*tx_hash),
    }
  }
}

/// Manages ERC-20 approvals for the signer.
pub struct AllowanceManager {
  chain: Arc<dyn ChainClient>,
  gas: GasEstimator,
  poller: ConfirmationPoller,
}

impl AllowanceManager {
  pub fn new(chain: Arc<dyn ChainClient>, gas: GasEstimator, poller: ConfirmationPoller) -> Self {
    Self { chain, gas, poller }
  }

  /// Current allowance, read fresh.
  pub async fn get_allowance(
    &self,
    chain_id: ChainId,
    token: Address,
    owner: Address,
    spender: Address,
  ) -> Result<U256> {
    Ok(self.chain.allowance(chain_id, token, owner, spender).await?)
  }

  /// Make sure `spender` may move at least `required` of `token`.
  ///
  /// Submits at most one approval for exactly `required` and blocks until
  /// it is mined. A second call with the same amount performs no write.
  #[instrument(skip(self), fields(required = %required))]
  pub async fn ensure_allowance(
    &self,
    chain_id: ChainId,
    token: Address,
    owner: Address,
    spender: Address,
    required: U256,
  ) -> Result<AllowanceStatus> {
    let current = self.get_allowance(chain_id, token, owner, spender).await?;
    if current >= required {
      info!(current = %current, "Allowance sufficient");
      return Ok(AllowanceStatus::AlreadySufficient);
    }

    if owner != self.chain.account() {
      return Err(TradeError::ApprovalRejected {
        reason: format!("owner {owner} is not the signing account"),
        tx_hash: None,
      });
    }

    info!(current = %current, spender = %spender, "Submitting exact-amount approval");

    let call = ContractCall::approve(token, spender, required);
    let gas = self
      .gas
      .estimate(chain_id, &call)
      .await
      .map_err(|e| TradeError::ApprovalRejected {
        reason: e.to_string(),
        tx_hash: None,
      })?;

    let tx_hash = self
      .chain
      .send_transaction(chain_id, &call, gas.with_margin)
      .await
      .map_err(|e| TradeError::ApprovalRejected {
        reason: e.to_string(),
        tx_hash: None,
      })?;

    info!(tx_hash = %tx_hash, "Approval broadcast, waiting for confirmation");

    match self.poller.wait(chain_id, tx_hash).await {
      Some(receipt) if receipt.success => {
        info!(tx_hash = %tx_hash, block = ?receipt.block_number, "Approval confirmed");
        Ok(AllowanceStatus::Approved { tx_hash })
      }
      Some(receipt) => {
        let reason = match receipt.block_number {
          Some(block) => self.chain.revert_reason(chain_id, &call, block).await,
          None => None,
        };
        warn!(tx_hash = %tx_hash, reason = ?reason, "Approval reverted");
        Err(TradeError::ApprovalRejected {
          reason: reason.unwrap_or_else(|| "approval reverted".to_string()),
          tx_hash: Some(tx_hash),
        })
      }
      None => Err(TradeError::ApprovalTimeout { tx_hash }),
    }
  }
}
