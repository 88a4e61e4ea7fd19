//! Confirmation Poller - Waiting for Transaction Receipts
//!
//! Polls the chain for a receipt a bounded number of times with a
//! linearly growing delay (`interval × attempt`, capped). Used for both
//! approvals and trade transactions.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::B256;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use crate::domain::chain::ChainId;
use crate::ports::chain_client::{ChainClient, TxReceipt};

/// Polling schedule.
#[derive(Debug, Clone, Copy)]
pub struct ConfirmationPolicy {
  /// Receipt queries before giving up.
  pub max_attempts: u32,
  /// Base delay; attempt `n` waits `n × interval`.
  pub interval: Duration,
  /// Upper bound on a single delay.
  pub max_interval: Duration,
}

impl Default for ConfirmationPolicy {
  fn default() -> Self {
    Self {
      max_attempts: 40,
      interval: Duration::from_secs(1),
      max_interval: Duration::from_secs(10),
    }
  }
}

impl ConfirmationPolicy {
  /// Delay after the given (1-based) attempt.
  pub fn delay_after(&self, attempt: u32) -> Duration {
    self.interval.saturating_mul(attempt).min(self.max_interval)
  }
}

/// Waits for receipts through the `ChainClient` port.
#[derive(Clone)]
pub struct ConfirmationPoller {
  chain: Arc<dyn ChainClient>,
  policy: ConfirmationPolicy,
}

impl ConfirmationPoller {
  pub fn new(chain: Arc<dyn ChainClient>, policy: ConfirmationPolicy) -> Self {
    Self { chain, policy }
  }

  pub const fn policy(&self) -> &ConfirmationPolicy {
    &self.policy
  }

  /// Poll until a receipt appears. `None` once all attempts are used.
  ///
  /// Read errors count as a missed attempt; the transaction is already
  /// broadcast, so giving up early would only lose track of it.
  #[instrument(skip(self), fields(tx_hash = %tx_hash))]
  pub async fn wait(&self, chain_id: ChainId, tx_hash: B256) -> Option<TxReceipt> {
    for attempt in 1..=self.policy.max_attempts {
      match self.chain.transaction_receipt(chain_id, tx_hash).await {
        Ok(Some(receipt)) => {
          debug!(attempt, success = receipt.success, "Receipt found");
          return Some(receipt);
        }
        Ok(None) => debug!(attempt, "Receipt not yet available"),
        Err(e) => warn!(attempt, error = %e, "Receipt query failed"),
      }
      if attempt < self.policy.max_attempts {
        sleep(self.policy.delay_after(attempt)).await;
      }
    }
    warn!(
      attempts = self.policy.max_attempts,
      "Transaction not confirmed within polling window"
    );
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_linear_backoff_is_capped() {
    let policy = ConfirmationPolicy {
      max_attempts: 10,
      interval: Duration::from_millis(500),
      max_interval: Duration::from_secs(2),
    };
    assert_eq!(policy.delay_after(1), Duration::from_millis(500));
    assert_eq!(policy.delay_after(3), Duration::from_millis(1500));
    assert_eq!(policy.delay_after(9), Duration::from_secs(2));
  }
}
