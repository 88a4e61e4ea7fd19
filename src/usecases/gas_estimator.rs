//! Gas Estimator Use Case - Gas Limits and Protocol Fees
//!
//! Wraps raw node estimates with the fixed 4/3 safety margin and reads
//! the connector protocol fee that is attached as transaction value.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use tracing::{debug, instrument, warn};

use crate::domain::abi::ContractCall;
use crate::domain::chain::ChainId;
use crate::domain::slippage::with_gas_margin;
use crate::error::{Result, TradeError};
use crate::ports::chain_client::{ChainClient, ChainError};

/// A gas estimate before and after the safety margin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasEstimate {
  /// Node estimate.
  pub raw: u64,
  /// Gas limit actually used: `raw × 4/3`.
  pub with_margin: u64,
}

impl GasEstimate {
  pub const fn from_raw(raw: u64) -> Self {
    Self {
      raw,
      with_margin: with_gas_margin(raw),
    }
  }
}

/// Estimates gas and reads protocol fees.
#[derive(Clone)]
pub struct GasEstimator {
  chain: Arc<dyn ChainClient>,
}

impl GasEstimator {
  pub fn new(chain: Arc<dyn ChainClient>) -> Self {
    Self { chain }
  }

  /// Estimate gas for `call`. Any failure maps to `EstimationFailed`,
  /// carrying the decoded revert reason when the node returned one.
  #[instrument(skip(self, call), fields(to = %call.to, label = call.label))]
  pub async fn estimate(&self, chain_id: ChainId, call: &ContractCall) -> Result<GasEstimate> {
    match self.chain.estimate_gas(chain_id, call).await {
      Ok(raw) => {
        let estimate = GasEstimate::from_raw(raw);
        debug!(raw, with_margin = estimate.with_margin, "Gas estimated");
        Ok(estimate)
      }
      Err(e) => {
        warn!(error = %e, "Gas estimation failed");
        let reason = match &e {
          ChainError::Reverted { reason } => reason.clone(),
          _ => None,
        };
        Err(TradeError::EstimationFailed {
          reason,
          message: e.to_string(),
        })
      }
    }
  }

  /// Fee charged by a connector, read from its `gas_fee()` accessor.
  #[instrument(skip(self))]
  pub async fn protocol_fee(&self, chain_id: ChainId, connector: Address) -> Result<U256> {
    let fee = self.chain.protocol_fee(chain_id, connector).await?;
    debug!(fee = %fee, "Protocol fee read");
    Ok(fee)
  }
}
