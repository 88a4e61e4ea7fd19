//! Uniswap V3 Route Quoter - `RouteQuoter` via QuoterV2
//!
//! Calls `quoteExactInput(path, amountIn)` on the chain's QuoterV2 with
//! `eth_call`. The quoter reverts when a pool on the path is missing or
//! dry, so a revert means "no liquidity", not an outage.

use alloy::network::TransactionBuilder;
use alloy::primitives::{Bytes, U256};
use alloy::providers::Provider;
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::domain::abi::IQuoterV2;
use crate::domain::chain::ChainConfig;
use crate::ports::chain_client::ChainError;
use crate::ports::pricing::{QuoteError, RouteQuoter};

use super::contracts::classify_rpc_error;
use super::provider::ChainProviders;

/// Route quoter over the shared chain providers.
pub struct UniswapQuoter {
    providers: ChainProviders,
}

impl UniswapQuoter {
    pub fn new(providers: ChainProviders) -> Self {
        Self { providers }
    }
}

#[async_trait]
impl RouteQuoter for UniswapQuoter {
    #[instrument(skip(self, chain, path), fields(chain_id = chain.chain_id, path_len = path.len()))]
    async fn quote_exact_input(
        &self,
        chain: &ChainConfig,
        path: &Bytes,
        amount_in: U256,
    ) -> Result<U256, QuoteError> {
        let quoter = chain
            .contracts
            .quoter
            .ok_or(QuoteError::NotConfigured(chain.chain_id))?;
        let provider = self
            .providers
            .get(chain.chain_id)
            .ok_or_else(|| QuoteError::Unreachable(format!("no provider for chain {}", chain.chain_id)))?;

        let call = IQuoterV2::quoteExactInputCall {
            path: path.clone(),
            amountIn: amount_in,
        };
        let tx = TransactionRequest::default()
            .with_to(quoter)
            .with_input(call.abi_encode());

        let output = provider.call(&tx).await.map_err(|e| match classify_rpc_error(e) {
            ChainError::Reverted { reason } => {
                QuoteError::NoLiquidity(reason.unwrap_or_else(|| "quote reverted".to_string()))
            }
            ChainError::Rpc(msg) => QuoteError::NoLiquidity(msg),
            other => QuoteError::Unreachable(other.to_string()),
        })?;

        let ret = IQuoterV2::quoteExactInputCall::abi_decode_returns(&output, true)
            .map_err(|e| QuoteError::NoLiquidity(format!("undecodable quote: {e}")))?;
        debug!(amount_out = %ret.amountOut, "Quote received");
        Ok(ret.amountOut)
    }
}
