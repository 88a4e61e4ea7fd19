//! EVM Chain Client - `ChainClient` over alloy-rs Providers
//!
//! Implements the `ChainClient` port for every registered chain: ERC-20
//! and connector reads through `eth_call`, gas estimation, legacy-priced
//! transactions signed locally and broadcast raw, receipt lookups, and
//! revert-reason replay.
//!
//! Node errors are classified once, here. A JSON-RPC error response that
//! carries revert data (or says "revert") becomes `Reverted`, other error
//! responses become `Rpc`, and anything that never got a response becomes
//! `Unreachable`.

use std::sync::Arc;

use alloy::eips::BlockId;
use alloy::eips::eip2718::Encodable2718;
use alloy::network::{ReceiptResponse, TransactionBuilder};
use alloy::primitives::{Address, B256, U256};
use alloy::providers::Provider;
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::{SolCall, decode_revert_reason};
use alloy::transports::{RpcError, TransportErrorKind};
use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use crate::domain::abi::{ContractCall, IERC20, IStableConnector};
use crate::domain::chain::{ChainConfig, ChainId};
use crate::domain::registry::ChainRegistry;
use crate::ports::chain_client::{ChainClient, ChainError, TokenMetadata, TxReceipt};

use super::gas::GasOracle;
use super::provider::{ChainProviders, SharedProvider};
use super::signer::TradeSigner;

/// Map an alloy transport error onto the port's error taxonomy.
pub fn classify_rpc_error(err: RpcError<TransportErrorKind>) -> ChainError {
    match err {
        RpcError::ErrorResp(payload) => {
            let message = payload.message.to_string();
            if let Some(data) = payload.as_revert_data() {
                let reason = decode_revert_reason(&data).or_else(|| reason_from_message(&message));
                ChainError::Reverted { reason }
            } else if message.to_ascii_lowercase().contains("revert") {
                ChainError::Reverted {
                    reason: reason_from_message(&message),
                }
            } else {
                ChainError::Rpc(message)
            }
        }
        RpcError::Transport(kind) => ChainError::Unreachable(kind.to_string()),
        RpcError::NullResp => ChainError::Unreachable("empty response".to_string()),
        other => ChainError::Rpc(other.to_string()),
    }
}

/// "execution reverted: too little received" → "too little received".
fn reason_from_message(message: &str) -> Option<String> {
    let (_, rest) = message.split_once("reverted")?;
    let reason = rest.trim_start_matches(':').trim();
    (!reason.is_empty()).then(|| reason.to_string())
}

/// `ChainClient` backed by one alloy provider per chain and a local signer.
pub struct EvmChainClient {
    registry: Arc<ChainRegistry>,
    providers: ChainProviders,
    signer: TradeSigner,
    gas_oracle: GasOracle,
}

impl EvmChainClient {
    pub fn new(registry: Arc<ChainRegistry>, providers: ChainProviders, signer: TradeSigner) -> Self {
        Self {
            registry,
            providers,
            signer,
            gas_oracle: GasOracle::new(),
        }
    }

    fn provider(&self, chain_id: ChainId) -> Result<SharedProvider, ChainError> {
        self.providers
            .get(chain_id)
            .ok_or(ChainError::NoProvider(chain_id))
    }

    fn chain(&self, chain_id: ChainId) -> Result<&ChainConfig, ChainError> {
        self.registry
            .resolve(chain_id)
            .map_err(|_| ChainError::NoProvider(chain_id))
    }

    fn request(&self, call: &ContractCall) -> TransactionRequest {
        TransactionRequest::default()
            .with_from(self.signer.address())
            .with_to(call.to)
            .with_input(call.data.clone())
            .with_value(call.value)
    }

    /// `eth_call` a view function and decode its return.
    async fn view<C: SolCall + Send>(
        &self,
        chain_id: ChainId,
        to: Address,
        call: C,
    ) -> Result<C::Return, ChainError> {
        let provider = self.provider(chain_id)?;
        let tx = TransactionRequest::default()
            .with_to(to)
            .with_input(call.abi_encode());
        let output = provider.call(&tx).await.map_err(classify_rpc_error)?;
        C::abi_decode_returns(&output, true)
            .map_err(|e| ChainError::Rpc(format!("undecodable return from {to}: {e}")))
    }
}

#[async_trait]
impl ChainClient for EvmChainClient {
    fn account(&self) -> Address {
        self.signer.address()
    }

    #[instrument(skip(self))]
    async fn native_balance(&self, chain_id: ChainId, owner: Address) -> Result<U256, ChainError> {
        let provider = self.provider(chain_id)?;
        provider.get_balance(owner).await.map_err(classify_rpc_error)
    }

    #[instrument(skip(self))]
    async fn token_balance(
        &self,
        chain_id: ChainId,
        token: Address,
        owner: Address,
    ) -> Result<U256, ChainError> {
        let ret = self
            .view(chain_id, token, IERC20::balanceOfCall { owner })
            .await?;
        Ok(ret._0)
    }

    #[instrument(skip(self))]
    async fn token_metadata(&self, chain_id: ChainId, token: Address) -> Result<TokenMetadata, ChainError> {
        let decimals = self.view(chain_id, token, IERC20::decimalsCall {}).await?._0;
        // Some tokens return bytes32 from symbol(); fall back to the address.
        let symbol = match self.view(chain_id, token, IERC20::symbolCall {}).await {
            Ok(ret) => ret._0,
            Err(ChainError::Unreachable(e)) => return Err(ChainError::Unreachable(e)),
            Err(e) => {
                debug!(error = %e, "symbol() unavailable");
                token.to_string()
            }
        };
        Ok(TokenMetadata { symbol, decimals })
    }

    #[instrument(skip(self))]
    async fn allowance(
        &self,
        chain_id: ChainId,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ChainError> {
        let ret = self
            .view(chain_id, token, IERC20::allowanceCall { owner, spender })
            .await?;
        Ok(ret._0)
    }

    #[instrument(skip(self))]
    async fn protocol_fee(&self, chain_id: ChainId, connector: Address) -> Result<U256, ChainError> {
        // Both connectors expose the same `gas_fee()` selector.
        let ret = self
            .view(chain_id, connector, IStableConnector::gas_feeCall {})
            .await?;
        Ok(ret._0)
    }

    #[instrument(skip(self, call), fields(to = %call.to, label = call.label))]
    async fn estimate_gas(&self, chain_id: ChainId, call: &ContractCall) -> Result<u64, ChainError> {
        let provider = self.provider(chain_id)?;
        let tx = self.request(call);
        provider.estimate_gas(&tx).await.map_err(classify_rpc_error)
    }

    #[instrument(skip(self, call), fields(to = %call.to, label = call.label))]
    async fn send_transaction(
        &self,
        chain_id: ChainId,
        call: &ContractCall,
        gas_limit: u64,
    ) -> Result<B256, ChainError> {
        let provider = self.provider(chain_id)?;
        let chain = self.chain(chain_id)?;
        let from = self.signer.address();

        let nonce = provider
            .get_transaction_count(from)
            .block_id(BlockId::pending())
            .await
            .map_err(classify_rpc_error)?;
        let gas_price = self.gas_oracle.gas_price(provider.as_ref(), chain).await;

        let envelope = self
            .request(call)
            .with_nonce(nonce)
            .with_chain_id(chain_id)
            .with_gas_limit(gas_limit)
            .with_gas_price(gas_price)
            .build(self.signer.wallet())
            .await
            .map_err(|e| ChainError::Signing(e.to_string()))?;

        let raw = envelope.encoded_2718();
        let pending = provider
            .send_raw_transaction(&raw)
            .await
            .map_err(classify_rpc_error)?;
        let tx_hash = *pending.tx_hash();

        info!(tx_hash = %tx_hash, nonce, gas_limit, gas_price = %gas_price, "Transaction broadcast");
        Ok(tx_hash)
    }

    async fn transaction_receipt(
        &self,
        chain_id: ChainId,
        tx_hash: B256,
    ) -> Result<Option<TxReceipt>, ChainError> {
        let provider = self.provider(chain_id)?;
        let receipt = provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(classify_rpc_error)?;

        Ok(receipt.map(|r| TxReceipt {
            tx_hash,
            success: r.status(),
            block_number: r.block_number,
            gas_used: u64::try_from(r.gas_used).unwrap_or(u64::MAX),
        }))
    }

    #[instrument(skip(self, call), fields(to = %call.to, label = call.label))]
    async fn revert_reason(
        &self,
        chain_id: ChainId,
        call: &ContractCall,
        block_number: u64,
    ) -> Option<String> {
        let provider = self.provider(chain_id).ok()?;
        let tx = self.request(call);
        match provider.call(&tx).block(BlockId::number(block_number)).await {
            Ok(_) => {
                debug!("Replay succeeded, no revert reason available");
                None
            }
            Err(e) => match classify_rpc_error(e) {
                ChainError::Reverted { reason } => reason,
                other => {
                    warn!(error = %other, "Revert replay failed");
                    None
                }
            },
        }
    }

    async fn latest_block(&self, chain_id: ChainId) -> Result<u64, ChainError> {
        let provider = self.provider(chain_id)?;
        provider.get_block_number().await.map_err(classify_rpc_error)
    }

    async fn is_healthy(&self, chain_id: ChainId) -> bool {
        self.latest_block(chain_id).await.is_ok()
    }
}
