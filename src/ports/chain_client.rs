//! Chain Client Port - On-chain Interaction Interface
//!
//! Defines the trait the use cases rely on for reading EVM state and
//! broadcasting signed transactions on any supported chain. The signer
//! is bound to the implementation; every write is sent from `account()`.

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use thiserror::Error;

use crate::domain::abi::ContractCall;
use crate::domain::chain::ChainId;

/// Errors surfaced by a chain client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
  /// No provider is connected for the chain.
  #[error("no provider for chain {0}")]
  NoProvider(ChainId),
  /// Transport failure: timeout, refused connection, bad gateway.
  #[error("rpc unreachable: {0}")]
  Unreachable(String),
  /// The node executed the call and it reverted.
  #[error("execution reverted: {}", reason.as_deref().unwrap_or("no reason given"))]
  Reverted { reason: Option<String> },
  /// Any other JSON-RPC error response.
  #[error("rpc error: {0}")]
  Rpc(String),
  /// The signer could not produce a transaction.
  #[error("signing failed: {0}")]
  Signing(String),
}

/// ERC-20 metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMetadata {
  /// Ticker symbol.
  pub symbol: String,
  /// Decimals of the smallest unit.
  pub decimals: u8,
}

/// Receipt of an included transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
  /// Transaction hash.
  pub tx_hash: B256,
  /// `true` when execution succeeded (status 1).
  pub success: bool,
  /// Block the transaction was included in.
  pub block_number: Option<u64>,
  /// Gas consumed.
  pub gas_used: u64,
}

/// Trait for on-chain interactions via alloy-rs.
///
/// Implementations hold one provider per chain plus the process signer.
/// No method retries on its own; retry policy belongs to the caller.
#[async_trait]
pub trait ChainClient: Send + Sync + 'static {
  /// Address of the signer every transaction is sent from.
  fn account(&self) -> Address;

  /// Native currency balance (wei).
  async fn native_balance(&self, chain_id: ChainId, owner: Address) -> Result<U256, ChainError>;

  /// ERC-20 balance in raw units.
  async fn token_balance(
    &self,
    chain_id: ChainId,
    token: Address,
    owner: Address,
  ) -> Result<U256, ChainError>;

  /// ERC-20 `symbol()` and `decimals()`.
  async fn token_metadata(&self, chain_id: ChainId, token: Address) -> Result<TokenMetadata, ChainError>;

  /// ERC-20 allowance granted by `owner` to `spender`.
  async fn allowance(
    &self,
    chain_id: ChainId,
    token: Address,
    owner: Address,
    spender: Address,
  ) -> Result<U256, ChainError>;

  /// Protocol fee read from a connector's `gas_fee()` accessor (wei).
  async fn protocol_fee(&self, chain_id: ChainId, connector: Address) -> Result<U256, ChainError>;

  /// Raw gas estimate for `call` sent from `account()`.
  async fn estimate_gas(&self, chain_id: ChainId, call: &ContractCall) -> Result<u64, ChainError>;

  /// Sign and broadcast `call` once. Returns the transaction hash.
  async fn send_transaction(
    &self,
    chain_id: ChainId,
    call: &ContractCall,
    gas_limit: u64,
  ) -> Result<B256, ChainError>;

  /// Receipt for `tx_hash`, or `None` while still pending.
  async fn transaction_receipt(
    &self,
    chain_id: ChainId,
    tx_hash: B256,
  ) -> Result<Option<TxReceipt>, ChainError>;

  /// Replay `call` at `block_number` and decode the revert reason.
  async fn revert_reason(
    &self,
    chain_id: ChainId,
    call: &ContractCall,
    block_number: u64,
  ) -> Option<String>;

  /// Latest block number.
  async fn latest_block(&self, chain_id: ChainId) -> Result<u64, ChainError>;

  /// Check if the chain's RPC connection is healthy.
  async fn is_healthy(&self, chain_id: ChainId) -> bool;
}
