//! Chain Adapters - EVM Interaction Layer
//!
//! Provides on-chain access via alloy-rs 0.9 for every supported chain:
//! - One RPC provider per chain
//! - The `ChainClient` implementation (reads, estimation, signing, receipts)
//! - Uniswap V3 QuoterV2 route quotes
//! - Legacy gas pricing with per-chain fallback
//! - Startup contract validation

pub mod contracts;
pub mod gas;
pub mod provider;
pub mod quoter;
pub mod signer;
pub mod validator;

pub use contracts::EvmChainClient;
pub use gas::GasOracle;
pub use provider::ChainProviders;
pub use quoter::UniswapQuoter;
pub use signer::TradeSigner;
pub use validator::ContractValidator;
