//! Domain layer - Core trading types and arithmetic.
//!
//! Pure logic for the Paloma DEX agent: chain configuration and the
//! chain registry, token amounts, swap paths, slippage math, contract
//! ABIs and the trade request/outcome model. Nothing here performs I/O.

pub mod abi;
pub mod amount;
pub mod chain;
pub mod path;
pub mod registry;
pub mod slippage;
pub mod token;
pub mod trade;

// Re-export core types for convenience
pub use abi::ContractCall;
pub use amount::Amount;
pub use chain::{ChainConfig, ChainId, TokenCategory};
pub use path::SwapPath;
pub use registry::ChainRegistry;
pub use token::{Token, TokenRef};
pub use trade::{TradeDirection, TradeOutcome, TradeRequest, TradeState};
