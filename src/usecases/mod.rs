//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces to implement the
//! agent's workflows. Each use case depends only on ports, never on a
//! concrete adapter.
//!
//! Use cases:
//! - `BalanceReader`: Native and token balances, single chain or all chains
//! - `PriceResolver`: Basket prices and Uniswap V3 route selection
//! - `AllowanceManager`: Exact-amount ERC-20 approvals
//! - `GasEstimator`: Gas limits with safety margin, protocol fees
//! - `ConfirmationPoller`: Bounded receipt polling
//! - `TradeOrchestrator`: The buy/sell pipeline state machine

pub mod account_lock;
pub mod approvals;
pub mod balance_reader;
pub mod confirmation;
pub mod gas_estimator;
pub mod price_resolver;
pub mod trade_orchestrator;

pub use balance_reader::BalanceReader;
pub use price_resolver::PriceResolver;
pub use trade_orchestrator::{OrchestratorSettings, TradeOrchestrator};
