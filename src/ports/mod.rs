//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the domain/usecases layer
//! requires from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `ChainClient`: EVM reads and signed transaction submission
//! - `PricingService` / `RouteQuoter`: basket prices and swap quotes
//! - `BalanceIndex`: optional multi-chain balance aggregation

pub mod balance_index;
pub mod chain_client;
pub mod pricing;
