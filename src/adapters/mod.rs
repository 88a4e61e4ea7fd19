//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies: EVM JSON-RPC via alloy, the pricing and
//! balance-index HTTP services, and the Prometheus/health endpoints.
//!
//! Adapter categories:
//! - `api`: Paloma DEX pricing API and optional balance index over HTTP
//! - `chain`: EVM providers, signing, contract calls and route quotes
//! - `metrics`: Prometheus metrics export and health checks

pub mod api;
pub mod chain;
pub mod metrics;
