//! HTTP API Adapters
//!
//! Off-chain services the engine talks to over HTTP.
//!
//! Sub-modules:
//! - `client`: Rate-limited client with retries
//! - `pricing`: Paloma DEX pricing API (`PricingService`)
//! - `balance_index`: Optional balance aggregation service (`BalanceIndex`)
//! - `types`: Wire types and lenient number parsing

pub mod balance_index;
pub mod client;
pub mod pricing;
pub mod types;

pub use balance_index::HttpBalanceIndex;
pub use client::{ApiClient, ApiClientConfig};
pub use pricing::PalomaPricingApi;
