//! Configuration Module - TOML-based Agent Configuration
//!
//! Loads and validates configuration from `config.toml`, with protocol
//! addresses and the signing key coming from the environment (`.env`
//! files are honoured). Every section has defaults, so a missing file
//! runs the built-in seven-chain setup.

pub mod chains;
pub mod loader;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  /// Process identity and logging.
  pub service: ServiceConfig,
  /// Trade pipeline tunables.
  pub trading: TradingConfig,
  /// Off-chain HTTP services.
  pub api: ApiConfig,
  /// Metrics and health endpoints.
  pub metrics: MetricsConfig,
  /// Per-chain overrides of the built-in table, or extra chains.
  pub chains: Vec<ChainOverride>,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
  /// Human-readable service name.
  pub name: String,
  /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins.
  pub log_level: String,
  /// JSON log lines on stderr; plain text when false.
  pub json_logs: bool,
}

impl Default for ServiceConfig {
  fn default() -> Self {
    Self {
      name: "paloma-dex-agent".to_string(),
      log_level: default_log_level(),
      json_logs: true,
    }
  }
}

/// Trade pipeline configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
  /// Slippage applied when a buy does not specify one (percent).
  pub default_slippage_percent: Decimal,
  /// Deadline applied when a trade does not specify one (seconds from now).
  pub default_deadline_secs: u64,
  /// Retries for reads that fail with an unreachable RPC.
  pub read_retries: u32,
  /// Base delay between read retries (milliseconds).
  pub read_retry_delay_ms: u64,
  /// Receipt queries before a transaction is reported as unconfirmed.
  pub confirmation_attempts: u32,
  /// Base polling interval (milliseconds); attempt n waits n × interval.
  pub confirmation_interval_ms: u64,
  /// Cap on a single polling delay (milliseconds).
  pub confirmation_max_interval_ms: u64,
  /// Bound on replaying a reverted trade for its reason (milliseconds).
  pub revert_replay_timeout_ms: u64,
}

impl Default for TradingConfig {
  fn default() -> Self {
    Self {
      default_slippage_percent: dec!(2.0),
      default_deadline_secs: 600,
      read_retries: 3,
      read_retry_delay_ms: 250,
      confirmation_attempts: 40,
      confirmation_interval_ms: 1_000,
      confirmation_max_interval_ms: 10_000,
      revert_replay_timeout_ms: 5_000,
    }
  }
}

/// HTTP service configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  /// Paloma DEX pricing API base URL.
  pub pricing_url: String,
  /// Optional balance index base URL.
  pub balance_index_url: Option<String>,
  /// Request timeout (milliseconds).
  pub timeout_ms: u64,
  /// Maximum in-flight requests per service.
  pub max_concurrent: usize,
  /// Sustained request rate per service.
  pub requests_per_second: u32,
  /// Retries on 429, 5xx and transport errors.
  pub max_retries: u32,
  /// Base retry delay (milliseconds), doubled per attempt.
  pub retry_base_delay_ms: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      pricing_url: "https://api.palomadex.com".to_string(),
      balance_index_url: None,
      timeout_ms: 30_000,
      max_concurrent: 10,
      requests_per_second: 10,
      max_retries: 3,
      retry_base_delay_ms: 200,
    }
  }
}

/// Metrics and monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
  /// Serve Prometheus metrics and health probes.
  pub enabled: bool,
  /// Metrics server bind address.
  pub bind_address: String,
  /// Health check endpoint port.
  pub health_port: u16,
  /// Seconds between chain health probes.
  pub health_interval_secs: u64,
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self {
      enabled: false,
      bind_address: "0.0.0.0:9090".to_string(),
      health_port: 8080,
      health_interval_secs: 30,
    }
  }
}

/// `[[chains]]` entry. Fields left out keep the built-in value; an id
/// not in the built-in table declares a new chain and then needs at
/// least `name` and `rpc_url`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChainOverride {
  pub chain_id: u64,
  /// Drop the chain entirely.
  pub disabled: bool,
  pub name: Option<String>,
  pub api_name: Option<String>,
  pub rpc_url: Option<String>,
  pub explorer_url: Option<String>,
  pub native_symbol: Option<String>,
  pub native_decimals: Option<u8>,
  pub fallback_gas_price_gwei: Option<u64>,
  pub stable_token: Option<String>,
  pub stable_connector: Option<String>,
  pub basket_connector: Option<String>,
  pub wrapped_native: Option<String>,
  pub quoter: Option<String>,
}

fn default_log_level() -> String {
  "info".to_string()
}
