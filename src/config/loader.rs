//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters, and
//! building the chain registry from the built-in table, `[[chains]]`
//! overrides and the environment.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::domain::registry::ChainRegistry;
use crate::domain::slippage::validate_slippage;

use super::chains::{apply_overrides, builtin_declarations};
use super::AppConfig;

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "PADEX_CONFIG";

/// Load and validate configuration from a TOML file.
///
/// A missing file yields the defaults. An unreadable or malformed file
/// is an error, as is any value that fails validation.
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let config = if path.exists() {
    let content = std::fs::read_to_string(path)
      .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Invalid config file: {}", path.display()))?
  } else {
    warn!(path = %path.display(), "Config file not found, using defaults");
    AppConfig::default()
  };

  info!(
    chain_overrides = config.chains.len(),
    slippage = %config.trading.default_slippage_percent,
    metrics = config.metrics.enabled,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig = toml::from_str(content).context("Failed to parse config.toml")?;
  validate_config(&config)?;
  Ok(config)
}

/// Build the chain registry, reading addresses through `env`.
pub fn build_registry(config: &AppConfig, env: impl Fn(&str) -> Option<String>) -> Result<ChainRegistry> {
  let declarations = apply_overrides(builtin_declarations(env), &config.chains)?;
  let registry = ChainRegistry::from_declarations(declarations).context("Malformed chain table")?;
  anyhow::ensure!(
    !registry.is_empty() || !registry.degraded().is_empty(),
    "No chains configured"
  );
  Ok(registry)
}

/// Validate all configuration parameters.
fn validate_config(config: &AppConfig) -> Result<()> {
  let t = &config.trading;
  validate_slippage(t.default_slippage_percent)
    .map_err(|e| anyhow::anyhow!("trading.default_slippage_percent: {e}"))?;
  anyhow::ensure!(
    t.default_deadline_secs > 0,
    "default_deadline_secs must be positive"
  );
  anyhow::ensure!(
    t.confirmation_attempts > 0,
    "confirmation_attempts must be positive"
  );
  anyhow::ensure!(
    t.confirmation_interval_ms > 0 && t.confirmation_interval_ms <= t.confirmation_max_interval_ms,
    "confirmation_interval_ms must be in (0, confirmation_max_interval_ms], got {}",
    t.confirmation_interval_ms
  );

  let api = &config.api;
  anyhow::ensure!(
    api.pricing_url.starts_with("http://") || api.pricing_url.starts_with("https://"),
    "api.pricing_url must be an http(s) URL"
  );
  anyhow::ensure!(api.timeout_ms > 0, "api.timeout_ms must be positive");
  anyhow::ensure!(api.max_concurrent > 0, "api.max_concurrent must be positive");
  anyhow::ensure!(api.requests_per_second > 0, "api.requests_per_second must be positive");

  let mut ids = std::collections::HashSet::new();
  for chain in &config.chains {
    anyhow::ensure!(chain.chain_id > 0, "[[chains]] entry without chain_id");
    anyhow::ensure!(
      ids.insert(chain.chain_id),
      "chain {} appears twice in [[chains]]",
      chain.chain_id
    );
  }

  Ok(())
}
