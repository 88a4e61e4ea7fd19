//! Paloma DEX Agent - Entry Point
//!
//! Wires configuration, logging, chain connections and the tool layer,
//! then serves tool calls as JSON lines on stdin/stdout until EOF or
//! SIGINT.
//!
//! Wiring sequence:
//! 1. Load `.env`, then config.toml (path from `PADEX_CONFIG`)
//! 2. Init tracing (JSON structured logging to stderr)
//! 3. Load the signing key from `PRIVATE_KEY`
//! 4. Build the chain registry and connect one provider per chain
//! 5. Check that configured contracts have code (warnings only)
//! 6. Create the pricing API client and the optional balance index
//! 7. Spawn metrics and health servers when enabled
//! 8. Serve `{id, tool, arguments}` requests, one task per request,
//!    finishing in-flight calls on EOF or SIGINT

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::BufReader;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use paloma_dex_agent::adapters::api::balance_index::HttpBalanceIndex;
use paloma_dex_agent::adapters::api::client::{ApiClient, ApiClientConfig};
use paloma_dex_agent::adapters::api::pricing::PalomaPricingApi;
use paloma_dex_agent::adapters::chain::contracts::EvmChainClient;
use paloma_dex_agent::adapters::chain::provider::ChainProviders;
use paloma_dex_agent::adapters::chain::quoter::UniswapQuoter;
use paloma_dex_agent::adapters::chain::signer::{PRIVATE_KEY_ENV, TradeSigner};
use paloma_dex_agent::adapters::chain::validator::ContractValidator;
use paloma_dex_agent::adapters::metrics::{HealthServer, HealthState, MetricsRegistry};
use paloma_dex_agent::config::{self, AppConfig, TradingConfig};
use paloma_dex_agent::ports::balance_index::BalanceIndex;
use paloma_dex_agent::ports::chain_client::ChainClient;
use paloma_dex_agent::tools::{ToolContext, ToolRegistry, TradeDefaults, serve_lines};
use paloma_dex_agent::usecases::OrchestratorSettings;
use paloma_dex_agent::usecases::confirmation::ConfirmationPolicy;

fn orchestrator_settings(trading: &TradingConfig) -> OrchestratorSettings {
    OrchestratorSettings {
        read_retries: trading.read_retries,
        read_retry_delay: Duration::from_millis(trading.read_retry_delay_ms),
        confirmation: ConfirmationPolicy {
            max_attempts: trading.confirmation_attempts,
            interval: Duration::from_millis(trading.confirmation_interval_ms),
            max_interval: Duration::from_millis(trading.confirmation_max_interval_ms),
        },
        revert_replay_timeout: Duration::from_millis(trading.revert_replay_timeout_ms),
    }
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.service.log_level));
    // stdout carries tool replies; logs go to stderr.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.service.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Environment and configuration ────────────────────
    let _ = dotenvy::dotenv();
    let config_path =
        std::env::var(config::loader::CONFIG_PATH_ENV).unwrap_or_else(|_| "config.toml".to_string());
    let config = config::loader::load_config(&config_path).context("Failed to load configuration")?;

    // ── 2. Structured logging ───────────────────────────────
    init_tracing(&config);

    // ── 3. Signing key ──────────────────────────────────────
    let signer = TradeSigner::from_env(PRIVATE_KEY_ENV).context("Failed to load signing key")?;

    // ── 4. Chain registry and providers ─────────────────────
    let registry = Arc::new(
        config::loader::build_registry(&config, |key| std::env::var(key).ok())
            .context("Failed to build chain registry")?,
    );
    for degraded in registry.degraded() {
        warn!(
            chain_id = degraded.chain_id,
            name = %degraded.name,
            missing = ?degraded.missing,
            "Chain disabled, required settings missing"
        );
    }

    info!(
        name = %config.service.name,
        version = env!("CARGO_PKG_VERSION"),
        account = %signer.address(),
        chains = registry.list().len(),
        degraded = registry.degraded().len(),
        "Starting Paloma DEX agent"
    );

    let providers = ChainProviders::connect(&registry)
        .await
        .context("Failed to create chain providers")?;

    // ── 5. Contract sanity check ────────────────────────────
    let checked = ContractValidator::new(providers.clone()).validate_all(&registry).await;
    info!(contracts = checked.len(), "Contract check finished");

    let chain: Arc<dyn ChainClient> = Arc::new(EvmChainClient::new(
        Arc::clone(&registry),
        providers.clone(),
        signer,
    ));
    let quoter = Arc::new(UniswapQuoter::new(providers));

    // ── 6. Pricing API and balance index ────────────────────
    let pricing_client = ApiClient::new(ApiClientConfig::from_api(&config.api, &config.api.pricing_url))
        .context("Failed to create pricing API client")?;
    let pricing = Arc::new(PalomaPricingApi::new(pricing_client));

    let index: Option<Arc<dyn BalanceIndex>> = match &config.api.balance_index_url {
        Some(url) => {
            let client = ApiClient::new(ApiClientConfig::from_api(&config.api, url))
                .context("Failed to create balance index client")?;
            Some(Arc::new(HttpBalanceIndex::new(client)))
        }
        None => None,
    };

    // ── 7. Metrics and health ───────────────────────────────
    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);
    let mut background = Vec::new();

    let metrics = if config.metrics.enabled {
        let metrics = Arc::new(MetricsRegistry::new().context("Failed to register metrics")?);
        let health = Arc::new(HealthState::new());

        let server = Arc::clone(&metrics);
        let bind = config.metrics.bind_address.clone();
        let rx = shutdown_tx.subscribe();
        background.push(tokio::spawn(async move {
            if let Err(e) = server.serve(bind, rx).await {
                error!(error = %e, "Metrics server failed");
            }
        }));

        let rx = shutdown_tx.subscribe();
        let health_server = HealthServer::new(Arc::clone(&health), config.metrics.health_port);
        background.push(tokio::spawn(async move {
            if let Err(e) = health_server.run(rx).await {
                error!(error = %e, "Health server failed");
            }
        }));

        let chain_ids = registry.list().iter().map(|c| c.chain_id).collect();
        let interval = Duration::from_secs(config.metrics.health_interval_secs.max(1));
        background.push(tokio::spawn(health.monitor(
            Arc::clone(&chain),
            chain_ids,
            Some(Arc::clone(&metrics)),
            interval,
            shutdown_tx.subscribe(),
        )));
        Some(metrics)
    } else {
        None
    };

    // ── 8. Tool layer ───────────────────────────────────────
    let defaults = TradeDefaults {
        slippage_percent: config.trading.default_slippage_percent,
        deadline: Duration::from_secs(config.trading.default_deadline_secs),
    };
    let ctx = Arc::new(ToolContext::new(
        Arc::clone(&registry),
        chain,
        pricing,
        quoter,
        index,
        orchestrator_settings(&config.trading),
        defaults,
        metrics,
    ));
    let tools = Arc::new(ToolRegistry::new());

    info!(tools = tools.specs().len(), "Serving tool calls on stdin");

    let stdin = BufReader::new(tokio::io::stdin());
    let sigint = async {
        if signal::ctrl_c().await.is_err() {
            // No signal handler; run until input closes.
            std::future::pending::<()>().await;
        }
        info!("SIGINT received, initiating graceful shutdown");
    };
    if let Err(e) = serve_lines(stdin, tokio::io::stdout(), ctx, tools, sigint).await {
        error!(error = %e, "Tool loop failed");
    }

    let _ = shutdown_tx.send(());
    for handle in background {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }

    info!("Shutdown complete");
    Ok(())
}
