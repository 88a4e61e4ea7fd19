//! Prometheus Metrics Registry - Agent Observability
//!
//! Registers and exposes Prometheus metrics for tool traffic and trade
//! outcomes. All metric names are prefixed `paloma_dex_`.

use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
};
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

use crate::domain::trade::{TradeDirection, TradeOutcome};

/// Centralized Prometheus metrics.
pub struct MetricsRegistry {
    registry: Registry,
    /// Tool invocations by tool name and result (`ok` / `error`).
    pub tool_calls: IntCounterVec,
    /// Tool latency in seconds.
    pub tool_latency: HistogramVec,
    /// Trade outcomes by chain, direction and outcome label.
    pub trade_outcomes: IntCounterVec,
    /// Per-chain RPC health (1 = healthy).
    pub chain_healthy: IntGaugeVec,
}

impl MetricsRegistry {
    /// Create and register all metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let tool_calls = IntCounterVec::new(
            Opts::new("paloma_dex_tool_calls_total", "Tool invocations"),
            &["tool", "result"],
        )?;

        let tool_latency = HistogramVec::new(
            HistogramOpts::new("paloma_dex_tool_latency_seconds", "Tool latency in seconds")
                .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0]),
            &["tool"],
        )?;

        let trade_outcomes = IntCounterVec::new(
            Opts::new("paloma_dex_trade_outcomes_total", "Trade outcomes"),
            &["chain_id", "direction", "outcome"],
        )?;

        let chain_healthy = IntGaugeVec::new(
            Opts::new("paloma_dex_chain_healthy", "RPC health per chain (1=healthy)"),
            &["chain_id"],
        )?;

        registry.register(Box::new(tool_calls.clone()))?;
        registry.register(Box::new(tool_latency.clone()))?;
        registry.register(Box::new(trade_outcomes.clone()))?;
        registry.register(Box::new(chain_healthy.clone()))?;

        Ok(Self {
            registry,
            tool_calls,
            tool_latency,
            trade_outcomes,
            chain_healthy,
        })
    }

    pub fn record_tool(&self, tool: &str, ok: bool, seconds: f64) {
        let result = if ok { "ok" } else { "error" };
        self.tool_calls.with_label_values(&[tool, result]).inc();
        self.tool_latency.with_label_values(&[tool]).observe(seconds);
    }

    pub fn record_trade(&self, chain_id: u64, direction: TradeDirection, outcome: &TradeOutcome) {
        self.trade_outcomes
            .with_label_values(&[&chain_id.to_string(), &direction.to_string(), outcome.label()])
            .inc();
    }

    pub fn set_chain_health(&self, chain_id: u64, healthy: bool) {
        self.chain_healthy
            .with_label_values(&[&chain_id.to_string()])
            .set(i64::from(healthy));
    }

    /// Text exposition of every registered metric.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Serve `/metrics` on the configured bind address.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn serve(
        self: Arc<Self>,
        bind_address: String,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        let metrics = Arc::clone(&self);

        let app = Router::new().route(
            "/metrics",
            get(move || {
                let metrics = Arc::clone(&metrics);
                async move {
                    match metrics.render() {
                        Ok(body) => (StatusCode::OK, body),
                        Err(e) => {
                            warn!(error = %e, "Metrics encoding failed");
                            (StatusCode::INTERNAL_SERVER_ERROR, String::new())
                        }
                    }
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind(&bind_address).await?;
        info!(address = %bind_address, "Prometheus metrics server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }
}
