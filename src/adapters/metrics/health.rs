//! Health Check Server - Liveness and Readiness Probes
//!
//! Exposes /live and /ready via axum 0.7. Readiness holds while at least
//! one chain RPC answers; a background task refreshes the per-chain flags.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, PoisonError};
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument};

use crate::domain::chain::ChainId;
use crate::ports::chain_client::ChainClient;

use super::prometheus::MetricsRegistry;

/// Shared health state polled by readiness probes.
#[derive(Debug, Default)]
pub struct HealthState {
    chains: RwLock<BTreeMap<ChainId, bool>>,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_chain(&self, chain_id: ChainId, healthy: bool) {
        self.chains
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(chain_id, healthy);
    }

    /// Per-chain health snapshot.
    pub fn chains(&self) -> BTreeMap<ChainId, bool> {
        self.chains.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Ready when any chain is reachable.
    pub fn is_ready(&self) -> bool {
        self.chains
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .any(|healthy| *healthy)
    }

    /// Probe every chain periodically until shutdown.
    pub async fn monitor(
        self: Arc<Self>,
        chain: Arc<dyn ChainClient>,
        chain_ids: Vec<ChainId>,
        metrics: Option<Arc<MetricsRegistry>>,
        interval: Duration,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    for &chain_id in &chain_ids {
                        let healthy = chain.is_healthy(chain_id).await;
                        self.set_chain(chain_id, healthy);
                        if let Some(m) = &metrics {
                            m.set_chain_health(chain_id, healthy);
                        }
                    }
                    debug!(ready = self.is_ready(), "Chain health refreshed");
                }
                _ = shutdown_rx.recv() => break,
            }
        }
    }
}

/// Axum-based health check HTTP server.
pub struct HealthServer {
    state: Arc<HealthState>,
    port: u16,
}

impl HealthServer {
    pub fn new(state: Arc<HealthState>, port: u16) -> Self {
        Self { state, port }
    }

    #[instrument(skip(self, shutdown_rx))]
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) -> anyhow::Result<()> {
        let app = Router::new()
            .route("/live", get(Self::liveness))
            .route("/ready", get(Self::readiness))
            .with_state(Arc::clone(&self.state));

        let addr = format!("0.0.0.0:{}", self.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        info!(address = %addr, "Health server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }

    async fn liveness() -> impl IntoResponse {
        (StatusCode::OK, "OK")
    }

    /// 200 with per-chain flags when any chain is up, 503 otherwise.
    async fn readiness(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
        let status = if state.is_ready() {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };
        (status, Json(state.chains()))
    }
}
