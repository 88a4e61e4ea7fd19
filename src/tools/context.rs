//! Tool Context - Shared State Handed to Every Tool
//!
//! Built once at startup and shared by `Arc`. Holds the registry, the
//! chain client and the use cases; nothing in the tool layer reaches
//! for globals.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::adapters::metrics::MetricsRegistry;
use crate::domain::registry::ChainRegistry;
use crate::ports::balance_index::BalanceIndex;
use crate::ports::chain_client::ChainClient;
use crate::ports::pricing::{PricingService, RouteQuoter};
use crate::usecases::{BalanceReader, OrchestratorSettings, PriceResolver, TradeOrchestrator};

/// Values applied when a trade request leaves them out.
#[derive(Debug, Clone, Copy)]
pub struct TradeDefaults {
  pub slippage_percent: Decimal,
  pub deadline: Duration,
}

impl TradeDefaults {
  /// Deadline `secs` from now, or the default horizon.
  pub fn deadline_from(&self, secs: Option<u64>) -> DateTime<Utc> {
    let horizon = secs.map_or(self.deadline, Duration::from_secs);
    let horizon = chrono::Duration::from_std(horizon).unwrap_or(chrono::Duration::MAX);
    Utc::now().checked_add_signed(horizon).unwrap_or(DateTime::<Utc>::MAX_UTC)
  }
}

/// Everything a tool handler may touch.
pub struct ToolContext {
  pub registry: Arc<ChainRegistry>,
  pub chain: Arc<dyn ChainClient>,
  pub balances: Arc<BalanceReader>,
  pub prices: Arc<PriceResolver>,
  pub orchestrator: Arc<TradeOrchestrator>,
  pub defaults: TradeDefaults,
  pub metrics: Option<Arc<MetricsRegistry>>,
}

impl ToolContext {
  /// Wire the use cases over the given ports.
  #[allow(clippy::too_many_arguments)]
  pub fn new(
    registry: Arc<ChainRegistry>,
    chain: Arc<dyn ChainClient>,
    pricing: Arc<dyn PricingService>,
    quoter: Arc<dyn RouteQuoter>,
    index: Option<Arc<dyn BalanceIndex>>,
    settings: OrchestratorSettings,
    defaults: TradeDefaults,
    metrics: Option<Arc<MetricsRegistry>>,
  ) -> Self {
    let mut reader = BalanceReader::new(Arc::clone(&registry), Arc::clone(&chain));
    if let Some(index) = index {
      reader = reader.with_index(index);
    }
    let balances = Arc::new(reader);
    let prices = Arc::new(PriceResolver::new(
      Arc::clone(&registry),
      Arc::clone(&chain),
      pricing,
      quoter,
    ));
    let orchestrator = Arc::new(TradeOrchestrator::new(
      Arc::clone(&registry),
      Arc::clone(&chain),
      Arc::clone(&balances),
      Arc::clone(&prices),
      settings,
    ));

    Self {
      registry,
      chain,
      balances,
      prices,
      orchestrator,
      defaults,
      metrics,
    }
  }
}
