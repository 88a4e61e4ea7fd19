//! Chain RPC Providers - alloy-rs 0.9 Connection Management
//!
//! Opens one JSON-RPC provider per registered chain and checks at
//! startup that each endpoint reports the chain id it is registered
//! under. An endpoint that is down at startup is kept: reads against it
//! fail with `ChainUnreachable` until it recovers, and the other chains
//! are unaffected.
//!
//! Providers are stored type-erased as `dyn Provider` so the adapters
//! never name alloy's nested filler types.

use std::collections::HashMap;
use std::sync::Arc;

use alloy::providers::{Provider, ProviderBuilder};
use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use crate::domain::chain::{ChainConfig, ChainId};
use crate::domain::registry::ChainRegistry;

/// Shared, type-erased alloy provider.
pub type SharedProvider = Arc<dyn Provider + Send + Sync>;

/// One provider per chain id.
#[derive(Clone, Default)]
pub struct ChainProviders {
    providers: HashMap<ChainId, SharedProvider>,
}

impl ChainProviders {
    /// Connect to every chain in the registry.
    ///
    /// Fails only on a malformed RPC URL. A chain-id mismatch or an
    /// unreachable node is logged and the chain stays registered.
    #[instrument(skip_all, fields(chains = registry.list().len()))]
    pub async fn connect(registry: &ChainRegistry) -> Result<Self> {
        let mut providers = HashMap::new();

        for chain in registry.list() {
            let provider = Self::connect_one(chain).await?;

            match provider.get_chain_id().await {
                Ok(reported) if reported == chain.chain_id => {
                    info!(chain_id = chain.chain_id, chain = %chain.name, "Connected to RPC");
                }
                Ok(reported) => {
                    warn!(
                        chain_id = chain.chain_id,
                        reported,
                        chain = %chain.name,
                        "RPC endpoint reports a different chain id"
                    );
                }
                Err(e) => {
                    warn!(
                        chain_id = chain.chain_id,
                        chain = %chain.name,
                        error = %e,
                        "RPC unreachable at startup, will retry on demand"
                    );
                }
            }

            providers.insert(chain.chain_id, provider);
        }

        Ok(Self { providers })
    }

    async fn connect_one(chain: &ChainConfig) -> Result<SharedProvider> {
        // The URL may embed an API key; keep it out of the error text.
        let provider = ProviderBuilder::new()
            .on_builtin(&chain.rpc_url)
            .await
            .with_context(|| format!("Invalid RPC endpoint for {}", chain.name))?;
        Ok(Arc::new(provider))
    }

    /// Build from already-connected providers.
    pub fn from_map(providers: HashMap<ChainId, SharedProvider>) -> Self {
        Self { providers }
    }

    /// Provider for a chain, if one is connected.
    pub fn get(&self, chain_id: ChainId) -> Option<SharedProvider> {
        self.providers.get(&chain_id).map(Arc::clone)
    }

    /// Connected chain ids.
    pub fn chain_ids(&self) -> impl Iterator<Item = ChainId> + '_ {
        self.providers.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
