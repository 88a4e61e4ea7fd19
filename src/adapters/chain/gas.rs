//! Gas Oracle - Per-chain Legacy Gas Price
//!
//! Queries `eth_gasPrice` for the chain being traded on. When the node
//! cannot answer, the last price seen on that chain is reused, and if
//! there is none the chain's configured fallback (in gwei) applies.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use alloy::providers::Provider;
use tracing::{debug, instrument, warn};

use crate::domain::chain::{ChainConfig, ChainId};

/// 1 gwei in wei.
pub const GWEI: u128 = 1_000_000_000;

/// Gas price oracle shared by all chains.
#[derive(Default)]
pub struct GasOracle {
    /// Last price read per chain (wei).
    last_seen: Mutex<HashMap<ChainId, u128>>,
}

impl GasOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current gas price in wei. Never fails.
    #[instrument(skip(self, provider, chain), fields(chain_id = chain.chain_id))]
    pub async fn gas_price(&self, provider: &(dyn Provider + Send + Sync), chain: &ChainConfig) -> u128 {
        match provider.get_gas_price().await {
            Ok(price) if price > 0 => {
                self.remember(chain.chain_id, price);
                debug!(gas_gwei = price / GWEI, "Gas price updated");
                price
            }
            Ok(_) | Err(_) => {
                let price = self.fallback(chain);
                warn!(gas_wei = %price, "Gas price query failed, using fallback");
                price
            }
        }
    }

    /// Cached price for a chain, or its configured fallback.
    pub fn fallback(&self, chain: &ChainConfig) -> u128 {
        self.cached(chain.chain_id)
            .unwrap_or_else(|| u128::from(chain.fallback_gas_price_gwei) * GWEI)
    }

    pub fn cached(&self, chain_id: ChainId) -> Option<u128> {
        self.last_seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&chain_id)
            .copied()
    }

    fn remember(&self, chain_id: ChainId, price: u128) {
        self.last_seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(chain_id, price);
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::Address;

    use super::*;
    use crate::domain::chain::{ChainContracts, NativeCurrency};

    fn chain(fallback: u64) -> ChainConfig {
        ChainConfig {
            chain_id: 56,
            name: "BNB Smart Chain".into(),
            api_name: "bsc".into(),
            rpc_url: "http://localhost:8545".into(),
            explorer_url: "https://bscscan.com".into(),
            native: NativeCurrency {
                name: "BNB".into(),
                symbol: "BNB".into(),
                decimals: 18,
            },
            fallback_gas_price_gwei: fallback,
            contracts: ChainContracts {
                stable_token: Address::repeat_byte(1),
                stable_connector: Address::repeat_byte(2),
                basket_connector: Address::repeat_byte(3),
                wrapped_native: None,
                quoter: None,
            },
        }
    }

    #[test]
    fn test_fallback_uses_configured_gwei() {
        let oracle = GasOracle::new();
        assert_eq!(oracle.fallback(&chain(5)), 5 * GWEI);
    }

    #[test]
    fn test_fallback_prefers_last_seen() {
        let oracle = GasOracle::new();
        oracle.remember(56, 3 * GWEI);
        assert_eq!(oracle.fallback(&chain(5)), 3 * GWEI);
        assert_eq!(oracle.cached(1), None);
    }
}
