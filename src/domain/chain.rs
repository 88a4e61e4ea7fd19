//! Chain Configuration - Per-chain Parameters and Contract Lookup
//!
//! A `ChainConfig` carries everything the engine needs to trade on one
//! EVM chain. Protocol contracts are selected by `TokenCategory`, so
//! callers never branch on chain identity.

use alloy::primitives::Address;
use serde::Serialize;

/// EVM chain id.
pub type ChainId = u64;

/// Native currency descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Protocol token families, each served by its own connector contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenCategory {
    /// The stable-value token (pUSD), bought/sold via the stable connector.
    Stable,
    /// Basket/index tokens (ETFs), bought/sold via the basket connector.
    Basket,
}

impl std::fmt::Display for TokenCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stable => write!(f, "stable"),
            Self::Basket => write!(f, "basket"),
        }
    }
}

/// Contract addresses deployed on one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainContracts {
    /// Stable-value token (pUSD).
    pub stable_token: Address,
    /// Connector that mints/redeems the stable-value token.
    pub stable_connector: Address,
    /// Connector that buys/sells basket tokens.
    pub basket_connector: Address,
    /// Wrapped native token, used as the path origin for native input.
    pub wrapped_native: Option<Address>,
    /// Uniswap V3 QuoterV2 used for route quotes.
    pub quoter: Option<Address>,
}

/// Immutable configuration for a supported chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    /// EVM chain id.
    pub chain_id: ChainId,
    /// Display name ("Ethereum", "Arbitrum One", ...).
    pub name: String,
    /// Chain identifier used by the off-chain pricing API.
    pub api_name: String,
    /// JSON-RPC endpoint. May embed credentials; never exposed by tools.
    pub rpc_url: String,
    /// Block explorer base URL.
    pub explorer_url: String,
    /// Native currency.
    pub native: NativeCurrency,
    /// Gas price used when the node's gas price query fails (gwei).
    pub fallback_gas_price_gwei: u64,
    /// Protocol and router contracts.
    pub contracts: ChainContracts,
}

impl ChainConfig {
    /// Connector contract serving a token category.
    pub const fn connector_for(&self, category: TokenCategory) -> Address {
        match category {
            TokenCategory::Stable => self.contracts.stable_connector,
            TokenCategory::Basket => self.contracts.basket_connector,
        }
    }

    /// Category of a protocol token on this chain. Anything that is not
    /// the stable-value token is treated as a basket token.
    pub fn category_of(&self, token: Address) -> TokenCategory {
        if token == self.contracts.stable_token {
            TokenCategory::Stable
        } else {
            TokenCategory::Basket
        }
    }

    /// Explorer link for a transaction hash.
    pub fn tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{tx_hash}", self.explorer_url.trim_end_matches('/'))
    }
}

/// Public view of a chain, safe to hand to callers.
#[derive(Debug, Clone, Serialize)]
pub struct ChainSummary {
    pub chain_id: ChainId,
    pub name: String,
    pub explorer_url: String,
    pub native_currency: NativeCurrency,
    pub contracts: ChainContracts,
}

impl From<&ChainConfig> for ChainSummary {
    fn from(chain: &ChainConfig) -> Self {
        Self {
            chain_id: chain.chain_id,
            name: chain.name.clone(),
            explorer_url: chain.explorer_url.clone(),
            native_currency: chain.native.clone(),
            contracts: chain.contracts.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;

    use super::*;

    fn sample() -> ChainConfig {
        ChainConfig {
            chain_id: 1,
            name: "Ethereum".into(),
            api_name: "ethereum".into(),
            rpc_url: "https://rpc.example".into(),
            explorer_url: "https://etherscan.io/".into(),
            native: NativeCurrency {
                name: "Ether".into(),
                symbol: "ETH".into(),
                decimals: 18,
            },
            fallback_gas_price_gwei: 30,
            contracts: ChainContracts {
                stable_token: address!("1111111111111111111111111111111111111111"),
                stable_connector: address!("2222222222222222222222222222222222222222"),
                basket_connector: address!("3333333333333333333333333333333333333333"),
                wrapped_native: None,
                quoter: None,
            },
        }
    }

    #[test]
    fn test_connector_selected_by_category() {
        let chain = sample();
        let stable = chain.contracts.stable_token;
        let basket = address!("4444444444444444444444444444444444444444");

        assert_eq!(chain.category_of(stable), TokenCategory::Stable);
        assert_eq!(chain.category_of(basket), TokenCategory::Basket);
        assert_eq!(
            chain.connector_for(TokenCategory::Stable),
            chain.contracts.stable_connector
        );
        assert_eq!(
            chain.connector_for(TokenCategory::Basket),
            chain.contracts.basket_connector
        );
    }

    #[test]
    fn test_tx_url_trims_slash() {
        assert_eq!(sample().tx_url("0xabc"), "https://etherscan.io/tx/0xabc");
    }

    #[test]
    fn test_summary_omits_rpc_url() {
        let json = serde_json::to_value(ChainSummary::from(&sample())).unwrap();
        assert!(json.get("rpc_url").is_none());
        assert_eq!(json["native_currency"]["symbol"], "ETH");
    }
}
