//! Chain Registry - Validated, Immutable Chain Table
//!
//! Built once at startup from raw chain declarations. Chains missing a
//! required protocol address (or an RPC endpoint) are excluded and
//! recorded as degraded rather than failing the process; a malformed
//! table (duplicate ids, unparseable addresses or URLs) is fatal.

use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use super::chain::{ChainConfig, ChainContracts, ChainId, NativeCurrency};
use super::token::parse_address;

/// A chain as declared by configuration, before validation.
#[derive(Debug, Clone, Default)]
pub struct ChainDeclaration {
    pub chain_id: ChainId,
    pub name: String,
    pub api_name: String,
    pub rpc_url: String,
    pub explorer_url: String,
    pub native_name: String,
    pub native_symbol: String,
    pub native_decimals: u8,
    pub fallback_gas_price_gwei: u64,
    pub stable_token: Option<String>,
    pub stable_connector: Option<String>,
    pub basket_connector: Option<String>,
    pub wrapped_native: Option<String>,
    pub quoter: Option<String>,
}

/// A declared chain excluded from the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DegradedChain {
    pub chain_id: ChainId,
    pub name: String,
    /// Names of the required settings that were missing.
    pub missing: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("unknown chain id {0}")]
    UnknownChain(ChainId),
    #[error("chain id {0} is declared more than once")]
    DuplicateChain(ChainId),
    #[error("chain {chain_id}: invalid {field} '{value}'")]
    Malformed {
        chain_id: ChainId,
        field: &'static str,
        value: String,
    },
}

/// The set of usable chains, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    chains: Vec<ChainConfig>,
    degraded: Vec<DegradedChain>,
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

fn parse_optional(
    chain_id: ChainId,
    field: &'static str,
    value: Option<&String>,
) -> Result<Option<alloy::primitives::Address>, RegistryError> {
    non_empty(value)
        .map(|s| {
            parse_address(s).map_err(|_| RegistryError::Malformed {
                chain_id,
                field,
                value: s.to_string(),
            })
        })
        .transpose()
}

impl ChainRegistry {
    /// Validate declarations and build the registry.
    pub fn from_declarations(
        declarations: Vec<ChainDeclaration>,
    ) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        let mut chains = Vec::with_capacity(declarations.len());
        let mut degraded = Vec::new();

        for decl in declarations {
            if !seen.insert(decl.chain_id) {
                return Err(RegistryError::DuplicateChain(decl.chain_id));
            }
            let id = decl.chain_id;

            let stable_token = parse_optional(id, "stable_token", decl.stable_token.as_ref())?;
            let stable_connector =
                parse_optional(id, "stable_connector", decl.stable_connector.as_ref())?;
            let basket_connector =
                parse_optional(id, "basket_connector", decl.basket_connector.as_ref())?;
            let wrapped_native =
                parse_optional(id, "wrapped_native", decl.wrapped_native.as_ref())?;
            let quoter = parse_optional(id, "quoter", decl.quoter.as_ref())?;

            let rpc_url = decl.rpc_url.trim().to_string();
            if !rpc_url.is_empty()
                && !(rpc_url.starts_with("http://") || rpc_url.starts_with("https://"))
            {
                return Err(RegistryError::Malformed {
                    chain_id: id,
                    field: "rpc_url",
                    value: rpc_url,
                });
            }

            let mut missing = Vec::new();
            if rpc_url.is_empty() {
                missing.push("rpc_url");
            }
            if stable_token.is_none() {
                missing.push("stable_token");
            }
            if stable_connector.is_none() {
                missing.push("stable_connector");
            }
            if basket_connector.is_none() {
                missing.push("basket_connector");
            }

            match (stable_token, stable_connector, basket_connector) {
                (Some(stable_token), Some(stable_connector), Some(basket_connector))
                    if missing.is_empty() =>
                {
                    chains.push(ChainConfig {
                        chain_id: id,
                        name: decl.name,
                        api_name: decl.api_name,
                        rpc_url,
                        explorer_url: decl.explorer_url,
                        native: NativeCurrency {
                            name: decl.native_name,
                            symbol: decl.native_symbol,
                            decimals: decl.native_decimals,
                        },
                        fallback_gas_price_gwei: decl.fallback_gas_price_gwei,
                        contracts: ChainContracts {
                            stable_token,
                            stable_connector,
                            basket_connector,
                            wrapped_native,
                            quoter,
                        },
                    });
                }
                _ => {
                    warn!(
                        chain_id = id,
                        chain = %decl.name,
                        missing = ?missing,
                        "Chain excluded from registry: required settings missing"
                    );
                    degraded.push(DegradedChain {
                        chain_id: id,
                        name: decl.name,
                        missing,
                    });
                }
            }
        }

        info!(
            active = chains.len(),
            degraded = degraded.len(),
            "Chain registry built"
        );

        Ok(Self { chains, degraded })
    }

    /// Look up a usable chain.
    pub fn resolve(&self, chain_id: ChainId) -> Result<&ChainConfig, RegistryError> {
        self.chains
            .iter()
            .find(|c| c.chain_id == chain_id)
            .ok_or(RegistryError::UnknownChain(chain_id))
    }

    /// All usable chains in declaration order.
    pub fn list(&self) -> &[ChainConfig] {
        &self.chains
    }

    /// Declared chains that were excluded.
    pub fn degraded(&self) -> &[DegradedChain] {
        &self.degraded
    }

    /// Why a chain was excluded, if it was.
    pub fn degraded_entry(&self, chain_id: ChainId) -> Option<&DegradedChain> {
        self.degraded.iter().find(|d| d.chain_id == chain_id)
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}
