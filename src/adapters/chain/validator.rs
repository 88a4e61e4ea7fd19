//! Contract Validator - On-chain Verification at Startup
//!
//! Checks that every configured protocol contract has deployed code on
//! its chain. A missing contract is logged loudly but never stops the
//! process: the chain keeps serving reads, and trades against it fail
//! at estimation with a clear revert.

use alloy::primitives::Address;
use alloy::providers::Provider;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::domain::chain::ChainId;
use crate::domain::registry::ChainRegistry;

use super::provider::ChainProviders;

/// Result of validating a single contract.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub chain_id: ChainId,
    /// Role of the contract ("stable_token", "basket_connector", ...).
    pub role: &'static str,
    pub address: Address,
    /// `None` when the node could not be asked.
    pub has_code: Option<bool>,
}

/// Validates contract addresses against on-chain state.
pub struct ContractValidator {
    providers: ChainProviders,
}

impl ContractValidator {
    pub fn new(providers: ChainProviders) -> Self {
        Self { providers }
    }

    /// Validate every contract of every registered chain.
    #[instrument(skip_all)]
    pub async fn validate_all(&self, registry: &ChainRegistry) -> Vec<ValidationResult> {
        let mut results = Vec::new();

        for chain in registry.list() {
            let c = &chain.contracts;
            let mut contracts = vec![
                ("stable_token", c.stable_token),
                ("stable_connector", c.stable_connector),
                ("basket_connector", c.basket_connector),
            ];
            contracts.extend(c.wrapped_native.map(|a| ("wrapped_native", a)));
            contracts.extend(c.quoter.map(|a| ("quoter", a)));

            for (role, address) in contracts {
                let has_code = self.has_code(chain.chain_id, address).await;
                match has_code {
                    Some(true) => {}
                    Some(false) => warn!(
                        chain = %chain.name,
                        role,
                        address = %address,
                        "Configured contract has no code, check the address"
                    ),
                    None => warn!(chain = %chain.name, role, "Could not verify contract"),
                }
                results.push(ValidationResult {
                    chain_id: chain.chain_id,
                    role,
                    address,
                    has_code,
                });
            }
        }

        let missing = results.iter().filter(|r| r.has_code == Some(false)).count();
        info!(validated = results.len(), missing, "Contract validation complete");
        results
    }

    async fn has_code(&self, chain_id: ChainId, address: Address) -> Option<bool> {
        let provider = self.providers.get(chain_id)?;
        provider
            .get_code_at(address)
            .await
            .ok()
            .map(|code| !code.is_empty())
    }
}
