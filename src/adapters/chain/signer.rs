//! Trade Signer - Process-wide Transaction Signing Key
//!
//! The only place the private key lives. It is held inside alloy's
//! `PrivateKeySigner`, never serialized and never logged; `Debug` prints
//! the address only.

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result};

/// Environment variable holding the hex private key.
pub const PRIVATE_KEY_ENV: &str = "PRIVATE_KEY";

/// Signing identity used for every transaction.
#[derive(Clone)]
pub struct TradeSigner {
    address: Address,
    wallet: EthereumWallet,
}

impl TradeSigner {
    /// Load the key from an environment variable.
    pub fn from_env(var_name: &str) -> Result<Self> {
        let key = std::env::var(var_name)
            .with_context(|| format!("{var_name} is not set; a signing key is required"))?;
        Self::from_hex(&key)
    }

    /// Parse a hex private key, with or without `0x`.
    pub fn from_hex(key_hex: &str) -> Result<Self> {
        let trimmed = key_hex.trim();
        let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        // Do not echo the input in the error.
        let signer: PrivateKeySigner = trimmed
            .parse()
            .map_err(|_| anyhow::anyhow!("private key is not a valid secp256k1 key"))?;
        let address = signer.address();
        Ok(Self {
            address,
            wallet: EthereumWallet::from(signer),
        })
    }

    pub const fn address(&self) -> Address {
        self.address
    }

    /// Wallet used to sign transaction requests.
    pub const fn wallet(&self) -> &EthereumWallet {
        &self.wallet
    }
}

impl std::fmt::Debug for TradeSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TradeSigner")
            .field("address", &self.address)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known development key; holds nothing.
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_derives_address() {
        let signer = TradeSigner::from_hex(DEV_KEY).unwrap();
        assert_eq!(
            format!("{:?}", signer.address()).to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_accepts_key_without_prefix() {
        let bare = DEV_KEY.trim_start_matches("0x");
        assert_eq!(
            TradeSigner::from_hex(bare).unwrap().address(),
            TradeSigner::from_hex(DEV_KEY).unwrap().address()
        );
    }

    #[test]
    fn test_debug_redacts_key() {
        let signer = TradeSigner::from_hex(DEV_KEY).unwrap();
        let debug = format!("{signer:?}");
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("ac0974bec39a17e3"));
    }

    #[test]
    fn test_rejects_garbage_without_echo() {
        let err = TradeSigner::from_hex("0xnot-a-key").unwrap_err();
        assert!(!err.to_string().contains("not-a-key"));
    }
}
