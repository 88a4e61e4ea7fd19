//! Tokens and Address Validation
//!
//! Addresses arrive as strings from tool callers. They are parsed into
//! 20-byte values up front, which makes every later comparison
//! case-insensitive. Mixed-case input must carry a valid EIP-55
//! checksum; all-lower or all-upper hex is accepted as-is.

use std::fmt;

use alloy::primitives::Address;
use serde::Serialize;
use thiserror::Error;

use super::chain::ChainId;

/// Keyword accepted wherever a token address is expected to mean the
/// chain's native currency.
pub const NATIVE_KEYWORD: &str = "native";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("'{0}' is not a 20-byte hex address")]
    Malformed(String),
    #[error("'{0}' has an invalid EIP-55 checksum")]
    BadChecksum(String),
}

/// Parse and validate an EVM address string.
pub fn parse_address(input: &str) -> Result<Address, AddressError> {
    let s = input.trim();
    let hex = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or_else(|| AddressError::Malformed(s.to_string()))?;
    if hex.len() != 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(AddressError::Malformed(s.to_string()));
    }

    let has_lower = hex.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = hex.bytes().any(|b| b.is_ascii_uppercase());
    if has_lower && has_upper {
        let candidate = format!("0x{hex}");
        return Address::parse_checksummed(&candidate, None)
            .map_err(|_| AddressError::BadChecksum(s.to_string()));
    }

    hex.parse::<Address>()
        .map_err(|_| AddressError::Malformed(s.to_string()))
}

/// A token reference supplied by a caller: the native currency or an
/// ERC-20 contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenRef {
    Native,
    Contract(Address),
}

impl TokenRef {
    /// Parse `"native"` (any case) or an address.
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        if input.trim().eq_ignore_ascii_case(NATIVE_KEYWORD) {
            return Ok(Self::Native);
        }
        parse_address(input).map(Self::Contract)
    }

    pub const fn address(&self) -> Option<Address> {
        match self {
            Self::Native => None,
            Self::Contract(addr) => Some(*addr),
        }
    }

    pub const fn is_native(&self) -> bool {
        matches!(self, Self::Native)
    }
}

impl fmt::Display for TokenRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => f.write_str(NATIVE_KEYWORD),
            Self::Contract(addr) => write!(f, "{addr}"),
        }
    }
}

/// A token resolved on a specific chain.
#[derive(Debug, Clone, Serialize)]
pub struct Token {
    /// Chain the token lives on.
    pub chain_id: ChainId,
    /// Contract address; `None` for the native currency.
    pub address: Option<Address>,
    /// Ticker symbol as reported by the contract (or the chain config).
    pub symbol: String,
    /// Number of decimals in the smallest unit.
    pub decimals: u8,
}

impl Token {
    pub fn native(chain_id: ChainId, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            chain_id,
            address: None,
            symbol: symbol.into(),
            decimals,
        }
    }

    pub const fn is_native(&self) -> bool {
        self.address.is_none()
    }

    pub const fn token_ref(&self) -> TokenRef {
        match self.address {
            Some(addr) => TokenRef::Contract(addr),
            None => TokenRef::Native,
        }
    }
}

// Symbol and decimals are descriptive; identity is chain + address.
impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.chain_id == other.chain_id && self.address == other.address
    }
}

impl Eq for Token {}

#[cfg(test)]
mod tests {
    use super::*;

    const WETH_LOWER: &str = "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2";
    const WETH_CHECKSUM: &str = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2";

    #[test]
    fn test_parse_lower_and_checksummed_agree() {
        let a = parse_address(WETH_LOWER).unwrap();
        let b = parse_address(WETH_CHECKSUM).unwrap();
        let c = parse_address(&WETH_LOWER.to_uppercase().replacen("0X", "0x", 1)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_parse_rejects_bad_checksum() {
        // Flip the case of one letter in a checksummed address.
        let bad = WETH_CHECKSUM.replacen("C02aaA", "C02AaA", 1);
        assert!(matches!(parse_address(&bad), Err(AddressError::BadChecksum(_))));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_address("0x1234").is_err());
        assert!(parse_address("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2").is_err());
        assert!(parse_address("0xzz2aaa39b223fe8d0a0e5c4f27ead9083c756cc2").is_err());
    }

    #[test]
    fn test_token_ref_native_keyword() {
        assert_eq!(TokenRef::parse("NATIVE").unwrap(), TokenRef::Native);
        assert!(TokenRef::parse(WETH_LOWER).unwrap().address().is_some());
    }

    #[test]
    fn test_token_equality_ignores_symbol_and_case() {
        let a = Token {
            chain_id: 1,
            address: Some(parse_address(WETH_LOWER).unwrap()),
            symbol: "WETH".into(),
            decimals: 18,
        };
        let b = Token {
            chain_id: 1,
            address: Some(parse_address(WETH_CHECKSUM).unwrap()),
            symbol: "weth".into(),
            decimals: 18,
        };
        let other_chain = Token { chain_id: 10, ..b.clone() };
        assert_eq!(a, b);
        assert_ne!(a, other_chain);
    }
}
