//! Swap Paths - Uniswap V3 Packed Encoding
//!
//! A path is `token (20 bytes) | fee (3 bytes) | token | fee | ... | token`.
//! The connectors and the QuoterV2 both consume this encoding.

use alloy::primitives::{Address, Bytes};
use thiserror::Error;

/// Pool fee tiers tried for direct routes (hundredths of a basis point).
pub const DIRECT_FEE_TIERS: [u32; 4] = [100, 500, 3_000, 10_000];

/// Fee tiers tried for each hop of a route through the wrapped native token.
pub const HOP_FEE_TIERS: [u32; 2] = [500, 3_000];

const ADDRESS_LEN: usize = 20;
const FEE_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("a path needs at least two tokens")]
    TooShort,
    #[error("path has {tokens} tokens but {fees} fees")]
    FeeCountMismatch { tokens: usize, fees: usize },
    #[error("fee {0} does not fit in 24 bits")]
    FeeTooLarge(u32),
    #[error("encoded path has invalid length {0}")]
    BadLength(usize),
}

/// A decoded multi-hop route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapPath {
    tokens: Vec<Address>,
    fees: Vec<u32>,
}

impl SwapPath {
    pub fn new(tokens: Vec<Address>, fees: Vec<u32>) -> Result<Self, PathError> {
        if tokens.len() < 2 {
            return Err(PathError::TooShort);
        }
        if fees.len() + 1 != tokens.len() {
            return Err(PathError::FeeCountMismatch {
                tokens: tokens.len(),
                fees: fees.len(),
            });
        }
        if let Some(fee) = fees.iter().find(|f| **f > 0x00FF_FFFF) {
            return Err(PathError::FeeTooLarge(*fee));
        }
        Ok(Self { tokens, fees })
    }

    /// Single-pool route.
    pub fn direct(from: Address, to: Address, fee: u32) -> Result<Self, PathError> {
        Self::new(vec![from, to], vec![fee])
    }

    /// Decode a packed path.
    pub fn decode(encoded: &[u8]) -> Result<Self, PathError> {
        let len = encoded.len();
        if len < 2 * ADDRESS_LEN + FEE_LEN || (len - ADDRESS_LEN) % (ADDRESS_LEN + FEE_LEN) != 0 {
            return Err(PathError::BadLength(len));
        }
        let hops = (len - ADDRESS_LEN) / (ADDRESS_LEN + FEE_LEN);
        let mut tokens = Vec::with_capacity(hops + 1);
        let mut fees = Vec::with_capacity(hops);

        let mut offset = 0;
        for _ in 0..hops {
            tokens.push(Address::from_slice(&encoded[offset..offset + ADDRESS_LEN]));
            offset += ADDRESS_LEN;
            let fee = &encoded[offset..offset + FEE_LEN];
            fees.push(u32::from_be_bytes([0, fee[0], fee[1], fee[2]]));
            offset += FEE_LEN;
        }
        tokens.push(Address::from_slice(&encoded[offset..offset + ADDRESS_LEN]));

        Self::new(tokens, fees)
    }

    /// Packed encoding.
    pub fn encode(&self) -> Bytes {
        let mut out =
            Vec::with_capacity(self.tokens.len() * ADDRESS_LEN + self.fees.len() * FEE_LEN);
        for (i, token) in self.tokens.iter().enumerate() {
            out.extend_from_slice(token.as_slice());
            if let Some(fee) = self.fees.get(i) {
                out.extend_from_slice(&fee.to_be_bytes()[1..]);
            }
        }
        Bytes::from(out)
    }

    pub fn first_token(&self) -> Address {
        self.tokens[0]
    }

    pub fn last_token(&self) -> Address {
        self.tokens[self.tokens.len() - 1]
    }

    pub fn tokens(&self) -> &[Address] {
        &self.tokens
    }

    pub fn fees(&self) -> &[u32] {
        &self.fees
    }

    pub fn hops(&self) -> usize {
        self.fees.len()
    }
}

/// Candidate routes from `from` to `to`: every direct fee tier, then
/// two-hop routes through `via` when it differs from both ends.
pub fn candidate_paths(from: Address, to: Address, via: Option<Address>) -> Vec<SwapPath> {
    let mut out = Vec::new();
    if from == to {
        return out;
    }
    for fee in DIRECT_FEE_TIERS {
        if let Ok(path) = SwapPath::direct(from, to, fee) {
            out.push(path);
        }
    }
    if let Some(mid) = via.filter(|m| *m != from && *m != to) {
        for fee_in in HOP_FEE_TIERS {
            for fee_out in HOP_FEE_TIERS {
                if let Ok(path) = SwapPath::new(vec![from, mid, to], vec![fee_in, fee_out]) {
                    out.push(path);
                }
            }
        }
    }
    out
}
