//! Trade Requests, States and Outcomes
//!
//! A `TradeRequest` is built by the tool layer from caller arguments and
//! consumed by the orchestrator. Token and recipient fields stay as raw
//! strings until the orchestrator's validation stage so that every
//! malformed input is reported as a `Rejected` outcome, never a panic
//! or a transport error.

use std::fmt;

use alloy::primitives::{B256, Bytes, U256};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::amount::{Amount, serialize_raw_opt};
use super::chain::{ChainId, TokenCategory};

/// Direction of a trade relative to the protocol token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeDirection {
    /// Spend an input token to acquire a protocol token.
    Buy,
    /// Redeem a protocol token through its connector.
    Sell,
}

impl fmt::Display for TradeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// How the caller expressed the input amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmountSpec {
    /// Raw smallest units.
    Raw(U256),
    /// Human-readable decimal string, scaled by the token's decimals.
    Units(String),
}

/// A request to execute one trade.
#[derive(Debug, Clone)]
pub struct TradeRequest {
    /// Correlation id for logs.
    pub id: Uuid,
    pub chain_id: ChainId,
    pub direction: TradeDirection,
    /// Input token: `"native"` or an address.
    pub input_token: String,
    /// Output token (buys only).
    pub output_token: Option<String>,
    pub input_amount: AmountSpec,
    /// Explicit minimum output in raw units. Takes precedence over slippage.
    pub min_output: Option<U256>,
    /// Slippage tolerance in percent.
    pub slippage_percent: Decimal,
    /// Recipient of the output; defaults to the signer.
    pub recipient: Option<String>,
    /// On-chain deadline, also bounding the whole pipeline.
    pub deadline: DateTime<Utc>,
    /// Caller-supplied packed swap path (buys only).
    pub path: Option<Bytes>,
}

impl TradeRequest {
    /// A buy with default optional fields.
    pub fn buy(
        chain_id: ChainId,
        input_token: impl Into<String>,
        output_token: impl Into<String>,
        input_amount: AmountSpec,
        slippage_percent: Decimal,
        deadline: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            chain_id,
            direction: TradeDirection::Buy,
            input_token: input_token.into(),
            output_token: Some(output_token.into()),
            input_amount,
            min_output: None,
            slippage_percent,
            recipient: None,
            deadline,
            path: None,
        }
    }

    /// A sell with default optional fields.
    pub fn sell(
        chain_id: ChainId,
        token: impl Into<String>,
        amount: AmountSpec,
        deadline: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            chain_id,
            direction: TradeDirection::Sell,
            input_token: token.into(),
            output_token: None,
            input_amount: amount,
            min_output: None,
            slippage_percent: Decimal::ZERO,
            recipient: None,
            deadline,
            path: None,
        }
    }
}

/// Pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeState {
    Validating,
    PriceResolved,
    AllowanceEnsured,
    GasEstimated,
    Submitted,
    Confirmed,
}

impl fmt::Display for TradeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Validating => "validating",
            Self::PriceResolved => "price_resolved",
            Self::AllowanceEnsured => "allowance_ensured",
            Self::GasEstimated => "gas_estimated",
            Self::Submitted => "submitted",
            Self::Confirmed => "confirmed",
        };
        f.write_str(s)
    }
}

/// Why a request was refused before anything was broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    UnknownChain,
    ChainDegraded,
    InvalidAmount,
    InvalidSlippage,
    InvalidAddress,
    InvalidPath,
    DeadlineExpired,
    SameToken,
    InsufficientBalance,
}

/// Failure classes reported in `TradeOutcome::Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ChainUnreachable,
    ChainCallFailed,
    ApprovalRejected,
    ApprovalTimeout,
    NoRouteFound,
    PriceUnavailable,
    EstimationFailed,
    SubmissionFailed,
    Timeout,
    TimeoutAfterSubmission,
    OnChainRevert,
}

/// Result of a trade pipeline. Every request ends in exactly one of these.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TradeOutcome {
    Succeeded(TradeReceipt),
    Failed {
        trade_id: Uuid,
        kind: FailureKind,
        /// Stage that was running when the failure happened.
        stage: TradeState,
        reason: String,
        /// Present once the trade transaction has been broadcast.
        tx_hash: Option<B256>,
    },
    Rejected {
        trade_id: Uuid,
        reason: RejectReason,
        message: String,
    },
}

impl TradeOutcome {
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    /// Label used for metrics.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Succeeded(_) => "succeeded",
            Self::Failed { .. } => "failed",
            Self::Rejected { .. } => "rejected",
        }
    }

    pub const fn tx_hash(&self) -> Option<B256> {
        match self {
            Self::Succeeded(receipt) => Some(receipt.tx_hash),
            Self::Failed { tx_hash, .. } => *tx_hash,
            Self::Rejected { .. } => None,
        }
    }
}

/// Details of a confirmed trade.
#[derive(Debug, Clone, Serialize)]
pub struct TradeReceipt {
    pub trade_id: Uuid,
    pub chain_id: ChainId,
    pub direction: TradeDirection,
    pub category: TokenCategory,
    pub tx_hash: B256,
    pub explorer_url: String,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    /// Approval transaction issued for this trade, if one was needed.
    pub approval_tx_hash: Option<B256>,
    /// Amount spent, in input-token units.
    pub input_amount: Amount,
    /// Expected output before slippage, in raw output units.
    #[serde(serialize_with = "serialize_raw_opt")]
    pub quoted_output: Option<U256>,
    /// Minimum output enforced on-chain, in raw output units.
    #[serde(serialize_with = "serialize_raw_opt")]
    pub min_output: Option<U256>,
    /// Estimated value in USD at the pricing service's quote.
    pub estimated_value_usd: Option<Decimal>,
}
