//! Error types for the trade execution engine

use alloy::primitives::B256;
use thiserror::Error;

use crate::domain::chain::ChainId;
use crate::domain::trade::{FailureKind, RejectReason};
use crate::ports::chain_client::ChainError;

/// Every failure a use case can report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TradeError {
    #[error("rejected ({reason:?}): {message}")]
    Rejected {
        reason: RejectReason,
        message: String,
    },

    #[error("unknown chain id {0}")]
    UnknownChain(ChainId),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("chain unreachable: {0}")]
    ChainUnreachable(String),

    /// The node answered but refused the call; retrying will not help.
    #[error("chain call failed: {0}")]
    ChainCallFailed(String),

    #[error("approval rejected: {reason}")]
    ApprovalRejected {
        reason: String,
        tx_hash: Option<B256>,
    },

    #[error("approval {tx_hash} not confirmed in time")]
    ApprovalTimeout { tx_hash: B256 },

    #[error("no route found: {0}")]
    NoRouteFound(String),

    #[error("price unavailable: {0}")]
    PriceUnavailable(String),

    #[error("gas estimation failed: {}", reason.as_deref().unwrap_or(message.as_str()))]
    EstimationFailed {
        /// Decoded revert reason, when the node returned one.
        reason: Option<String>,
        message: String,
    },

    #[error("submission failed: {0}")]
    SubmissionFailed(String),

    #[error("deadline passed before submission")]
    Timeout,

    #[error("deadline passed waiting for {tx_hash}")]
    TimeoutAfterSubmission { tx_hash: B256 },

    #[error("transaction {tx_hash} reverted: {}", reason.as_deref().unwrap_or("no reason"))]
    OnChainRevert {
        tx_hash: B256,
        reason: Option<String>,
    },
}

pub type Result<T> = std::result::Result<T, TradeError>;

impl TradeError {
    pub fn rejected(reason: RejectReason, message: impl Into<String>) -> Self {
        Self::Rejected {
            reason,
            message: message.into(),
        }
    }

    /// Failure class for errors that are not rejections.
    pub const fn failure_kind(&self) -> Option<FailureKind> {
        let kind = match self {
            Self::Rejected { .. } | Self::UnknownChain(_) | Self::InvalidAddress(_) => {
                return None;
            }
            Self::ChainUnreachable(_) => FailureKind::ChainUnreachable,
            Self::ChainCallFailed(_) => FailureKind::ChainCallFailed,
            Self::ApprovalRejected { .. } => FailureKind::ApprovalRejected,
            Self::ApprovalTimeout { .. } => FailureKind::ApprovalTimeout,
            Self::NoRouteFound(_) => FailureKind::NoRouteFound,
            Self::PriceUnavailable(_) => FailureKind::PriceUnavailable,
            Self::EstimationFailed { .. } => FailureKind::EstimationFailed,
            Self::SubmissionFailed(_) => FailureKind::SubmissionFailed,
            Self::Timeout => FailureKind::Timeout,
            Self::TimeoutAfterSubmission { .. } => FailureKind::TimeoutAfterSubmission,
            Self::OnChainRevert { .. } => FailureKind::OnChainRevert,
        };
        Some(kind)
    }

    /// Short machine-readable name, used by the tool layer.
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Rejected { .. } => "rejected",
            Self::UnknownChain(_) => "unknown_chain",
            Self::InvalidAddress(_) => "invalid_address",
            Self::ChainUnreachable(_) => "chain_unreachable",
            Self::ChainCallFailed(_) => "chain_call_failed",
            Self::ApprovalRejected { .. } => "approval_rejected",
            Self::ApprovalTimeout { .. } => "approval_timeout",
            Self::NoRouteFound(_) => "no_route_found",
            Self::PriceUnavailable(_) => "price_unavailable",
            Self::EstimationFailed { .. } => "estimation_failed",
            Self::SubmissionFailed(_) => "submission_failed",
            Self::Timeout => "timeout",
            Self::TimeoutAfterSubmission { .. } => "timeout_after_submission",
            Self::OnChainRevert { .. } => "on_chain_revert",
        }
    }

    /// Hash of a transaction that was already broadcast, if any.
    pub const fn tx_hash(&self) -> Option<B256> {
        match self {
            Self::ApprovalRejected { tx_hash, .. } => *tx_hash,
            Self::ApprovalTimeout { tx_hash }
            | Self::TimeoutAfterSubmission { tx_hash }
            | Self::OnChainRevert { tx_hash, .. } => Some(*tx_hash),
            _ => None,
        }
    }
}

/// Only transport-level errors are worth retrying.
impl From<ChainError> for TradeError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::NoProvider(_) | ChainError::Unreachable(_) => {
                Self::ChainUnreachable(err.to_string())
            }
            ChainError::Reverted { .. } | ChainError::Rpc(_) | ChainError::Signing(_) => {
                Self::ChainCallFailed(err.to_string())
            }
        }
    }
}
