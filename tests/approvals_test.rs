//! Allowance manager tests.

mod common;

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use tokio_test::{assert_err, assert_ok};

use paloma_dex_agent::error::TradeError;
use paloma_dex_agent::ports::chain_client::ChainClient;
use paloma_dex_agent::usecases::approvals::{AllowanceManager, AllowanceStatus};
use paloma_dex_agent::usecases::confirmation::ConfirmationPoller;
use paloma_dex_agent::usecases::gas_estimator::GasEstimator;

use common::*;

fn manager(chain: &Arc<FakeChain>) -> AllowanceManager {
    let client: Arc<dyn ChainClient> = Arc::clone(chain) as Arc<dyn ChainClient>;
    let gas = GasEstimator::new(Arc::clone(&client));
    let poller = ConfirmationPoller::new(Arc::clone(&client), fast_settings().confirmation);
    AllowanceManager::new(client, gas, poller)
}

#[tokio::test]
async fn test_second_ensure_is_a_no_op() {
    let chain = Arc::new(FakeChain::new());
    let allowances = manager(&chain);
    let required = U256::from(100_000_000u64);

    let first = assert_ok!(
        allowances
            .ensure_allowance(CHAIN, USDC, ACCOUNT, STABLE_CONNECTOR, required)
            .await
    );
    assert!(matches!(first, AllowanceStatus::Approved { .. }));

    let second = allowances
        .ensure_allowance(CHAIN, USDC, ACCOUNT, STABLE_CONNECTOR, required)
        .await
        .unwrap();
    assert_eq!(second, AllowanceStatus::AlreadySufficient);

    assert_eq!(chain.sent().len(), 1);
    assert_eq!(
        allowances.get_allowance(CHAIN, USDC, ACCOUNT, STABLE_CONNECTOR).await.unwrap(),
        required
    );
}

#[tokio::test]
async fn test_larger_requirement_approves_exact_amount_again() {
    let chain = Arc::new(FakeChain::with(|s| {
        s.allowances.insert((USDC, STABLE_CONNECTOR), U256::from(10u64));
    }));
    let allowances = manager(&chain);

    let status = allowances
        .ensure_allowance(CHAIN, USDC, ACCOUNT, STABLE_CONNECTOR, U256::from(11u64))
        .await
        .unwrap();
    assert!(status.tx_hash().is_some());
    assert_eq!(
        allowances.get_allowance(CHAIN, USDC, ACCOUNT, STABLE_CONNECTOR).await.unwrap(),
        U256::from(11u64)
    );
}

#[tokio::test]
async fn test_reverted_approval_reports_reason() {
    let chain = Arc::new(FakeChain::with(|s| {
        s.approval_receipts = ReceiptMode::Revert;
        s.revert_reason = Some("token paused".into());
    }));
    let allowances = manager(&chain);

    let err = allowances
        .ensure_allowance(CHAIN, USDC, ACCOUNT, STABLE_CONNECTOR, U256::from(1u64))
        .await
        .unwrap_err();
    match err {
        TradeError::ApprovalRejected { reason, tx_hash } => {
            assert_eq!(reason, "token paused");
            assert!(tx_hash.is_some());
        }
        other => panic!("expected ApprovalRejected, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unconfirmed_approval_times_out() {
    let chain = Arc::new(FakeChain::with(|s| {
        s.approval_receipts = ReceiptMode::Pending;
    }));
    let allowances = manager(&chain);

    let err = assert_err!(
        allowances
            .ensure_allowance(CHAIN, USDC, ACCOUNT, STABLE_CONNECTOR, U256::from(1u64))
            .await
    );
    assert!(matches!(err, TradeError::ApprovalTimeout { .. }));
}

#[tokio::test]
async fn test_foreign_owner_cannot_be_approved_for() {
    let chain = Arc::new(FakeChain::new());
    let allowances = manager(&chain);

    let err = allowances
        .ensure_allowance(CHAIN, USDC, Address::repeat_byte(0x42), STABLE_CONNECTOR, U256::from(1u64))
        .await
        .unwrap_err();
    assert!(matches!(err, TradeError::ApprovalRejected { tx_hash: None, .. }));
    assert!(chain.sent().is_empty());
}
