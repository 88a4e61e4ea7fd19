//! Integration Tests - Use Cases over Mocked Ports
//!
//! Tests the interaction between usecases, ports, and mock adapters.
//! Uses mockall for trait mocking and tokio::test for async tests.

mod common;

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, B256, U256};
use chrono::Utc;
use mockall::mock;
use mockall::predicate::*;
use rust_decimal_macros::dec;
use tokio::sync::broadcast;

use paloma_dex_agent::adapters::metrics::HealthState;
use paloma_dex_agent::domain::abi::ContractCall;
use paloma_dex_agent::domain::chain::ChainId;
use paloma_dex_agent::domain::trade::{AmountSpec, RejectReason, TradeOutcome, TradeRequest};
use paloma_dex_agent::ports::balance_index::{BalanceIndex, IndexedBalance};
use paloma_dex_agent::ports::chain_client::{ChainClient, ChainError, TokenMetadata, TxReceipt};
use paloma_dex_agent::usecases::{BalanceReader, PriceResolver, TradeOrchestrator};

use common::{ACCOUNT, CHAIN, FakePricing, FakeQuoter, STABLE, fast_settings, registry};

// ---- Mock Definitions ----

mock! {
    pub Chain {}

    #[async_trait::async_trait]
    impl ChainClient for Chain {
        fn account(&self) -> Address;
        async fn native_balance(&self, chain_id: ChainId, owner: Address) -> Result<U256, ChainError>;
        async fn token_balance(&self, chain_id: ChainId, token: Address, owner: Address)
            -> Result<U256, ChainError>;
        async fn token_metadata(&self, chain_id: ChainId, token: Address) -> Result<TokenMetadata, ChainError>;
        async fn allowance(&self, chain_id: ChainId, token: Address, owner: Address, spender: Address)
            -> Result<U256, ChainError>;
        async fn protocol_fee(&self, chain_id: ChainId, connector: Address) -> Result<U256, ChainError>;
        async fn estimate_gas(&self, chain_id: ChainId, call: &ContractCall) -> Result<u64, ChainError>;
        async fn send_transaction(&self, chain_id: ChainId, call: &ContractCall, gas_limit: u64)
            -> Result<B256, ChainError>;
        async fn transaction_receipt(&self, chain_id: ChainId, tx_hash: B256)
            -> Result<Option<TxReceipt>, ChainError>;
        async fn revert_reason(&self, chain_id: ChainId, call: &ContractCall, block_number: u64) -> Option<String>;
        async fn latest_block(&self, chain_id: ChainId) -> Result<u64, ChainError>;
        async fn is_healthy(&self, chain_id: ChainId) -> bool;
    }
}

mock! {
    pub Index {}

    #[async_trait::async_trait]
    impl BalanceIndex for Index {
        async fn native_balances(&self, owner: Address, chain_ids: &[ChainId])
            -> anyhow::Result<Vec<IndexedBalance>>;
    }
}

fn orchestrator(chain: MockChain) -> TradeOrchestrator {
    let registry = registry();
    let client: Arc<dyn ChainClient> = Arc::new(chain);
    let balances = Arc::new(BalanceReader::new(Arc::clone(&registry), Arc::clone(&client)));
    let prices = Arc::new(PriceResolver::new(
        Arc::clone(&registry),
        Arc::clone(&client),
        Arc::new(FakePricing::down()),
        Arc::new(FakeQuoter::dry()),
    ));
    TradeOrchestrator::new(registry, client, balances, prices, fast_settings())
}

// ---- Integration Tests ----

#[tokio::test]
async fn test_zero_amount_touches_no_chain() {
    // No expectations: any chain call would panic.
    let orch = orchestrator(MockChain::new());

    for amount in [AmountSpec::Raw(U256::ZERO), AmountSpec::Units("0.000".into()), AmountSpec::Units("-1".into())] {
        let request = TradeRequest::buy(
            CHAIN,
            "native",
            STABLE.to_string(),
            amount,
            dec!(1),
            Utc::now() + chrono::Duration::seconds(60),
        );
        match orch.execute(request).await {
            TradeOutcome::Rejected { reason, .. } => assert_eq!(reason, RejectReason::InvalidAmount),
            other => panic!("expected rejection, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_unknown_chain_touches_no_chain() {
    let orch = orchestrator(MockChain::new());
    let request = TradeRequest::sell(
        4242,
        STABLE.to_string(),
        AmountSpec::Units("1".into()),
        Utc::now() + chrono::Duration::seconds(60),
    );
    match orch.execute(request).await {
        TradeOutcome::Rejected { reason, .. } => assert_eq!(reason, RejectReason::UnknownChain),
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_balance_index_hit_skips_rpc() {
    let mut index = MockIndex::new();
    index
        .expect_native_balances()
        .with(eq(ACCOUNT), always())
        .times(1)
        .returning(|_, _| {
            Ok(vec![IndexedBalance {
                chain_id: CHAIN,
                native_raw: U256::from(5u64),
            }])
        });

    let mut chain = MockChain::new();
    chain.expect_native_balance().times(0);

    let reader = BalanceReader::new(registry(), Arc::new(chain)).with_index(Arc::new(index));
    let balances = reader.native_balances_all(ACCOUNT).await;

    assert_eq!(balances.len(), 1);
    assert_eq!(balances[0].native_balance.as_ref().unwrap().raw(), U256::from(5u64));
    assert!(balances[0].error.is_none());
}

#[tokio::test]
async fn test_balance_index_failure_falls_back_to_rpc() {
    let mut index = MockIndex::new();
    index
        .expect_native_balances()
        .returning(|_, _| Err(anyhow::anyhow!("index down")));

    let mut chain = MockChain::new();
    chain
        .expect_native_balance()
        .with(eq(CHAIN), eq(ACCOUNT))
        .times(1)
        .returning(|_, _| Ok(U256::from(7u64)));

    let reader = BalanceReader::new(registry(), Arc::new(chain)).with_index(Arc::new(index));
    let balances = reader.native_balances_all(ACCOUNT).await;
    assert_eq!(balances[0].native_balance.as_ref().unwrap().raw(), U256::from(7u64));
}

#[tokio::test]
async fn test_unreachable_chain_is_reported_per_chain() {
    let mut chain = MockChain::new();
    chain
        .expect_native_balance()
        .returning(|_, _| Err(ChainError::Unreachable("timeout".into())));

    let reader = BalanceReader::new(registry(), Arc::new(chain));
    let balances = reader.native_balances_all(ACCOUNT).await;
    assert!(balances[0].native_balance.is_none());
    assert!(balances[0].error.as_deref().unwrap().contains("timeout"));
}

#[tokio::test]
async fn test_health_monitor_tracks_chain_state() {
    let mut chain = MockChain::new();
    chain.expect_is_healthy().with(eq(CHAIN)).returning(|_| false);

    let health = Arc::new(HealthState::new());
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let task = tokio::spawn(Arc::clone(&health).monitor(
        Arc::new(chain),
        vec![CHAIN],
        None,
        Duration::from_millis(10),
        shutdown_rx,
    ));

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown_tx.send(()).unwrap();
    task.await.unwrap();

    assert_eq!(health.chains().get(&CHAIN), Some(&false));
    assert!(!health.is_ready());
}
