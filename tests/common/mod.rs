//! Shared fakes for the integration tests.
//!
//! `FakeChain` keeps balances, allowances and sent transactions in memory
//! so a whole trade pipeline can run without a node.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{Address, B256, Bytes, U256, address};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::{Value, json};

use paloma_dex_agent::domain::abi::{ContractCall, IERC20};
use paloma_dex_agent::domain::chain::{ChainConfig, ChainId};
use paloma_dex_agent::domain::registry::{ChainDeclaration, ChainRegistry};
use paloma_dex_agent::ports::chain_client::{ChainClient, ChainError, TokenMetadata, TxReceipt};
use paloma_dex_agent::ports::pricing::{BasketPrice, PricingError, PricingService, QuoteError, RouteQuoter};
use paloma_dex_agent::usecases::OrchestratorSettings;
use paloma_dex_agent::usecases::confirmation::ConfirmationPolicy;

pub const CHAIN: ChainId = 1;
pub const DEGRADED_CHAIN: ChainId = 10;

pub const ACCOUNT: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
pub const STABLE: Address = address!("5151515151515151515151515151515151515151");
pub const STABLE_CONNECTOR: Address = address!("c1c1c1c1c1c1c1c1c1c1c1c1c1c1c1c1c1c1c1c1");
pub const BASKET_CONNECTOR: Address = address!("c2c2c2c2c2c2c2c2c2c2c2c2c2c2c2c2c2c2c2c2");
pub const WETH: Address = address!("eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee");
pub const QUOTER: Address = address!("9999999999999999999999999999999999999999");
pub const USDC: Address = address!("0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c");
pub const BASKET: Address = address!("e1e1e1e1e1e1e1e1e1e1e1e1e1e1e1e1e1e1e1e1");

pub const FEE: u64 = 1_000;
pub const RAW_GAS: u64 = 90_000;

/// One usable chain and one missing its basket connector.
pub fn registry() -> Arc<ChainRegistry> {
    let usable = ChainDeclaration {
        chain_id: CHAIN,
        name: "Ethereum".into(),
        api_name: "ethereum".into(),
        rpc_url: "http://127.0.0.1:8545".into(),
        explorer_url: "https://etherscan.io".into(),
        native_name: "Ether".into(),
        native_symbol: "ETH".into(),
        native_decimals: 18,
        fallback_gas_price_gwei: 30,
        stable_token: Some(STABLE.to_string()),
        stable_connector: Some(STABLE_CONNECTOR.to_string()),
        basket_connector: Some(BASKET_CONNECTOR.to_string()),
        wrapped_native: Some(WETH.to_string()),
        quoter: Some(QUOTER.to_string()),
    };
    let degraded = ChainDeclaration {
        chain_id: DEGRADED_CHAIN,
        name: "Optimism".into(),
        basket_connector: None,
        ..usable.clone()
    };
    Arc::new(ChainRegistry::from_declarations(vec![usable, degraded]).unwrap())
}

pub fn chain_config() -> ChainConfig {
    registry().resolve(CHAIN).unwrap().clone()
}

/// Fast polling so confirmation timeouts finish in milliseconds.
pub fn fast_settings() -> OrchestratorSettings {
    OrchestratorSettings {
        read_retries: 2,
        read_retry_delay: Duration::from_millis(1),
        confirmation: ConfirmationPolicy {
            max_attempts: 3,
            interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(5),
        },
        revert_replay_timeout: Duration::from_millis(20),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptMode {
    Success,
    Revert,
    Pending,
}

pub struct ChainState {
    pub native: HashMap<Address, U256>,
    /// `(token, owner)` balances.
    pub tokens: HashMap<(Address, Address), U256>,
    pub metadata: HashMap<Address, TokenMetadata>,
    /// `(token, spender)` allowances granted by the account.
    pub allowances: HashMap<(Address, Address), U256>,
    pub fee: U256,
    pub estimate_error: Option<ChainError>,
    pub trade_receipts: ReceiptMode,
    pub approval_receipts: ReceiptMode,
    pub revert_reason: Option<String>,
    pub sent: Vec<ContractCall>,
    pub gas_limits: Vec<u64>,
    pub estimates: usize,
    pub unreachable_reads: usize,
    pub metadata_reads: usize,
    pub estimate_delay: Option<Duration>,
    pub send_delay: Option<Duration>,
    pub send_error: Option<ChainError>,
    pub send_attempts: usize,
    pub revert_delay: Option<Duration>,
    /// Order of estimate / send / receipt events across trades.
    pub events: Vec<&'static str>,
}

impl Default for ChainState {
    fn default() -> Self {
        let mut metadata = HashMap::new();
        metadata.insert(STABLE, TokenMetadata { symbol: "pUSD".into(), decimals: 6 });
        metadata.insert(USDC, TokenMetadata { symbol: "USDC".into(), decimals: 6 });
        metadata.insert(BASKET, TokenMetadata { symbol: "IDX".into(), decimals: 18 });
        Self {
            native: HashMap::new(),
            tokens: HashMap::new(),
            metadata,
            allowances: HashMap::new(),
            fee: U256::from(FEE),
            estimate_error: None,
            trade_receipts: ReceiptMode::Success,
            approval_receipts: ReceiptMode::Success,
            revert_reason: None,
            sent: Vec::new(),
            gas_limits: Vec::new(),
            estimates: 0,
            unreachable_reads: 0,
            metadata_reads: 0,
            estimate_delay: None,
            send_delay: None,
            send_error: None,
            send_attempts: 0,
            revert_delay: None,
            events: Vec::new(),
        }
    }
}

/// In-memory chain bound to `ACCOUNT`.
#[derive(Default)]
pub struct FakeChain {
    pub state: Mutex<ChainState>,
}

impl FakeChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(f: impl FnOnce(&mut ChainState)) -> Self {
        let chain = Self::new();
        f(&mut chain.state.lock().unwrap());
        chain
    }

    pub fn sent(&self) -> Vec<ContractCall> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn gas_limits(&self) -> Vec<u64> {
        self.state.lock().unwrap().gas_limits.clone()
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().events.clone()
    }

    fn hash_for(index: usize) -> B256 {
        B256::with_last_byte(u8::try_from(index + 1).unwrap())
    }

    fn fail_read(&self) -> Result<(), ChainError> {
        let mut state = self.state.lock().unwrap();
        if state.unreachable_reads > 0 {
            state.unreachable_reads -= 1;
            return Err(ChainError::Unreachable("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ChainClient for FakeChain {
    fn account(&self) -> Address {
        ACCOUNT
    }

    async fn native_balance(&self, _chain_id: ChainId, owner: Address) -> Result<U256, ChainError> {
        self.fail_read()?;
        Ok(self.state.lock().unwrap().native.get(&owner).copied().unwrap_or_default())
    }

    async fn token_balance(&self, _chain_id: ChainId, token: Address, owner: Address) -> Result<U256, ChainError> {
        self.fail_read()?;
        Ok(self.state.lock().unwrap().tokens.get(&(token, owner)).copied().unwrap_or_default())
    }

    async fn token_metadata(&self, _chain_id: ChainId, token: Address) -> Result<TokenMetadata, ChainError> {
        self.fail_read()?;
        let mut state = self.state.lock().unwrap();
        state.metadata_reads += 1;
        state
            .metadata
            .get(&token)
            .cloned()
            .ok_or_else(|| ChainError::Rpc(format!("{token} is not a token")))
    }

    async fn allowance(
        &self,
        _chain_id: ChainId,
        token: Address,
        _owner: Address,
        spender: Address,
    ) -> Result<U256, ChainError> {
        Ok(self.state.lock().unwrap().allowances.get(&(token, spender)).copied().unwrap_or_default())
    }

    async fn protocol_fee(&self, _chain_id: ChainId, _connector: Address) -> Result<U256, ChainError> {
        Ok(self.state.lock().unwrap().fee)
    }

    async fn estimate_gas(&self, _chain_id: ChainId, call: &ContractCall) -> Result<u64, ChainError> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.estimates += 1;
            if call.label != "approve" {
                state.events.push("estimate");
            }
            state.estimate_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match &self.state.lock().unwrap().estimate_error {
            Some(e) => Err(e.clone()),
            None => Ok(RAW_GAS),
        }
    }

    async fn send_transaction(&self, _chain_id: ChainId, call: &ContractCall, gas_limit: u64) -> Result<B256, ChainError> {
        let (result, delay) = {
            let mut state = self.state.lock().unwrap();
            state.send_attempts += 1;
            if let Some(e) = state.send_error.clone() {
                return Err(e);
            }
            state.sent.push(call.clone());
            state.gas_limits.push(gas_limit);
            if call.label != "approve" {
                state.events.push("send");
            }
            (Self::hash_for(state.sent.len() - 1), state.send_delay)
        };
        // The node already holds the transaction while the reply is slow.
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(result)
    }

    async fn transaction_receipt(&self, _chain_id: ChainId, tx_hash: B256) -> Result<Option<TxReceipt>, ChainError> {
        let mut state = self.state.lock().unwrap();
        let Some(index) = (0..state.sent.len()).find(|i| Self::hash_for(*i) == tx_hash) else {
            return Ok(None);
        };
        let call = state.sent[index].clone();
        let mode = if call.label == "approve" {
            state.approval_receipts
        } else {
            state.trade_receipts
        };
        let success = match mode {
            ReceiptMode::Pending => return Ok(None),
            ReceiptMode::Success => true,
            ReceiptMode::Revert => false,
        };
        if call.label != "approve" {
            state.events.push("receipt");
        }
        if success && call.label == "approve" {
            let approve = IERC20::approveCall::abi_decode(&call.data, true).unwrap();
            state.allowances.insert((call.to, approve.spender), approve.amount);
        }
        Ok(Some(TxReceipt {
            tx_hash,
            success,
            block_number: Some(100 + index as u64),
            gas_used: 70_000,
        }))
    }

    async fn revert_reason(&self, _chain_id: ChainId, _call: &ContractCall, _block_number: u64) -> Option<String> {
        let delay = self.state.lock().unwrap().revert_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.state.lock().unwrap().revert_reason.clone()
    }

    async fn latest_block(&self, _chain_id: ChainId) -> Result<u64, ChainError> {
        Ok(19_000_000)
    }

    async fn is_healthy(&self, _chain_id: ChainId) -> bool {
        true
    }
}

/// Pricing service with a fixed basket price.
pub struct FakePricing {
    pub price: Option<BasketPrice>,
}

impl FakePricing {
    pub fn at(buy: Decimal, sell: Decimal) -> Self {
        Self {
            price: Some(BasketPrice { buy_price: buy, sell_price: sell }),
        }
    }

    pub fn down() -> Self {
        Self { price: None }
    }
}

#[async_trait]
impl PricingService for FakePricing {
    async fn basket_price(&self, _chain: &ChainConfig, token: Address) -> Result<BasketPrice, PricingError> {
        match &self.price {
            Some(price) if token == BASKET => Ok(price.clone()),
            Some(_) => Err(PricingError::NotFound(token)),
            None => Err(PricingError::Unavailable("503 from pricing service".into())),
        }
    }

    async fn list_baskets(&self, chain: &ChainConfig) -> Result<Value, PricingError> {
        Ok(json!([{ "symbol": "IDX", "address": BASKET, "chain": chain.api_name }]))
    }
}

/// Quoter returning the same output for every path it is asked about.
#[derive(Default)]
pub struct FakeQuoter {
    pub output: Option<U256>,
    pub quoted: Mutex<Vec<Bytes>>,
}

impl FakeQuoter {
    pub fn returning(output: u64) -> Self {
        Self {
            output: Some(U256::from(output)),
            quoted: Mutex::new(Vec::new()),
        }
    }

    pub fn dry() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RouteQuoter for FakeQuoter {
    async fn quote_exact_input(&self, _chain: &ChainConfig, path: &Bytes, _amount_in: U256) -> Result<U256, QuoteError> {
        self.quoted.lock().unwrap().push(path.clone());
        self.output.ok_or_else(|| QuoteError::NoLiquidity("no pool".into()))
    }
}
