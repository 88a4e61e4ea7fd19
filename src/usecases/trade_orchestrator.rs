//! Trade Orchestrator Use Case - The Trade Pipeline State Machine
//!
//! Drives one trade through
//! `Validating → PriceResolved → AllowanceEnsured → GasEstimated →
//! Submitted → Confirmed`, translating every failure into a structured
//! `TradeOutcome`. Every suspension point up to the broadcast is bounded
//! by the request deadline; once the trade transaction is out, a missed
//! deadline is reported with its hash. The trade transaction is
//! broadcast at most once, and never after a failed gas estimate.
//!
//! Contract selection goes through `ChainConfig::connector_for`; the
//! pipeline itself never branches on chain identity.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy::primitives::{Address, B256, Bytes, U256};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, instrument, warn};

use crate::domain::abi::{BasketBuy, ContractCall};
use crate::domain::amount::{Amount, AmountError, MAX_DECIMALS};
use crate::domain::chain::{ChainConfig, TokenCategory};
use crate::domain::path::SwapPath;
use crate::domain::registry::ChainRegistry;
use crate::domain::slippage::{convert_at_price, min_output, validate_slippage};
use crate::domain::token::{Token, TokenRef, parse_address};
use crate::domain::trade::{
  AmountSpec, FailureKind, RejectReason, TradeDirection, TradeOutcome, TradeReceipt, TradeRequest,
  TradeState,
};
use crate::error::{Result, TradeError};
use crate::ports::chain_client::ChainClient;

use super::account_lock::AccountLocks;
use super::approvals::AllowanceManager;
use super::balance_reader::BalanceReader;
use super::confirmation::{ConfirmationPolicy, ConfirmationPoller};
use super::gas_estimator::GasEstimator;
use super::price_resolver::{PriceResolver, deadline_seconds};

/// Tunables for the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorSettings {
  /// Retries for balance/metadata reads that fail with `ChainUnreachable`.
  pub read_retries: u32,
  /// Base delay between read retries (doubles each time).
  pub read_retry_delay: Duration,
  /// Receipt polling schedule for approvals and trades.
  pub confirmation: ConfirmationPolicy,
  /// Bound on replaying a reverted trade to recover its reason.
  pub revert_replay_timeout: Duration,
}

impl Default for OrchestratorSettings {
  fn default() -> Self {
    Self {
      read_retries: 3,
      read_retry_delay: Duration::from_millis(250),
      confirmation: ConfirmationPolicy::default(),
      revert_replay_timeout: Duration::from_secs(5),
    }
  }
}

/// Request fields after validation.
struct Validated<'a> {
  chain: &'a ChainConfig,
  input: TokenRef,
  /// The protocol token being bought or sold.
  protocol_token: Address,
  category: TokenCategory,
  account: Address,
  recipient: Address,
  path: Option<SwapPath>,
}

/// The trade call plus what is known about its expected output.
struct Plan {
  call: ContractCall,
  connector: Address,
  quoted_output: Option<U256>,
  min_output: Option<U256>,
  estimated_value_usd: Option<Decimal>,
}

/// Mutable progress shared between the pipeline and outcome reporting.
struct Progress {
  stage: TradeState,
  approval_tx: Option<B256>,
}

/// Executes trades end to end.
pub struct TradeOrchestrator {
  registry: Arc<ChainRegistry>,
  chain: Arc<dyn ChainClient>,
  balances: Arc<BalanceReader>,
  prices: Arc<PriceResolver>,
  allowances: AllowanceManager,
  gas: GasEstimator,
  poller: ConfirmationPoller,
  locks: AccountLocks,
  settings: OrchestratorSettings,
}

/// Run `fut` unless `deadline` passes first.
async fn before_deadline<T>(
  deadline: DateTime<Utc>,
  fut: impl Future<Output = Result<T>>,
) -> Result<T> {
  let remaining = (deadline - Utc::now())
    .to_std()
    .map_err(|_| TradeError::Timeout)?;
  timeout(remaining, fut).await.map_err(|_| TradeError::Timeout)?
}

fn reject(reason: RejectReason, message: impl Into<String>) -> TradeError {
  TradeError::rejected(reason, message)
}

impl TradeOrchestrator {
  pub fn new(
    registry: Arc<ChainRegistry>,
    chain: Arc<dyn ChainClient>,
    balances: Arc<BalanceReader>,
    prices: Arc<PriceResolver>,
    settings: OrchestratorSettings,
  ) -> Self {
    let gas = GasEstimator::new(Arc::clone(&chain));
    let poller = ConfirmationPoller::new(Arc::clone(&chain), settings.confirmation);
    let allowances = AllowanceManager::new(Arc::clone(&chain), gas.clone(), poller.clone());
    Self {
      registry,
      chain,
      balances,
      prices,
      allowances,
      gas,
      poller,
      locks: AccountLocks::new(),
      settings,
    }
  }

  /// Execute one trade. Never panics on bad input and never returns an
  /// error: every path ends in a `TradeOutcome`.
  #[instrument(skip(self, request), fields(trade_id = %request.id, chain_id = request.chain_id, direction = %request.direction))]
  pub async fn execute(&self, request: TradeRequest) -> TradeOutcome {
    let started = Instant::now();
    let mut progress = Progress {
      stage: TradeState::Validating,
      approval_tx: None,
    };

    info!("Trade started");
    let result = self.run(&request, &mut progress).await;
    let elapsed_ms = started.elapsed().as_millis();

    match result {
      Ok(receipt) => {
        info!(tx_hash = %receipt.tx_hash, gas_used = receipt.gas_used, elapsed_ms, "Trade confirmed");
        TradeOutcome::Succeeded(receipt)
      }
      Err(err) => {
        let rejection = match &err {
          TradeError::Rejected { reason, message } => Some((*reason, message.clone())),
          TradeError::UnknownChain(_) => Some((RejectReason::UnknownChain, err.to_string())),
          TradeError::InvalidAddress(m) => Some((RejectReason::InvalidAddress, m.clone())),
          _ => None,
        };
        if let Some((reason, message)) = rejection {
          warn!(reason = ?reason, message = %message, elapsed_ms, "Trade rejected");
          return TradeOutcome::Rejected {
            trade_id: request.id,
            reason,
            message,
          };
        }

        let kind = err.failure_kind().unwrap_or(FailureKind::ChainUnreachable);
        warn!(kind = ?kind, stage = %progress.stage, error = %err, elapsed_ms, "Trade failed");
        TradeOutcome::Failed {
          trade_id: request.id,
          kind,
          stage: progress.stage,
          reason: err.to_string(),
          tx_hash: err.tx_hash(),
        }
      }
    }
  }

  fn advance(progress: &mut Progress, next: TradeState) {
    info!(from = %progress.stage, to = %next, "Trade state transition");
    progress.stage = next;
  }

  async fn run(&self, req: &TradeRequest, progress: &mut Progress) -> Result<TradeReceipt> {
    // ── Validating ──────────────────────────────────────────
    let v = self.validate(req)?;
    let deadline = req.deadline;

    let _guard = before_deadline(deadline, async {
      Ok(self.locks.acquire(v.account, v.chain.chain_id).await)
    })
    .await?;

    let input_token = before_deadline(
      deadline,
      self.read_with_retry(|| self.balances.token_info(v.chain.chain_id, v.input)),
    )
    .await?;
    let amount = Self::resolve_amount(&req.input_amount, &input_token)?;

    let held = before_deadline(
      deadline,
      self.read_with_retry(|| self.balances.balance_of(v.chain.chain_id, v.input, v.account)),
    )
    .await?;
    if held.balance.raw() < amount.raw() {
      return Err(reject(
        RejectReason::InsufficientBalance,
        format!(
          "balance {} {} is below the requested {}",
          held.balance, input_token.symbol, amount
        ),
      ));
    }

    // ── PriceResolved ───────────────────────────────────────
    let plan = before_deadline(deadline, self.plan(req, &v, amount)).await?;
    Self::advance(progress, TradeState::PriceResolved);

    // ── AllowanceEnsured ────────────────────────────────────
    if let TokenRef::Contract(token) = v.input {
      let status = before_deadline(
        deadline,
        self.allowances.ensure_allowance(
          v.chain.chain_id,
          token,
          v.account,
          plan.connector,
          amount.raw(),
        ),
      )
      .await?;
      progress.approval_tx = status.tx_hash();
    }
    Self::advance(progress, TradeState::AllowanceEnsured);

    // ── GasEstimated ────────────────────────────────────────
    let fee = before_deadline(
      deadline,
      self.read_with_retry(|| self.gas.protocol_fee(v.chain.chain_id, plan.connector)),
    )
    .await?;
    let value = if v.input.is_native() {
      fee.saturating_add(amount.raw())
    } else {
      fee
    };
    let call = plan.call.with_value(value);
    let gas = before_deadline(deadline, self.gas.estimate(v.chain.chain_id, &call)).await?;
    Self::advance(progress, TradeState::GasEstimated);

    // ── Submitted ───────────────────────────────────────────
    // Last point where the deadline can stop the trade. The broadcast
    // runs to completion: the node may already hold the transaction.
    if Utc::now() >= deadline {
      return Err(TradeError::Timeout);
    }
    let tx_hash = self
      .chain
      .send_transaction(v.chain.chain_id, &call, gas.with_margin)
      .await
      .map_err(|e| TradeError::SubmissionFailed(e.to_string()))?;
    info!(
      tx_hash = %tx_hash,
      explorer = %v.chain.tx_url(&tx_hash.to_string()),
      gas_limit = gas.with_margin,
      value = %value,
      "Trade transaction broadcast"
    );
    Self::advance(progress, TradeState::Submitted);

    // ── Confirmed ───────────────────────────────────────────
    let receipt = before_deadline(deadline, async {
      Ok(self.poller.wait(v.chain.chain_id, tx_hash).await)
    })
    .await
    .map_err(|_| TradeError::TimeoutAfterSubmission { tx_hash })?
    .ok_or(TradeError::TimeoutAfterSubmission { tx_hash })?;

    if !receipt.success {
      let reason = match receipt.block_number {
        Some(block) => timeout(
          self.settings.revert_replay_timeout,
          self.chain.revert_reason(v.chain.chain_id, &call, block),
        )
        .await
        .unwrap_or_else(|_| {
          warn!(tx_hash = %tx_hash, "Revert replay timed out");
          None
        }),
        None => None,
      };
      return Err(TradeError::OnChainRevert { tx_hash, reason });
    }
    Self::advance(progress, TradeState::Confirmed);

    Ok(TradeReceipt {
      trade_id: req.id,
      chain_id: v.chain.chain_id,
      direction: req.direction,
      category: v.category,
      tx_hash,
      explorer_url: v.chain.tx_url(&tx_hash.to_string()),
      block_number: receipt.block_number,
      gas_used: receipt.gas_used,
      approval_tx_hash: progress.approval_tx,
      input_amount: amount,
      quoted_output: plan.quoted_output,
      min_output: plan.min_output,
      estimated_value_usd: plan.estimated_value_usd,
    })
  }

  /// Purely local checks. Nothing here touches the network.
  fn validate<'a>(&'a self, req: &TradeRequest) -> Result<Validated<'a>> {
    let chain = self.registry.resolve(req.chain_id).map_err(|_| {
      match self.registry.degraded_entry(req.chain_id) {
        Some(d) => reject(
          RejectReason::ChainDegraded,
          format!("chain {} is missing {}", d.chain_id, d.missing.join(", ")),
        ),
        None => reject(
          RejectReason::UnknownChain,
          format!("chain {} is not supported", req.chain_id),
        ),
      }
    })?;

    match &req.input_amount {
      AmountSpec::Raw(raw) if raw.is_zero() => {
        return Err(reject(RejectReason::InvalidAmount, "input amount must be greater than zero"));
      }
      AmountSpec::Units(units) => {
        // Syntax and sign only; precision and range depend on the token's decimals.
        match Amount::parse_positive_units(units, MAX_DECIMALS) {
          Ok(_) | Err(AmountError::TooPrecise { .. } | AmountError::Overflow) => {}
          Err(e) => return Err(reject(RejectReason::InvalidAmount, format!("'{units}': {e}"))),
        }
      }
      AmountSpec::Raw(_) => {}
    }

    validate_slippage(req.slippage_percent)
      .map_err(|e| reject(RejectReason::InvalidSlippage, e.to_string()))?;

    if req.deadline <= Utc::now() {
      return Err(reject(RejectReason::DeadlineExpired, "deadline is not in the future"));
    }

    let input = TokenRef::parse(&req.input_token)
      .map_err(|e| reject(RejectReason::InvalidAddress, format!("input token: {e}")))?;

    let (protocol_token, category) = match req.direction {
      TradeDirection::Buy => {
        let raw = req
          .output_token
          .as_deref()
          .ok_or_else(|| reject(RejectReason::InvalidAddress, "output token is required for a buy"))?;
        let output = parse_address(raw)
          .map_err(|e| reject(RejectReason::InvalidAddress, format!("output token: {e}")))?;
        if input == TokenRef::Contract(output) {
          return Err(reject(RejectReason::SameToken, "input and output token are the same"));
        }
        (output, chain.category_of(output))
      }
      TradeDirection::Sell => {
        let token = input
          .address()
          .ok_or_else(|| reject(RejectReason::InvalidAddress, "the native currency cannot be sold"))?;
        (token, chain.category_of(token))
      }
    };

    let account = self.chain.account();
    let recipient = match req.recipient.as_deref() {
      Some(raw) => parse_address(raw)
        .map_err(|e| reject(RejectReason::InvalidAddress, format!("recipient: {e}")))?,
      None => account,
    };
    // The stable connector always credits the sender.
    if category == TokenCategory::Stable && recipient != account {
      return Err(reject(
        RejectReason::InvalidAddress,
        "the stable-token connector only pays out to the signing account",
      ));
    }

    let path = match (&req.path, req.direction) {
      (Some(bytes), TradeDirection::Buy) => {
        let path = SwapPath::decode(bytes)
          .map_err(|e| reject(RejectReason::InvalidPath, e.to_string()))?;
        if path.last_token() != chain.contracts.stable_token {
          return Err(reject(
            RejectReason::InvalidPath,
            "path must end at the stable-value token",
          ));
        }
        Some(path)
      }
      (Some(_), TradeDirection::Sell) => {
        debug!("Path ignored for sells");
        None
      }
      (None, _) => None,
    };

    Ok(Validated {
      chain,
      input,
      protocol_token,
      category,
      account,
      recipient,
      path,
    })
  }

  fn resolve_amount(spec: &AmountSpec, token: &Token) -> Result<Amount> {
    match spec {
      AmountSpec::Raw(raw) => Ok(Amount::from_raw(*raw, token.decimals)),
      AmountSpec::Units(units) => Amount::parse_positive_units(units, token.decimals)
        .map_err(|e| reject(RejectReason::InvalidAmount, format!("{units} {}: {e}", token.symbol))),
    }
  }

  /// Retry a read on `ChainUnreachable` with exponential backoff.
  async fn read_with_retry<T, F, Fut>(&self, mut op: F) -> Result<T>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    let mut attempt = 0u32;
    loop {
      match op().await {
        Err(TradeError::ChainUnreachable(msg)) if attempt < self.settings.read_retries => {
          attempt += 1;
          let delay = self.settings.read_retry_delay * 2u32.pow(attempt - 1);
          warn!(attempt, delay_ms = delay.as_millis(), error = %msg, "Chain read failed, retrying");
          sleep(delay).await;
        }
        other => return other,
      }
    }
  }

  /// Route, price and build the trade call (PriceResolved).
  async fn plan(&self, req: &TradeRequest, v: &Validated<'_>, amount: Amount) -> Result<Plan> {
    let chain_id = v.chain.chain_id;
    let connector = v.chain.connector_for(v.category);
    let stable = v.chain.contracts.stable_token;

    match (req.direction, v.category) {
      (TradeDirection::Buy, TokenCategory::Stable) => {
        let (path, quoted, min) = self.stable_leg(req, v, amount.raw()).await?;
        let min = min.ok_or_else(|| TradeError::NoRouteFound("no minimum output available".into()))?;
        let stable_decimals = self
          .read_with_retry(|| self.balances.token_info(chain_id, TokenRef::Contract(stable)))
          .await?
          .decimals;
        Ok(Plan {
          call: ContractCall::stable_purchase(connector, path, amount.raw(), min),
          connector,
          quoted_output: quoted,
          min_output: Some(min),
          // Pegged to 1 USD.
          estimated_value_usd: Amount::from_raw(quoted.unwrap_or(min), stable_decimals).to_decimal(),
        })
      }

      (TradeDirection::Buy, TokenCategory::Basket) => {
        let price = self.prices.basket_price(v.chain, v.protocol_token).await?;

        let (path, usd_quoted, usd_min) = if v.input == TokenRef::Contract(stable) {
          (Bytes::new(), Some(amount.raw()), Some(amount.raw()))
        } else {
          self.stable_leg(req, v, amount.raw()).await?
        };
        let usd_min =
          usd_min.ok_or_else(|| TradeError::NoRouteFound("no stable-token amount available".into()))?;
        let usd_basis = usd_quoted.unwrap_or(usd_min);

        let stable_decimals = self
          .read_with_retry(|| self.balances.token_info(chain_id, TokenRef::Contract(stable)))
          .await?
          .decimals;
        let basket_decimals = self
          .read_with_retry(|| self.balances.token_info(chain_id, TokenRef::Contract(v.protocol_token)))
          .await?
          .decimals;

        let quoted_basket = convert_at_price(usd_basis, stable_decimals, basket_decimals, price.buy_price)
          .ok_or_else(|| TradeError::PriceUnavailable(format!("cannot convert at price {}", price.buy_price)))?;
        let min_basket = match req.min_output {
          Some(min) => min,
          None => min_output(quoted_basket, req.slippage_percent)
            .map_err(|e| reject(RejectReason::InvalidSlippage, e.to_string()))?,
        };

        info!(
          buy_price = %price.buy_price,
          usd_amount = %usd_min,
          quoted_basket = %quoted_basket,
          min_basket = %min_basket,
          "Basket buy priced"
        );

        Ok(Plan {
          call: ContractCall::basket_buy(
            connector,
            BasketBuy {
              basket_token: v.protocol_token,
              basket_amount: min_basket,
              usd_amount: usd_min,
              recipient: v.recipient,
              path,
              deadline: deadline_seconds(req.deadline),
            },
          ),
          connector,
          quoted_output: Some(quoted_basket),
          min_output: Some(min_basket),
          estimated_value_usd: Amount::from_raw(usd_basis, stable_decimals).to_decimal(),
        })
      }

      (TradeDirection::Sell, TokenCategory::Stable) => Ok(Plan {
        call: ContractCall::stable_withdraw(connector, amount.raw()),
        connector,
        quoted_output: None,
        min_output: None,
        estimated_value_usd: amount.to_decimal(),
      }),

      (TradeDirection::Sell, TokenCategory::Basket) => {
        // The connector prices the redemption itself; the quote is informational.
        let estimated_value_usd = match self.prices.basket_price(v.chain, v.protocol_token).await {
          Ok(price) => amount.to_decimal().map(|a| a * price.sell_price),
          Err(e) => {
            warn!(error = %e, "Sell price unavailable, continuing without estimate");
            None
          }
        };
        Ok(Plan {
          call: ContractCall::basket_sell(
            connector,
            v.protocol_token,
            amount.raw(),
            deadline_seconds(req.deadline),
            v.recipient,
          ),
          connector,
          quoted_output: None,
          min_output: None,
          estimated_value_usd,
        })
      }
    }
  }

  /// Input → stable-token leg: caller path or resolved route.
  /// Returns `(path, quoted, minimum)`.
  async fn stable_leg(
    &self,
    req: &TradeRequest,
    v: &Validated<'_>,
    amount_in: U256,
  ) -> Result<(Bytes, Option<U256>, Option<U256>)> {
    let chain_id = v.chain.chain_id;
    // For basket buys the explicit minimum bounds the basket amount, not this leg.
    let explicit_min = req.min_output.filter(|_| v.category == TokenCategory::Stable);

    if let Some(path) = &v.path {
      let quoted = match self.prices.quote_path(chain_id, path, amount_in).await {
        Ok(q) => Some(q),
        Err(e) if explicit_min.is_some() => {
          warn!(error = %e, "Caller path could not be quoted, relying on explicit minimum");
          None
        }
        Err(e) => return Err(e),
      };
      let min = match (explicit_min, quoted) {
        (Some(min), _) => Some(min),
        (None, Some(q)) => Some(
          min_output(q, req.slippage_percent)
            .map_err(|e| reject(RejectReason::InvalidSlippage, e.to_string()))?,
        ),
        (None, None) => None,
      };
      return Ok((path.encode(), quoted, min));
    }

    let resolved = self
      .prices
      .resolve_path(
        chain_id,
        v.input,
        v.chain.contracts.stable_token,
        amount_in,
        req.slippage_percent,
        explicit_min,
        req.deadline,
      )
      .await?;
    Ok((resolved.path, Some(resolved.quoted_output), Some(resolved.min_output)))
  }
}
