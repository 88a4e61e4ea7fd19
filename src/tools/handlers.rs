//! Tool Handlers - One Function per Tool
//!
//! Each handler decodes its typed arguments, calls into the use cases
//! and returns a JSON value. Read tools surface failures as `ToolError`;
//! the trade tools always produce a `TradeOutcome`.

use std::str::FromStr;
use std::time::Instant;

use alloy::primitives::{Address, Bytes, U256};
use futures_util::future::{BoxFuture, FutureExt, join_all};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::chain::{ChainConfig, ChainId, ChainSummary};
use crate::domain::token::{TokenRef, parse_address};
use crate::domain::trade::{AmountSpec, RejectReason, TradeDirection, TradeOutcome, TradeRequest};
use crate::error::TradeError;

use super::args::{
  AddressArgs, BalanceArgs, BasketPriceArgs, BuyArgs, ChainArgs, NoArgs, SellArgs,
};
use super::context::ToolContext;
use super::{ToolError, ToolResult, catalogue, decode};

fn to_json<T: Serialize>(value: &T) -> ToolResult {
  serde_json::to_value(value).map_err(|e| ToolError::new("internal", e.to_string()))
}

/// Usable chain, or a tool error naming why it is not.
fn chain_or_error(ctx: &ToolContext, chain_id: ChainId) -> Result<&ChainConfig, ToolError> {
  ctx.registry.resolve(chain_id).map_err(|_| {
    match ctx.registry.degraded_entry(chain_id) {
      Some(d) => ToolError::new(
        "chain_degraded",
        format!("chain {chain_id} is missing {}", d.missing.join(", ")),
      ),
      None => ToolError::from(TradeError::UnknownChain(chain_id)),
    }
  })
}

fn address_arg(field: &str, value: &str) -> Result<Address, ToolError> {
  parse_address(value).map_err(|e| ToolError::new("invalid_address", format!("{field}: {e}")))
}

pub fn get_account_info(ctx: &ToolContext, args: Value) -> BoxFuture<'_, ToolResult> {
  async move {
    let _: NoArgs = decode(args)?;
    let address = ctx.chain.account();
    let chains = ctx.balances.native_balances_all(address).await;
    Ok(json!({
      "address": address,
      "chains": to_json(&chains)?,
      "degraded_chains": to_json(&ctx.registry.degraded())?,
    }))
  }
  .boxed()
}

pub fn get_balance(ctx: &ToolContext, args: Value) -> BoxFuture<'_, ToolResult> {
  async move {
    let args: BalanceArgs = decode(args)?;
    chain_or_error(ctx, args.chain_id)?;

    let token = match args.token_address.as_deref() {
      Some(raw) => TokenRef::parse(raw)
        .map_err(|e| ToolError::new("invalid_address", format!("token_address: {e}")))?,
      None => TokenRef::Native,
    };
    let owner = match args.wallet_address.as_deref() {
      Some(raw) => address_arg("wallet_address", raw)?,
      None => ctx.chain.account(),
    };

    let balance = ctx.balances.balance_of(args.chain_id, token, owner).await?;
    let mut value = to_json(&balance)?;
    value["chain_id"] = json!(args.chain_id);
    Ok(value)
  }
  .boxed()
}

pub fn get_chain_info(ctx: &ToolContext, args: Value) -> BoxFuture<'_, ToolResult> {
  async move {
    let args: ChainArgs = decode(args)?;

    if let Some(degraded) = ctx.registry.degraded_entry(args.chain_id) {
      return Ok(json!({
        "chain_id": degraded.chain_id,
        "name": degraded.name,
        "status": "degraded",
        "missing": degraded.missing,
      }));
    }

    let chain = chain_or_error(ctx, args.chain_id)?;
    let mut value = to_json(&ChainSummary::from(chain))?;
    match ctx.chain.latest_block(chain.chain_id).await {
      Ok(block) => {
        value["status"] = json!("connected");
        value["latest_block"] = json!(block);
      }
      Err(e) => {
        value["status"] = json!("unreachable");
        value["error"] = json!(e.to_string());
      }
    }
    Ok(value)
  }
  .boxed()
}

pub fn list_supported_chains(ctx: &ToolContext, args: Value) -> BoxFuture<'_, ToolResult> {
  async move {
    let _: NoArgs = decode(args)?;
    let chains: Vec<ChainSummary> = ctx.registry.list().iter().map(ChainSummary::from).collect();
    Ok(json!({
      "chains": to_json(&chains)?,
      "degraded_chains": to_json(&ctx.registry.degraded())?,
    }))
  }
  .boxed()
}

pub fn get_address_balances(ctx: &ToolContext, args: Value) -> BoxFuture<'_, ToolResult> {
  async move {
    let args: AddressArgs = decode(args)?;
    let owner = address_arg("address", &args.address)?;

    let native = ctx.balances.native_balances_all(owner).await;
    let stable = join_all(ctx.registry.list().iter().map(|chain| {
      let token = TokenRef::Contract(chain.contracts.stable_token);
      async move { ctx.balances.balance_of(chain.chain_id, token, owner).await }
    }))
    .await;

    let chains: Vec<Value> = native
      .into_iter()
      .zip(stable)
      .map(|(native, stable)| {
        let mut entry = serde_json::to_value(&native).unwrap_or(Value::Null);
        match stable {
          Ok(b) => entry["stable_balance"] = serde_json::to_value(&b.balance).unwrap_or(Value::Null),
          Err(e) => entry["stable_error"] = json!(e.to_string()),
        }
        entry
      })
      .collect();

    Ok(json!({ "address": owner, "chains": chains }))
  }
  .boxed()
}

pub fn get_etf_tokens(ctx: &ToolContext, args: Value) -> BoxFuture<'_, ToolResult> {
  async move {
    let args: ChainArgs = decode(args)?;
    let chain = chain_or_error(ctx, args.chain_id)?;
    let baskets = ctx.prices.list_baskets(chain.chain_id).await?;
    Ok(json!({
      "chain_id": chain.chain_id,
      "chain": chain.name,
      "basket_connector": chain.contracts.basket_connector,
      "baskets": baskets,
    }))
  }
  .boxed()
}

pub fn get_etf_price(ctx: &ToolContext, args: Value) -> BoxFuture<'_, ToolResult> {
  async move {
    let args: BasketPriceArgs = decode(args)?;
    let chain = chain_or_error(ctx, args.chain_id)?;
    let token = address_arg("etf_token_address", &args.etf_token_address)?;
    let quote = ctx.prices.basket_price(chain, token).await?;
    let mut value = to_json(&quote)?;
    value["chain_id"] = json!(chain.chain_id);
    value["token"] = json!(token);
    Ok(value)
  }
  .boxed()
}

/// Outcome for a request that could not even be built.
fn early_rejection(reason: RejectReason, message: String) -> TradeOutcome {
  TradeOutcome::Rejected {
    trade_id: Uuid::new_v4(),
    reason,
    message,
  }
}

fn amount_spec(text: String, is_raw: bool) -> Result<AmountSpec, TradeOutcome> {
  if !is_raw {
    return Ok(AmountSpec::Units(text));
  }
  U256::from_str(text.trim())
    .map(AmountSpec::Raw)
    .map_err(|_| {
      early_rejection(RejectReason::InvalidAmount, format!("'{text}' is not a raw integer amount"))
    })
}

fn buy_request(ctx: &ToolContext, args: BuyArgs) -> Result<TradeRequest, TradeOutcome> {
  let amount = amount_spec(args.input_amount, args.input_amount_is_raw)?;
  let mut request = TradeRequest::buy(
    args.chain_id,
    args.input_token_address,
    args.output_token_address,
    amount,
    args.slippage_percent.unwrap_or(ctx.defaults.slippage_percent),
    ctx.defaults.deadline_from(args.deadline_secs),
  );

  request.min_output = args
    .min_output_raw
    .map(|raw| {
      U256::from_str(raw.trim()).map_err(|_| {
        early_rejection(RejectReason::InvalidAmount, format!("min_output_raw '{raw}' is not an integer"))
      })
    })
    .transpose()?;
  request.path = args
    .path
    .map(|hex| {
      alloy::hex::decode(hex.trim())
        .map(Bytes::from)
        .map_err(|e| early_rejection(RejectReason::InvalidPath, format!("path is not hex: {e}")))
    })
    .transpose()?;
  request.recipient = args.recipient;
  Ok(request)
}

fn sell_request(ctx: &ToolContext, args: SellArgs) -> Result<TradeRequest, TradeOutcome> {
  let amount = amount_spec(args.amount, args.amount_is_raw)?;
  let mut request = TradeRequest::sell(
    args.chain_id,
    args.token_address,
    amount,
    ctx.defaults.deadline_from(args.deadline_secs),
  );
  request.recipient = args.recipient;
  Ok(request)
}

async fn run_trade(
  ctx: &ToolContext,
  chain_id: ChainId,
  direction: TradeDirection,
  built: Result<TradeRequest, TradeOutcome>,
) -> ToolResult {
  let started = Instant::now();
  let outcome = match built {
    Ok(request) => {
      info!(trade_id = %request.id, chain_id, direction = %direction, "Trade requested");
      ctx.orchestrator.execute(request).await
    }
    Err(outcome) => {
      warn!(chain_id, direction = %direction, "Trade request malformed");
      outcome
    }
  };

  if let Some(metrics) = &ctx.metrics {
    metrics.record_trade(chain_id, direction, &outcome);
  }
  info!(
    outcome = outcome.label(),
    tx_hash = ?outcome.tx_hash(),
    elapsed_ms = started.elapsed().as_millis(),
    "Trade finished"
  );
  to_json(&outcome)
}

pub fn buy_token(ctx: &ToolContext, args: Value) -> BoxFuture<'_, ToolResult> {
  async move {
    let args: BuyArgs = decode(args)?;
    let chain_id = args.chain_id;
    let built = buy_request(ctx, args);
    run_trade(ctx, chain_id, TradeDirection::Buy, built).await
  }
  .boxed()
}

pub fn sell_token(ctx: &ToolContext, args: Value) -> BoxFuture<'_, ToolResult> {
  async move {
    let args: SellArgs = decode(args)?;
    let chain_id = args.chain_id;
    let built = sell_request(ctx, args);
    run_trade(ctx, chain_id, TradeDirection::Sell, built).await
  }
  .boxed()
}

pub fn list_tools(_ctx: &ToolContext, args: Value) -> BoxFuture<'_, ToolResult> {
  async move {
    let _: NoArgs = decode(args)?;
    let specs: Vec<_> = catalogue().into_iter().map(|tool| tool.spec).collect();
    to_json(&specs)
  }
  .boxed()
}
