//! Tool Layer - Named Operations Exposed to an Agent
//!
//! Every tool is a name, a parameter list and an async handler over the
//! shared `ToolContext`. `ToolRegistry::call` is the only entry point:
//! it decodes nothing itself, times the handler, records metrics and
//! wraps the result in a uniform `{ok, result | error}` envelope.

pub mod args;
pub mod context;
pub mod handlers;
pub mod serve;

use std::collections::HashMap;
use std::time::Instant;

use futures_util::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::TradeError;

pub use context::{ToolContext, TradeDefaults};
pub use serve::serve_lines;

/// Failure reported by a non-trade tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolError {
  pub kind: String,
  pub message: String,
}

impl ToolError {
  pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      kind: kind.into(),
      message: message.into(),
    }
  }

  pub fn invalid_arguments(message: impl Into<String>) -> Self {
    Self::new("invalid_arguments", message)
  }

  pub fn unknown_tool(name: &str) -> Self {
    Self::new("unknown_tool", format!("no tool named '{name}'"))
  }
}

impl From<TradeError> for ToolError {
  fn from(err: TradeError) -> Self {
    Self::new(err.kind_name(), err.to_string())
  }
}

pub type ToolResult = Result<Value, ToolError>;

type Handler = for<'a> fn(&'a ToolContext, Value) -> BoxFuture<'a, ToolResult>;

/// Decode tool arguments; a missing argument object counts as empty.
pub(crate) fn decode<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
  let args = if args.is_null() { Value::Object(Default::default()) } else { args };
  serde_json::from_value(args).map_err(|e| ToolError::invalid_arguments(e.to_string()))
}

/// One documented parameter.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ParamSpec {
  pub name: &'static str,
  #[serde(rename = "type")]
  pub kind: &'static str,
  pub required: bool,
  pub description: &'static str,
}

const fn param(name: &'static str, kind: &'static str, required: bool, description: &'static str) -> ParamSpec {
  ParamSpec {
    name,
    kind,
    required,
    description,
  }
}

/// Public description of a tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
  pub name: &'static str,
  pub description: &'static str,
  pub params: &'static [ParamSpec],
}

pub(crate) struct Tool {
  pub spec: ToolSpec,
  handler: Handler,
}

const CHAIN_ID: ParamSpec = param("chain_id", "integer|string", true, "EVM chain id");
const RECIPIENT: ParamSpec = param("recipient", "string", false, "Output recipient; defaults to the signer");
const DEADLINE: ParamSpec = param("deadline_secs", "integer", false, "Seconds until the trade deadline");

const CHAIN_PARAMS: &[ParamSpec] = &[CHAIN_ID];

const BALANCE_PARAMS: &[ParamSpec] = &[
  CHAIN_ID,
  param("token_address", "string", false, "ERC-20 address or 'native'"),
  param("wallet_address", "string", false, "Owner; defaults to the signer"),
];

const BUY_PARAMS: &[ParamSpec] = &[
  CHAIN_ID,
  param("input_token_address", "string", true, "Token spent: address or 'native'"),
  param("output_token_address", "string", true, "Protocol token to acquire"),
  param("input_amount", "number|string", true, "Amount spent"),
  param("input_amount_is_raw", "boolean", false, "Amount is in smallest units"),
  param("slippage_percent", "number|string", false, "Slippage tolerance in percent"),
  param("min_output_raw", "integer|string", false, "Explicit minimum output; overrides slippage"),
  RECIPIENT,
  param("path", "string", false, "Hex packed swap path ending at the stable-value token"),
  DEADLINE,
];

const SELL_PARAMS: &[ParamSpec] = &[
  CHAIN_ID,
  param("token_address", "string", true, "Protocol token to sell"),
  param("amount", "number|string", true, "Amount sold"),
  param("amount_is_raw", "boolean", false, "Amount is in smallest units"),
  RECIPIENT,
  DEADLINE,
];

const ADDRESS_PARAMS: &[ParamSpec] = &[param("address", "string", true, "Address to inspect")];

const PRICE_PARAMS: &[ParamSpec] = &[CHAIN_ID, param("etf_token_address", "string", true, "Basket token")];

/// The full tool set, in listing order.
pub(crate) fn catalogue() -> Vec<Tool> {
  vec![
    Tool {
      spec: ToolSpec {
        name: "get_account_info",
        description: "Signer address and its native balance on every supported chain",
        params: &[],
      },
      handler: handlers::get_account_info,
    },
    Tool {
      spec: ToolSpec {
        name: "get_balance",
        description: "Native or ERC-20 balance of a wallet on one chain",
        params: BALANCE_PARAMS,
      },
      handler: handlers::get_balance,
    },
    Tool {
      spec: ToolSpec {
        name: "get_chain_info",
        description: "Configuration, contracts and connectivity of one chain",
        params: CHAIN_PARAMS,
      },
      handler: handlers::get_chain_info,
    },
    Tool {
      spec: ToolSpec {
        name: "list_supported_chains",
        description: "Every usable chain plus the ones disabled for missing settings",
        params: &[],
      },
      handler: handlers::list_supported_chains,
    },
    Tool {
      spec: ToolSpec {
        name: "buy_token",
        description: "Buy the stable-value token or a basket token with native or ERC-20 input",
        params: BUY_PARAMS,
      },
      handler: handlers::buy_token,
    },
    Tool {
      spec: ToolSpec {
        name: "sell_token",
        description: "Sell the stable-value token or a basket token through its connector",
        params: SELL_PARAMS,
      },
      handler: handlers::sell_token,
    },
    Tool {
      spec: ToolSpec {
        name: "get_address_balances",
        description: "Native and stable-value balances of any address across chains",
        params: ADDRESS_PARAMS,
      },
      handler: handlers::get_address_balances,
    },
    Tool {
      spec: ToolSpec {
        name: "get_etf_tokens",
        description: "Basket tokens available on a chain",
        params: CHAIN_PARAMS,
      },
      handler: handlers::get_etf_tokens,
    },
    Tool {
      spec: ToolSpec {
        name: "get_etf_price",
        description: "Buy and sell price of a basket token in USD",
        params: PRICE_PARAMS,
      },
      handler: handlers::get_etf_price,
    },
    Tool {
      spec: ToolSpec {
        name: "list_tools",
        description: "This list",
        params: &[],
      },
      handler: handlers::list_tools,
    },
  ]
}

/// Envelope returned for every call.
#[derive(Debug, Clone, Serialize)]
pub struct ToolResponse {
  pub ok: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub result: Option<Value>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<ToolError>,
}

impl From<ToolResult> for ToolResponse {
  fn from(result: ToolResult) -> Self {
    match result {
      Ok(value) => Self {
        ok: true,
        result: Some(value),
        error: None,
      },
      Err(err) => Self {
        ok: false,
        result: None,
        error: Some(err),
      },
    }
  }
}

/// Dispatch table from tool name to handler.
pub struct ToolRegistry {
  tools: HashMap<&'static str, Tool>,
}

impl Default for ToolRegistry {
  fn default() -> Self {
    Self::new()
  }
}

impl ToolRegistry {
  pub fn new() -> Self {
    let tools = catalogue().into_iter().map(|tool| (tool.spec.name, tool)).collect();
    Self { tools }
  }

  /// Specs of every registered tool, in listing order.
  pub fn specs(&self) -> Vec<ToolSpec> {
    catalogue().into_iter().map(|tool| tool.spec).collect()
  }

  pub fn contains(&self, name: &str) -> bool {
    self.tools.contains_key(name)
  }

  /// Run a tool by name.
  pub async fn call(&self, ctx: &ToolContext, name: &str, args: Value) -> ToolResponse {
    let Some(tool) = self.tools.get(name) else {
      warn!(tool = name, "Unknown tool requested");
      return ToolResponse::from(Err(ToolError::unknown_tool(name)));
    };

    let started = Instant::now();
    let result = (tool.handler)(ctx, args).await;
    let elapsed = started.elapsed().as_secs_f64();

    if let Some(metrics) = &ctx.metrics {
      metrics.record_tool(name, result.is_ok(), elapsed);
    }
    match &result {
      Ok(_) => debug!(tool = name, elapsed_ms = elapsed * 1000.0, "Tool completed"),
      Err(e) => warn!(tool = name, kind = %e.kind, error = %e.message, "Tool failed"),
    }
    ToolResponse::from(result)
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::domain::trade::RejectReason;

  #[test]
  fn test_catalogue_names_are_unique() {
    let registry = ToolRegistry::new();
    let specs = registry.specs();
    assert_eq!(specs.len(), 10);
    assert_eq!(registry.tools.len(), specs.len());
    assert!(registry.contains("buy_token"));
    assert!(!registry.contains("mint_money"));
  }

  #[test]
  fn test_trade_tools_document_required_params() {
    let specs = ToolRegistry::new().specs();
    let buy = specs.iter().find(|s| s.name == "buy_token").unwrap();
    let required: Vec<&str> = buy.params.iter().filter(|p| p.required).map(|p| p.name).collect();
    assert_eq!(
      required,
      ["chain_id", "input_token_address", "output_token_address", "input_amount"]
    );
    let sell = specs.iter().find(|s| s.name == "sell_token").unwrap();
    assert_eq!(sell.params.len(), 6);
    let json = serde_json::to_value(buy.params[0]).unwrap();
    assert_eq!(json["type"], "integer|string");
  }

  #[test]
  fn test_trade_error_maps_kind() {
    let err = ToolError::from(TradeError::UnknownChain(999));
    assert_eq!(err.kind, "unknown_chain");
    let err = ToolError::from(TradeError::rejected(RejectReason::InvalidAmount, "zero"));
    assert_eq!(err.kind, "rejected");
    assert!(err.message.contains("zero"));
  }

  #[test]
  fn test_decode_treats_null_as_empty() {
    let args: args::NoArgs = decode(Value::Null).unwrap();
    let _ = args;
    let err = decode::<args::ChainArgs>(json!({})).unwrap_err();
    assert_eq!(err.kind, "invalid_arguments");
  }

  #[test]
  fn test_response_envelope() {
    let ok = serde_json::to_value(ToolResponse::from(Ok(json!(1)))).unwrap();
    assert_eq!(ok, json!({ "ok": true, "result": 1 }));
    let err = serde_json::to_value(ToolResponse::from(Err(ToolError::unknown_tool("x")))).unwrap();
    assert_eq!(err["ok"], false);
    assert_eq!(err["error"]["kind"], "unknown_tool");
  }
}
