//! Built-in Chain Table - The Seven Supported EVM Chains
//!
//! Public endpoints, explorers, native currencies, wrapped-native tokens
//! and Uniswap V3 QuoterV2 deployments are fixed here. Protocol contract
//! addresses are per deployment and come from the environment:
//! `PUSD_TOKEN_<SFX>`, `PUSD_CONNECTOR_<SFX>` and `ETF_CONNECTOR_<SFX>`.
//! `RPC_URL_<SFX>` replaces the public endpoint, e.g. with a keyed one.

use anyhow::{Result, ensure};

use crate::domain::registry::ChainDeclaration;

use super::ChainOverride;

struct Builtin {
  chain_id: u64,
  name: &'static str,
  api_name: &'static str,
  env_suffix: &'static str,
  rpc_url: &'static str,
  explorer_url: &'static str,
  native: (&'static str, &'static str),
  fallback_gas_price_gwei: u64,
  wrapped_native: &'static str,
  quoter: Option<&'static str>,
}

const QUOTER_V2: &str = "0x61fFE014bA17989E743c5F6cB21bF9697530B21e";
const OP_STACK_WETH: &str = "0x4200000000000000000000000000000000000006";

const BUILTIN: [Builtin; 7] = [
  Builtin {
    chain_id: 1,
    name: "Ethereum",
    api_name: "ethereum",
    env_suffix: "ETH",
    rpc_url: "https://eth.llamarpc.com",
    explorer_url: "https://etherscan.io",
    native: ("Ether", "ETH"),
    fallback_gas_price_gwei: 30,
    wrapped_native: "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2",
    quoter: Some(QUOTER_V2),
  },
  Builtin {
    chain_id: 42161,
    name: "Arbitrum One",
    api_name: "arbitrum",
    env_suffix: "ARB",
    rpc_url: "https://arb1.arbitrum.io/rpc",
    explorer_url: "https://arbiscan.io",
    native: ("Ether", "ETH"),
    fallback_gas_price_gwei: 1,
    wrapped_native: "0x82aF49447D8a07e3bd95BD0d56f35241523fBab1",
    quoter: Some(QUOTER_V2),
  },
  Builtin {
    chain_id: 10,
    name: "Optimism",
    api_name: "optimism",
    env_suffix: "OP",
    rpc_url: "https://mainnet.optimism.io",
    explorer_url: "https://optimistic.etherscan.io",
    native: ("Ether", "ETH"),
    fallback_gas_price_gwei: 1,
    wrapped_native: OP_STACK_WETH,
    quoter: Some(QUOTER_V2),
  },
  Builtin {
    chain_id: 8453,
    name: "Base",
    api_name: "base",
    env_suffix: "BASE",
    rpc_url: "https://mainnet.base.org",
    explorer_url: "https://basescan.org",
    native: ("Ether", "ETH"),
    fallback_gas_price_gwei: 1,
    wrapped_native: OP_STACK_WETH,
    quoter: Some("0x3d4e44Eb1374240CE5F1B871ab261CD16335B76a"),
  },
  Builtin {
    chain_id: 56,
    name: "BNB Smart Chain",
    api_name: "bsc",
    env_suffix: "BSC",
    rpc_url: "https://bsc-dataseed1.binance.org",
    explorer_url: "https://bscscan.com",
    native: ("BNB", "BNB"),
    fallback_gas_price_gwei: 5,
    wrapped_native: "0xbb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c",
    quoter: Some("0x78D78E420Da98ad378D7799bE8f4AF69033EB077"),
  },
  Builtin {
    chain_id: 137,
    name: "Polygon",
    api_name: "polygon",
    env_suffix: "MATIC",
    rpc_url: "https://polygon-rpc.com",
    explorer_url: "https://polygonscan.com",
    native: ("MATIC", "MATIC"),
    fallback_gas_price_gwei: 30,
    wrapped_native: "0x0d500B1d8E8eF31E21C99d1Db9A6444d3ADf1270",
    quoter: Some(QUOTER_V2),
  },
  Builtin {
    chain_id: 100,
    name: "Gnosis Chain",
    api_name: "gnosis",
    env_suffix: "GNOSIS",
    rpc_url: "https://rpc.gnosischain.com",
    explorer_url: "https://gnosisscan.io",
    native: ("xDAI", "xDAI"),
    fallback_gas_price_gwei: 2,
    wrapped_native: "0xe91D153E0b41518A2Ce8Dd3D7944Fa863463a97d",
    quoter: None,
  },
];

/// Built-in declarations, in canonical order, with addresses looked up
/// through `env`.
pub fn builtin_declarations(env: impl Fn(&str) -> Option<String>) -> Vec<ChainDeclaration> {
  BUILTIN
    .iter()
    .map(|b| {
      let var = |prefix: &str| env(&format!("{prefix}_{}", b.env_suffix));
      ChainDeclaration {
        chain_id: b.chain_id,
        name: b.name.to_string(),
        api_name: b.api_name.to_string(),
        rpc_url: var("RPC_URL").unwrap_or_else(|| b.rpc_url.to_string()),
        explorer_url: b.explorer_url.to_string(),
        native_name: b.native.0.to_string(),
        native_symbol: b.native.1.to_string(),
        native_decimals: 18,
        fallback_gas_price_gwei: b.fallback_gas_price_gwei,
        stable_token: var("PUSD_TOKEN"),
        stable_connector: var("PUSD_CONNECTOR"),
        basket_connector: var("ETF_CONNECTOR"),
        wrapped_native: Some(b.wrapped_native.to_string()),
        quoter: b.quoter.map(str::to_string),
      }
    })
    .collect()
}

/// Apply `[[chains]]` entries on top of the built-in table.
pub fn apply_overrides(
  mut declarations: Vec<ChainDeclaration>,
  overrides: &[ChainOverride],
) -> Result<Vec<ChainDeclaration>> {
  for o in overrides {
    if o.disabled {
      declarations.retain(|d| d.chain_id != o.chain_id);
      continue;
    }

    let idx = match declarations.iter().position(|d| d.chain_id == o.chain_id) {
      Some(idx) => idx,
      None => {
        ensure!(
          o.name.is_some() && o.rpc_url.is_some(),
          "chain {} is not built in; name and rpc_url are required",
          o.chain_id
        );
        declarations.push(ChainDeclaration {
          chain_id: o.chain_id,
          native_name: "Ether".to_string(),
          native_symbol: "ETH".to_string(),
          native_decimals: 18,
          fallback_gas_price_gwei: 1,
          ..ChainDeclaration::default()
        });
        declarations.len() - 1
      }
    };

    let d = &mut declarations[idx];
    if let Some(v) = &o.name {
      d.name.clone_from(v);
      if d.api_name.is_empty() {
        d.api_name = v.to_lowercase();
      }
    }
    if let Some(v) = &o.api_name {
      d.api_name.clone_from(v);
    }
    if let Some(v) = &o.rpc_url {
      d.rpc_url.clone_from(v);
    }
    if let Some(v) = &o.explorer_url {
      d.explorer_url.clone_from(v);
    }
    if let Some(v) = &o.native_symbol {
      d.native_symbol.clone_from(v);
      d.native_name.clone_from(v);
    }
    if let Some(v) = o.native_decimals {
      d.native_decimals = v;
    }
    if let Some(v) = o.fallback_gas_price_gwei {
      d.fallback_gas_price_gwei = v;
    }
    for (slot, value) in [
      (&mut d.stable_token, &o.stable_token),
      (&mut d.stable_connector, &o.stable_connector),
      (&mut d.basket_connector, &o.basket_connector),
      (&mut d.wrapped_native, &o.wrapped_native),
      (&mut d.quoter, &o.quoter),
    ] {
      if value.is_some() {
        slot.clone_from(value);
      }
    }
  }
  Ok(declarations)
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use super::*;

  fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
      .iter()
      .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
      .collect();
    move |key| map.get(key).cloned()
  }

  #[test]
  fn test_builtin_order_and_ids() {
    let ids: Vec<u64> = builtin_declarations(|_| None).iter().map(|d| d.chain_id).collect();
    assert_eq!(ids, vec![1, 42161, 10, 8453, 56, 137, 100]);
  }

  #[test]
  fn test_env_suffixes() {
    let decls = builtin_declarations(env_of(&[
      ("PUSD_TOKEN_MATIC", "0x1111111111111111111111111111111111111111"),
      ("ETF_CONNECTOR_GNOSIS", "0x2222222222222222222222222222222222222222"),
      ("RPC_URL_ETH", "https://eth.example/key"),
    ]));
    let polygon = decls.iter().find(|d| d.chain_id == 137).unwrap();
    assert!(polygon.stable_token.is_some());
    assert!(polygon.stable_connector.is_none());

    let gnosis = decls.iter().find(|d| d.chain_id == 100).unwrap();
    assert!(gnosis.basket_connector.is_some());
    assert!(gnosis.quoter.is_none());

    assert_eq!(decls[0].rpc_url, "https://eth.example/key");
  }

  #[test]
  fn test_override_and_disable() {
    let overrides = vec![
      ChainOverride {
        chain_id: 100,
        quoter: Some("0x3333333333333333333333333333333333333333".into()),
        ..ChainOverride::default()
      },
      ChainOverride {
        chain_id: 56,
        disabled: true,
        ..ChainOverride::default()
      },
    ];
    let decls = apply_overrides(builtin_declarations(|_| None), &overrides).unwrap();
    assert!(decls.iter().all(|d| d.chain_id != 56));
    assert!(decls.iter().find(|d| d.chain_id == 100).unwrap().quoter.is_some());
  }

  #[test]
  fn test_new_chain_needs_name_and_rpc() {
    let bad = vec![ChainOverride {
      chain_id: 31337,
      ..ChainOverride::default()
    }];
    assert!(apply_overrides(Vec::new(), &bad).is_err());

    let good = vec![ChainOverride {
      chain_id: 31337,
      name: Some("Anvil".into()),
      rpc_url: Some("http://127.0.0.1:8545".into()),
      ..ChainOverride::default()
    }];
    let decls = apply_overrides(Vec::new(), &good).unwrap();
    assert_eq!(decls[0].api_name, "anvil");
    assert_eq!(decls[0].native_decimals, 18);
  }
}
