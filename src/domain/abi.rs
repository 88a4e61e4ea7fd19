//! Contract ABIs and Call Builders
//!
//! Solidity interfaces for the ERC-20 standard, the protocol connectors
//! and the Uniswap V3 QuoterV2, plus `ContractCall` constructors for
//! every state-changing call the engine makes.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;
use serde::Serialize;

sol! {
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
        function decimals() external view returns (uint8);
        function symbol() external view returns (string);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }

    interface IStableConnector {
        function purchase(bytes path, uint256 amount, uint256 min_amount) external payable;
        function withdraw(uint256 amount) external payable;
        function gas_fee() external view returns (uint256);
    }

    interface IBasketConnector {
        function buy(
            address etf_token,
            uint256 etf_amount,
            uint256 usd_amount,
            address recipient,
            bytes path,
            uint256 deadline
        ) external payable;
        function sell(
            address etf_token,
            uint256 etf_amount,
            uint256 deadline,
            address recipient
        ) external payable;
        function gas_fee() external view returns (uint256);
    }

    interface IQuoterV2 {
        function quoteExactInput(bytes path, uint256 amountIn)
            external
            returns (
                uint256 amountOut,
                uint160[] sqrtPriceX96AfterList,
                uint32[] initializedTicksCrossedList,
                uint256 gasEstimate
            );
    }
}

/// A fully encoded call from the signer to a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractCall {
    /// Target contract.
    pub to: Address,
    /// ABI-encoded calldata.
    pub data: Bytes,
    /// Native value attached (wei).
    #[serde(serialize_with = "super::amount::serialize_raw")]
    pub value: U256,
    /// Short label for logs ("approve", "purchase", ...).
    pub label: &'static str,
}

impl ContractCall {
    /// Return a copy carrying `value` wei.
    #[must_use]
    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    /// ERC-20 `approve(spender, amount)`.
    pub fn approve(token: Address, spender: Address, amount: U256) -> Self {
        Self {
            to: token,
            data: IERC20::approveCall { spender, amount }.abi_encode().into(),
            value: U256::ZERO,
            label: "approve",
        }
    }

    /// Stable connector `purchase(path, amount, min_amount)`.
    pub fn stable_purchase(connector: Address, path: Bytes, amount: U256, min_amount: U256) -> Self {
        Self {
            to: connector,
            data: IStableConnector::purchaseCall {
                path,
                amount,
                min_amount,
            }
            .abi_encode()
            .into(),
            value: U256::ZERO,
            label: "purchase",
        }
    }

    /// Stable connector `withdraw(amount)`.
    pub fn stable_withdraw(connector: Address, amount: U256) -> Self {
        Self {
            to: connector,
            data: IStableConnector::withdrawCall { amount }.abi_encode().into(),
            value: U256::ZERO,
            label: "withdraw",
        }
    }

    /// Basket connector `buy(...)`.
    pub fn basket_buy(connector: Address, order: BasketBuy) -> Self {
        Self {
            to: connector,
            data: IBasketConnector::buyCall {
                etf_token: order.basket_token,
                etf_amount: order.basket_amount,
                usd_amount: order.usd_amount,
                recipient: order.recipient,
                path: order.path,
                deadline: order.deadline,
            }
            .abi_encode()
            .into(),
            value: U256::ZERO,
            label: "buy",
        }
    }

    /// Basket connector `sell(etf_token, etf_amount, deadline, recipient)`.
    pub fn basket_sell(
        connector: Address,
        basket_token: Address,
        amount: U256,
        deadline: U256,
        recipient: Address,
    ) -> Self {
        Self {
            to: connector,
            data: IBasketConnector::sellCall {
                etf_token: basket_token,
                etf_amount: amount,
                deadline,
                recipient,
            }
            .abi_encode()
            .into(),
            value: U256::ZERO,
            label: "sell",
        }
    }
}

/// Arguments of a basket buy.
#[derive(Debug, Clone)]
pub struct BasketBuy {
    pub basket_token: Address,
    /// Minimum basket amount to receive.
    pub basket_amount: U256,
    /// Stable-value amount the input is swapped into.
    pub usd_amount: U256,
    pub recipient: Address,
    /// Packed path input → stable token; empty when paying in the stable token.
    pub path: Bytes,
    /// Unix timestamp after which the connector reverts.
    pub deadline: U256,
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;

    use super::*;

    #[test]
    fn test_approve_selector() {
        let call = ContractCall::approve(Address::ZERO, Address::ZERO, U256::from(5u64));
        // keccak("approve(address,uint256)")[..4]
        assert_eq!(&call.data[..4], &[0x09, 0x5e, 0xa7, 0xb3]);
        assert_eq!(call.data.len(), 4 + 64);
        assert!(call.value.is_zero());
    }

    #[test]
    fn test_purchase_decodes_back() {
        let connector = address!("2222222222222222222222222222222222222222");
        let call = ContractCall::stable_purchase(
            connector,
            Bytes::from(vec![1u8; 43]),
            U256::from(100u64),
            U256::from(97u64),
        );
        let decoded = IStableConnector::purchaseCall::abi_decode(&call.data, true).unwrap();
        assert_eq!(decoded.amount, U256::from(100u64));
        assert_eq!(decoded.min_amount, U256::from(97u64));
        assert_eq!(decoded.path.len(), 43);
        assert_eq!(call.to, connector);
    }

    #[test]
    fn test_with_value() {
        let call = ContractCall::stable_withdraw(Address::ZERO, U256::from(1u64))
            .with_value(U256::from(9u64));
        assert_eq!(call.value, U256::from(9u64));
        assert_eq!(call.label, "withdraw");
    }
}
