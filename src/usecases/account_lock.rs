//! Account Locks - Per-(account, chain) Trade Serialization
//!
//! Two trades from the same account on the same chain would race for
//! the same nonce and the same allowance. Each `(account, chain)` pair
//! gets its own async mutex; pairs never block each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use alloy::primitives::Address;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::chain::ChainId;

/// Guard held for the lifetime of one trade.
pub type AccountGuard = OwnedMutexGuard<()>;

/// Lazily populated table of per-pair locks.
#[derive(Default)]
pub struct AccountLocks {
  locks: Mutex<HashMap<(Address, ChainId), Arc<AsyncMutex<()>>>>,
}

impl AccountLocks {
  pub fn new() -> Self {
    Self::default()
  }

  fn slot(&self, account: Address, chain_id: ChainId) -> Arc<AsyncMutex<()>> {
    let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
    Arc::clone(locks.entry((account, chain_id)).or_default())
  }

  /// Wait for exclusive use of `(account, chain_id)`.
  pub async fn acquire(&self, account: Address, chain_id: ChainId) -> AccountGuard {
    self.slot(account, chain_id).lock_owned().await
  }

  /// Take the lock only if it is free.
  pub fn try_acquire(&self, account: Address, chain_id: ChainId) -> Option<AccountGuard> {
    self.slot(account, chain_id).try_lock_owned().ok()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_same_pair_is_exclusive() {
    let locks = AccountLocks::new();
    let account = Address::repeat_byte(1);

    let guard = locks.acquire(account, 1).await;
    assert!(locks.try_acquire(account, 1).is_none());
    drop(guard);
    assert!(locks.try_acquire(account, 1).is_some());
  }

  #[tokio::test]
  async fn test_other_chains_are_independent() {
    let locks = AccountLocks::new();
    let account = Address::repeat_byte(1);

    let _eth = locks.acquire(account, 1).await;
    assert!(locks.try_acquire(account, 10).is_some());
    assert!(locks.try_acquire(Address::repeat_byte(2), 1).is_some());
  }
}
