//! Common test utilities for tally-ledger integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use tally_cache::MemoryCache;
use tally_core::{Account, Caller};
use tally_ledger::{Ledger, LedgerConfig};
use tally_store::MemStore;

/// Test harness containing everything needed for integration tests.
///
/// The store and cache handles are kept alongside the engine so tests can
/// assert directly against them (mutation log contents, raw cache keys).
pub struct TestHarness {
    /// The engine under test.
    pub ledger: Arc<Ledger>,
    /// The in-memory store behind it.
    pub store: Arc<MemStore>,
    /// The cache behind it.
    pub cache: Arc<MemoryCache>,
}

impl TestHarness {
    /// Create a new harness with fresh, empty state.
    pub fn new() -> Self {
        let store = Arc::new(MemStore::new());
        let cache = Arc::new(MemoryCache::with_defaults());
        let ledger = Arc::new(Ledger::new(
            store.clone(),
            cache.clone(),
            LedgerConfig::default(),
        ));

        Self {
            ledger,
            store,
            cache,
        }
    }

    /// Create an account and return the caller identity the Identity
    /// Provider would hand the engine for it.
    pub async fn register(&self, username: &str) -> Caller {
        let account = self
            .ledger
            .create_account(username)
            .await
            .expect("account creation failed");
        caller_for(&account)
    }

    /// Create an account and top it up.
    pub async fn register_funded(&self, username: &str, balance: i64) -> Caller {
        let caller = self.register(username).await;
        self.ledger
            .topup(&caller, balance)
            .await
            .expect("top-up failed");
        caller
    }
}

/// The caller identity for an account.
pub fn caller_for(account: &Account) -> Caller {
    Caller::new(account.id, &account.username)
}
