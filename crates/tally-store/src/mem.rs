//! In-memory storage implementation.
//!
//! [`MemStore`] mirrors the PostgreSQL store's transactional semantics for
//! tests and local development: compound operations stage their writes on a
//! copy of the state and swap it in only when every step has passed, so an
//! abort leaves nothing behind: same all-or-nothing behavior, same step
//! order, same error surface.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use tally_core::{
    Account, AccountId, Mutation, MutationKind, OutgoingTotal, TopTransaction, TopUser,
};

use crate::error::{Result, StoreError};
use crate::{Store, TransferReceipt};

#[derive(Debug, Default, Clone)]
struct State {
    accounts: HashMap<AccountId, Account>,
    by_username: HashMap<String, AccountId>,
    totals: HashMap<AccountId, i64>,
    mutations: Vec<Mutation>,
}

/// In-memory store with the same semantics as [`crate::PgStore`].
#[derive(Debug, Default)]
pub struct MemStore {
    state: Mutex<State>,
}

impl MemStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A poisoned lock means a panic mid-test; propagate it.
        self.state.lock().expect("mem store lock poisoned")
    }
}

#[async_trait]
impl Store for MemStore {
    // =========================================================================
    // Account Operations
    // =========================================================================

    async fn create_account(&self, username: &str) -> Result<Account> {
        let mut state = self.lock();

        if state.by_username.contains_key(username) {
            return Err(StoreError::AlreadyExists {
                username: username.to_string(),
            });
        }

        let account = Account::new(username);
        state.by_username.insert(account.username.clone(), account.id);
        state.totals.insert(account.id, 0);
        state.accounts.insert(account.id, account.clone());

        Ok(account)
    }

    async fn account_by_username(&self, username: &str) -> Result<Option<Account>> {
        let state = self.lock();
        Ok(state
            .by_username
            .get(username)
            .and_then(|id| state.accounts.get(id))
            .cloned())
    }

    async fn balance(&self, account_id: AccountId) -> Result<i64> {
        let state = self.lock();
        state
            .accounts
            .get(&account_id)
            .map(|account| account.balance)
            .ok_or_else(|| StoreError::NotFound {
                entity: "account",
                id: account_id.to_string(),
            })
    }

    async fn outgoing_total(&self, account_id: AccountId) -> Result<OutgoingTotal> {
        let state = self.lock();
        state
            .totals
            .get(&account_id)
            .map(|total| OutgoingTotal {
                account_id,
                total_outgoing: *total,
            })
            .ok_or_else(|| StoreError::NotFound {
                entity: "outgoing total",
                id: account_id.to_string(),
            })
    }

    // =========================================================================
    // Transfer Protocol
    // =========================================================================

    async fn topup(&self, account_id: AccountId, amount: i64) -> Result<i64> {
        let mut state = self.lock();

        if !state.accounts.contains_key(&account_id) {
            return Err(StoreError::NotFound {
                entity: "account",
                id: account_id.to_string(),
            });
        }

        state.mutations.push(Mutation::topup(account_id, amount));
        let account = state
            .accounts
            .get_mut(&account_id)
            .expect("checked above while holding the lock");
        account.balance += amount;

        Ok(account.balance)
    }

    async fn transfer(
        &self,
        sender: AccountId,
        amount: i64,
        dest_username: &str,
    ) -> Result<TransferReceipt> {
        let mut state = self.lock();
        let mut staged = state.clone();

        // 1. Outgoing leg.
        let outgoing = Mutation::outgoing(sender, amount);
        staged.mutations.push(outgoing.clone());

        // 2. Conditional debit: check and write under one guard, the
        // in-memory analog of the store's compare-and-update.
        let Some(account) = staged.accounts.get_mut(&sender) else {
            return Err(StoreError::Database(format!(
                "sender account missing: {sender}"
            )));
        };
        if !account.has_sufficient_balance(amount) {
            return Err(StoreError::InsufficientBalance { required: amount });
        }
        account.balance -= amount;
        let sender_balance = account.balance;

        // 3. Outgoing aggregate.
        let Some(total) = staged.totals.get_mut(&sender) else {
            return Err(StoreError::Database(format!(
                "outgoing total row missing for account {sender}"
            )));
        };
        *total += amount;

        // 4. Incoming leg.
        let Some(dest_id) = staged.by_username.get(dest_username).copied() else {
            return Err(StoreError::DestinationNotFound {
                username: dest_username.to_string(),
            });
        };
        staged.mutations.push(outgoing.incoming_counterpart(dest_id));

        // 5. Credit the destination.
        let Some(dest) = staged.accounts.get_mut(&dest_id) else {
            return Err(StoreError::DestinationNotFound {
                username: dest_username.to_string(),
            });
        };
        dest.balance += amount;

        // 6. Commit: the staged state becomes the state.
        *state = staged;

        Ok(TransferReceipt {
            ref_id: outgoing.ref_id,
            sender_balance,
        })
    }

    // =========================================================================
    // Aggregation Queries
    // =========================================================================

    async fn top_transactions(
        &self,
        account_id: AccountId,
        limit: usize,
    ) -> Result<Vec<TopTransaction>> {
        let state = self.lock();

        let mut rows: Vec<(i64, String, TopTransaction)> = Vec::new();
        for leg in state
            .mutations
            .iter()
            .filter(|m| m.account_id == account_id && m.kind != MutationKind::Topup)
        {
            let Some(peer) = state
                .mutations
                .iter()
                .find(|p| p.ref_id == leg.ref_id && p.account_id != leg.account_id)
            else {
                continue;
            };
            let Some(counterparty) = state.accounts.get(&peer.account_id) else {
                continue;
            };
            rows.push((
                leg.value,
                leg.id.to_string(),
                TopTransaction {
                    username: counterparty.username.clone(),
                    amount: leg.signed_value(),
                },
            ));
        }

        rows.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
        rows.truncate(limit);

        Ok(rows.into_iter().map(|(_, _, row)| row).collect())
    }

    async fn top_users(&self, limit: usize) -> Result<Vec<TopUser>> {
        let state = self.lock();

        let mut ranked: Vec<(&Account, i64)> = state
            .totals
            .iter()
            .filter_map(|(id, total)| state.accounts.get(id).map(|account| (account, *total)))
            .collect();

        ranked.sort_by(|(a, ta), (b, tb)| {
            tb.cmp(ta)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.to_string().cmp(&b.id.to_string()))
        });
        ranked.truncate(limit);

        Ok(ranked
            .into_iter()
            .map(|(account, total_outgoing)| TopUser {
                username: account.username.clone(),
                total_outgoing,
            })
            .collect())
    }

    async fn mutations_for(
        &self,
        account_id: AccountId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Mutation>> {
        let state = self.lock();

        let mut mutations: Vec<Mutation> = state
            .mutations
            .iter()
            .filter(|m| m.account_id == account_id)
            .cloned()
            .collect();
        mutations.sort_by(|a, b| b.id.cmp(&a.id));

        Ok(mutations.into_iter().skip(offset).take(limit).collect())
    }
}
