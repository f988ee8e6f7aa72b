//! Account types for the tally ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::AccountId;

/// A ledger account.
///
/// Balances are held in the smallest currency unit and never drop below
/// zero at a committed state. Accounts are created with a zero balance and
/// are only ever mutated by the transfer protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// The account ID.
    pub id: AccountId,

    /// Unique username, the handle other accounts transfer to.
    pub username: String,

    /// Current balance in the smallest currency unit.
    pub balance: i64,

    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account with zero balance.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: AccountId::generate(),
            username: username.into(),
            balance: 0,
            created_at: Utc::now(),
        }
    }

    /// Check if the account can cover a debit of `amount`.
    #[must_use]
    pub const fn has_sufficient_balance(&self, amount: i64) -> bool {
        self.balance >= amount
    }
}

/// Running sum of value an account has sent.
///
/// One row per account, created alongside it, monotonically non-decreasing.
/// Only transfers increment it; top-ups never do. Feeds the top-senders
/// leaderboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgoingTotal {
    /// The account this total belongs to.
    pub account_id: AccountId,

    /// Total value sent, in the smallest currency unit.
    pub total_outgoing: i64,
}

impl OutgoingTotal {
    /// Create the zeroed total that accompanies a new account.
    #[must_use]
    pub const fn new(account_id: AccountId) -> Self {
        Self {
            account_id,
            total_outgoing: 0,
        }
    }
}
