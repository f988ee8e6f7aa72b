//! Cache key scheme.
//!
//! Three namespaces: balances by username, per-account history by account
//! id, and one global leaderboard key.

use tally_core::AccountId;

/// The global leaderboard key.
pub const TOP_USERS: &str = "topusers";

/// Key for an account's cached balance.
#[must_use]
pub fn balance(username: &str) -> String {
    format!("balance:{username}")
}

/// Key for an account's cached transaction-history view.
#[must_use]
pub fn history(account_id: AccountId) -> String {
    format!("toptx:{account_id}")
}
