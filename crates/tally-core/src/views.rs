//! Read-side view rows produced by the aggregation queries.
//!
//! These are derived data: recomputable from the mutation log and the
//! outgoing totals at any time, and safe to cache.

use serde::{Deserialize, Serialize};

/// Maximum number of rows either leaderboard view returns.
pub const TOP_LIMIT: usize = 10;

/// One row of an account's transaction history view.
///
/// `amount` is signed: negative when the account sent the value, positive
/// when it received it. `username` names the counterparty, not the account
/// the view belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopTransaction {
    /// Counterparty username.
    pub username: String,

    /// Signed amount from the owning account's perspective.
    pub amount: i64,
}

/// One row of the top-senders leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopUser {
    /// Account username.
    pub username: String,

    /// Total value the account has sent.
    pub total_outgoing: i64,
}
