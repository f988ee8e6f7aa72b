//! Caller identity handed over at the Identity Provider boundary.

use serde::{Deserialize, Serialize};

use crate::AccountId;

/// A verified caller identity.
///
/// Authentication happens outside the engine; whatever sits at that boundary
/// resolves credentials to this pair and threads it through the call chain
/// explicitly. The engine never reads identity out of ambient context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    /// The caller's account ID.
    pub account_id: AccountId,

    /// The caller's username.
    pub username: String,
}

impl Caller {
    /// Create a caller identity.
    #[must_use]
    pub fn new(account_id: AccountId, username: impl Into<String>) -> Self {
        Self {
            account_id,
            username: username.into(),
        }
    }
}
