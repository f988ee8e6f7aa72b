//! Mutation log types for the tally ledger.
//!
//! Every balance-affecting event appends one or two immutable mutations.
//! A top-up appends a single `Topup` leg; a transfer appends an `Outgoing`
//! leg on the sender and an `Incoming` leg on the receiver, correlated by a
//! shared `RefId` and stamped with the same `created_at`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{AccountId, MutationId, RefId};

/// An immutable ledger entry recording one account's side of a balance change.
///
/// Mutations are never updated or deleted. `ref_id` is the join key that
/// reconstructs a transfer from its two legs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mutation {
    /// Unique mutation ID (ULID, time-ordered).
    pub id: MutationId,

    /// The account whose balance this leg affected.
    pub account_id: AccountId,

    /// Correlation key shared by the two legs of one transfer.
    pub ref_id: RefId,

    /// Which side of which event this leg records.
    pub kind: MutationKind,

    /// Value moved, in the smallest currency unit. Always positive.
    pub value: i64,

    /// When the event was committed. Both legs of a transfer carry the
    /// same timestamp.
    pub created_at: DateTime<Utc>,
}

impl Mutation {
    /// Create the single leg of a top-up with a fresh `ref_id`.
    #[must_use]
    pub fn topup(account_id: AccountId, value: i64) -> Self {
        Self {
            id: MutationId::generate(),
            account_id,
            ref_id: RefId::generate(),
            kind: MutationKind::Topup,
            value,
            created_at: Utc::now(),
        }
    }

    /// Create the sender leg of a transfer with a fresh `ref_id`.
    ///
    /// The receiver leg is derived from it with
    /// [`incoming_counterpart`](Self::incoming_counterpart) once the
    /// destination account is resolved.
    #[must_use]
    pub fn outgoing(sender: AccountId, value: i64) -> Self {
        Self {
            id: MutationId::generate(),
            account_id: sender,
            ref_id: RefId::generate(),
            kind: MutationKind::Outgoing,
            value,
            created_at: Utc::now(),
        }
    }

    /// Create the receiver leg matching this outgoing leg.
    ///
    /// Reuses the outgoing leg's `ref_id`, `value`, and `created_at`, so the
    /// two legs are linked and co-timestamped.
    #[must_use]
    pub fn incoming_counterpart(&self, receiver: AccountId) -> Self {
        Self {
            id: MutationId::generate(),
            account_id: receiver,
            ref_id: self.ref_id,
            kind: MutationKind::Incoming,
            value: self.value,
            created_at: self.created_at,
        }
    }

    /// Create the two legs of a transfer.
    ///
    /// The legs share one `ref_id` and one `created_at`, so they can be
    /// correlated as two sides of a single event. Returned as
    /// `(outgoing, incoming)`.
    #[must_use]
    pub fn transfer_pair(sender: AccountId, receiver: AccountId, value: i64) -> (Self, Self) {
        let outgoing = Self::outgoing(sender, value);
        let incoming = outgoing.incoming_counterpart(receiver);
        (outgoing, incoming)
    }

    /// The signed amount this leg contributes to its account's history:
    /// negative for `Outgoing`, positive otherwise.
    #[must_use]
    pub const fn signed_value(&self) -> i64 {
        match self.kind {
            MutationKind::Outgoing => -self.value,
            MutationKind::Topup | MutationKind::Incoming => self.value,
        }
    }
}

/// Kind of mutation log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    /// Value added from outside the ledger.
    Topup,

    /// Sender leg of a transfer.
    Outgoing,

    /// Receiver leg of a transfer.
    Incoming,
}

impl MutationKind {
    /// Stable lowercase name, as persisted in the store.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Topup => "topup",
            Self::Outgoing => "outgoing",
            Self::Incoming => "incoming",
        }
    }

    /// Check if this leg debits its account.
    #[must_use]
    pub const fn is_debit(&self) -> bool {
        matches!(self, Self::Outgoing)
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MutationKind {
    type Err = UnknownMutationKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "topup" => Ok(Self::Topup),
            "outgoing" => Ok(Self::Outgoing),
            "incoming" => Ok(Self::Incoming),
            other => Err(UnknownMutationKind(other.to_string())),
        }
    }
}

/// Error returned when decoding an unknown mutation kind from the store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mutation kind: {0}")]
pub struct UnknownMutationKind(pub String);
