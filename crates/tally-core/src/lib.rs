//! Core types for the tally ledger.
//!
//! This crate provides the foundational types used throughout the ledger:
//!
//! - **Identifiers**: `AccountId`, `RefId`, `MutationId`
//! - **Accounts**: `Account`, `OutgoingTotal`
//! - **Mutation log**: `Mutation`, `MutationKind`
//! - **Views**: `TopTransaction`, `TopUser`
//! - **Identity**: `Caller`
//!
//! # Monetary unit
//!
//! All values are `i64` in the smallest currency unit. Balances never drop
//! below zero at a committed state; mutation values are always positive.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod error;
pub mod identity;
pub mod ids;
pub mod mutation;
pub mod views;

pub use account::{Account, OutgoingTotal};
pub use error::{LedgerError, Result};
pub use identity::Caller;
pub use ids::{AccountId, IdError, MutationId, RefId};
pub use mutation::{Mutation, MutationKind, UnknownMutationKind};
pub use views::{TopTransaction, TopUser, TOP_LIMIT};
