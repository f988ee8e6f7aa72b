//! Transfer protocol and cached aggregation queries for the tally ledger.
//!
//! [`Ledger`] is the engine's single entry point: it owns nothing but
//! handles (an [`Arc<dyn Store>`](tally_store::Store) for the relational
//! store of record and an [`Arc<dyn Cache>`](tally_cache::Cache) for the
//! disposable read cache) and orchestrates the transfer protocol and the
//! cached leaderboard/history views over them.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tally_cache::MemoryCache;
//! use tally_core::Caller;
//! use tally_ledger::{Ledger, LedgerConfig};
//! use tally_store::MemStore;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> tally_core::Result<()> {
//! let ledger = Ledger::new(
//!     Arc::new(MemStore::new()),
//!     Arc::new(MemoryCache::with_defaults()),
//!     LedgerConfig::default(),
//! );
//!
//! let alice = ledger.create_account("alice").await?;
//! let caller = Caller::new(alice.id, &alice.username);
//! ledger.topup(&caller, 50_000).await?;
//! assert_eq!(ledger.balance(&caller).await?, 50_000);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod keys;
pub mod ledger;

pub use config::LedgerConfig;
pub use ledger::Ledger;
