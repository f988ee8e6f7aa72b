//! Key/value read cache for the tally ledger.
//!
//! The cache is strictly an optimization: entries are derived, disposable,
//! and never authoritative. Callers must treat [`Lookup::Miss`] as "go to
//! the store", never as a zero value, and a lookup *failure* is a separate
//! [`CacheError`]; absence and failure are never conflated in one value.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use tally_cache::{Cache, Lookup, MemoryCache};
//!
//! let cache = MemoryCache::with_defaults();
//! cache.set("balance:alice", b"50000", Duration::from_secs(60)).unwrap();
//!
//! match cache.get("balance:alice").unwrap() {
//!     Lookup::Hit(bytes) => assert_eq!(bytes, b"50000"),
//!     Lookup::Miss => unreachable!("just set"),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;

pub use error::{CacheError, Result};
pub use memory::MemoryCache;

use std::time::Duration;

/// Result of a cache lookup.
///
/// A miss is an ordinary outcome on the read path, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// The key was present and unexpired.
    Hit(Vec<u8>),

    /// The key was absent or expired. Recompute from the store.
    Miss,
}

impl Lookup {
    /// Check if this lookup hit.
    #[must_use]
    pub const fn is_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }
}

/// The cache layer contract.
///
/// Implementations must be safe for concurrent use from many request-scoped
/// operations at once. Writes that change a value underlying a cached key
/// must [`delete`](Cache::delete) that key synchronously with the committing
/// write; the deletion failing is a staleness-window bug to log, never a
/// reason to fail the write itself.
pub trait Cache: Send + Sync {
    /// Look up a key.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache backend fails. Absence is reported as
    /// [`Lookup::Miss`], not as an error.
    fn get(&self, key: &str) -> Result<Lookup>;

    /// Store a value under `key` for at most `ttl`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache backend fails.
    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()>;

    /// Drop a key. Deleting an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache backend fails.
    fn delete(&self, key: &str) -> Result<()>;
}
