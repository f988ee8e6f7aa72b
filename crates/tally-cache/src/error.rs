//! Error types for the cache layer.

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors that can occur in cache operations.
///
/// The in-process backend is infallible in practice; the variant exists so
/// remote backends behind the same trait can report transport failures
/// without overloading the miss path.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The cache backend failed.
    #[error("cache backend error: {0}")]
    Backend(String),
}
