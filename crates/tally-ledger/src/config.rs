//! Engine configuration.

use std::time::Duration;

/// Default TTL for cached balances.
const DEFAULT_BALANCE_TTL_SECS: u64 = 60;

/// Default TTL for cached per-account transaction history.
const DEFAULT_HISTORY_TTL_SECS: u64 = 30;

/// Default TTL for the cached leaderboard.
const DEFAULT_LEADERBOARD_TTL_SECS: u64 = 30;

/// Cache TTLs for the engine's read views.
///
/// TTLs only bound how long a *stale-after-crash* entry can live; under
/// normal operation every committing write invalidates its keys
/// synchronously, so these can be generous without serving stale data.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// TTL for cached balance entries.
    pub balance_ttl: Duration,

    /// TTL for cached per-account history views.
    pub history_ttl: Duration,

    /// TTL for the cached leaderboard.
    pub leaderboard_ttl: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            balance_ttl: Duration::from_secs(DEFAULT_BALANCE_TTL_SECS),
            history_ttl: Duration::from_secs(DEFAULT_HISTORY_TTL_SECS),
            leaderboard_ttl: Duration::from_secs(DEFAULT_LEADERBOARD_TTL_SECS),
        }
    }
}

impl LedgerConfig {
    /// Load configuration from environment variables, falling back to the
    /// defaults for anything unset or unparsable.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            balance_ttl: ttl_from_env("TALLY_BALANCE_TTL_SECS", DEFAULT_BALANCE_TTL_SECS),
            history_ttl: ttl_from_env("TALLY_HISTORY_TTL_SECS", DEFAULT_HISTORY_TTL_SECS),
            leaderboard_ttl: ttl_from_env("TALLY_LEADERBOARD_TTL_SECS", DEFAULT_LEADERBOARD_TTL_SECS),
        }
    }
}

fn ttl_from_env(var: &str, default_secs: u64) -> Duration {
    Duration::from_secs(
        std::env::var(var)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(default_secs),
    )
}
