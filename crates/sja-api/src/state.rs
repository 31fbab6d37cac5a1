//! Shared application state: the job controller, watchlist store, and the
//! rate-limit bookkeeping map (spec §5 "Shared-resource policy").

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};
use sja_config::Config;
use sja_db::DbPool;
use sja_jobs::{JobController, WatchlistStore};
use sja_md::{DemoProvider, LiveProvider, Provider};

/// Fixed-window request counter for one credential hash.
struct RateLimitBucket {
    window_start: Instant,
    count: u32,
}

pub struct AppState {
    pub config: Config,
    pub pool: DbPool,
    pub controller: JobController,
    pub watchlist: WatchlistStore,
    rate_limits: Mutex<HashMap<String, RateLimitBucket>>,
}

impl AppState {
    pub fn new(config: Config, pool: DbPool) -> Self {
        let provider: Arc<dyn Provider> = match config.data_fetch_mode {
            sja_config::DataFetchMode::Demo => Arc::new(DemoProvider::new()),
            sja_config::DataFetchMode::Live => Arc::new(LiveProvider::new("https://api.example-marketdata.invalid")),
        };
        let controller = JobController::new(
            pool.clone(),
            provider,
            config.worker_pool_size,
            Duration::from_secs(config.ticker_timeout_secs),
            config.errors_cap,
            config.bulk_universe_cap,
        );
        let watchlist = WatchlistStore::new(pool.clone());
        Self {
            config,
            pool,
            controller,
            watchlist,
            rate_limits: Mutex::new(HashMap::new()),
        }
    }

    /// Hashes the presented key with SHA-256 so the raw credential never
    /// lands in the rate-limit map (spec §5).
    pub fn hash_credential(key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn api_key_matches(&self, presented: &str) -> bool {
        match &self.config.api_key {
            Some(expected) => constant_time_eq(expected.as_bytes(), presented.as_bytes()),
            // RUN_MODE=dev with no configured key accepts any non-empty key.
            None => !presented.is_empty(),
        }
    }

    /// Returns `true` if the request under `key_hash` is allowed, advancing
    /// or resetting that bucket's fixed window as a side effect. Also
    /// evicts any other bucket whose window has expired, done lazily here
    /// rather than via a separate timer task (spec §5, `SPEC_FULL.md` §5).
    pub fn check_rate_limit(&self, key_hash: &str) -> bool {
        if !self.config.rate_limit_enabled {
            return true;
        }
        let window = Duration::from_secs(60);
        let now = Instant::now();
        let mut buckets = self.rate_limits.lock().unwrap();
        buckets.retain(|_, b| now.duration_since(b.window_start) < window);

        match buckets.get_mut(key_hash) {
            Some(bucket) => {
                if bucket.count >= self.config.rate_limit_per_minute {
                    false
                } else {
                    bucket.count += 1;
                    true
                }
            }
            None => {
                buckets.insert(
                    key_hash.to_string(),
                    RateLimitBucket {
                        window_start: now,
                        count: 1,
                    },
                );
                true
            }
        }
    }
}

/// Avoids short-circuiting on the first differing byte when comparing the
/// presented key against the configured one.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_hash_is_deterministic_and_not_the_raw_key() {
        let h1 = AppState::hash_credential("secret-key");
        let h2 = AppState::hash_credential("secret-key");
        assert_eq!(h1, h2);
        assert_ne!(h1, "secret-key");
        assert_eq!(h1.len(), 64);
    }

    #[test]
    fn constant_time_eq_matches_equal_slices() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
    }
}
