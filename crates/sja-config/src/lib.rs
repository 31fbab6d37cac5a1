//! Environment-driven configuration for the analysis job engine.
//!
//! Every field has a documented default except [`Config::api_key`], which is
//! mandatory outside [`RunMode::Dev`] — an engine started in `prod`/`staging`
//! without a key fails fast at boot rather than serving unauthenticated.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

/// Selects which OHLCV data-fetch implementation the orchestrator uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFetchMode {
    /// Hit the real upstream provider.
    Live,
    /// Deterministic synthetic bars; no network calls. Used for local dev
    /// and for tests that must not depend on an external service.
    Demo,
}

impl DataFetchMode {
    fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "live" => Ok(DataFetchMode::Live),
            "demo" => Ok(DataFetchMode::Demo),
            other => bail!("invalid DATA_FETCH_MODE: {other} (expected live|demo)"),
        }
    }
}

/// The environment the process is running in. `Dev` relaxes the mandatory
/// API key requirement; every other mode enforces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Dev,
    Staging,
    Prod,
}

impl RunMode {
    fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(RunMode::Dev),
            "staging" => Ok(RunMode::Staging),
            "prod" | "production" => Ok(RunMode::Prod),
            other => bail!("invalid RUN_MODE: {other} (expected dev|staging|prod)"),
        }
    }
}

/// Fully resolved process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub run_mode: RunMode,
    /// `None` selects the embedded backend; `Some(url)` selects the server
    /// backend when `url` has a `postgres://`/`postgresql://` scheme.
    pub database_url: Option<String>,
    /// File path for the embedded backend when `database_url` is `None`.
    pub embedded_db_path: PathBuf,
    pub api_key: Option<String>,
    pub cors_origins: Vec<String>,
    pub worker_pool_size: usize,
    pub ticker_timeout_secs: u64,
    pub rate_limit_enabled: bool,
    pub rate_limit_per_minute: u32,
    pub log_dir: Option<PathBuf>,
    pub data_fetch_mode: DataFetchMode,
    pub bulk_universe_cap: usize,
    pub errors_cap: usize,
    pub bind_addr: SocketAddr,
}

impl Config {
    /// Reads configuration from process environment variables. Callers are
    /// expected to have already loaded a `.env.local` file (if any) via
    /// `dotenvy` before calling this, matching the dev bootstrap convention
    /// used by the daemon binary.
    pub fn from_env() -> Result<Self> {
        let run_mode = env_opt("RUN_MODE")
            .map(|s| RunMode::parse(&s))
            .transpose()?
            .unwrap_or(RunMode::Dev);

        let database_url = env_opt("DATABASE_URL");

        let embedded_db_path = env_opt("EMBEDDED_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data/analysis_engine.sqlite3"));

        let api_key = env_opt("API_KEY");
        if api_key.is_none() && run_mode != RunMode::Dev {
            bail!("API_KEY is required outside RUN_MODE=dev");
        }

        let cors_origins = env_opt("CORS_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_else(|| vec!["http://localhost:3000".to_string()]);

        let worker_pool_size = env_parsed("WORKER_POOL_SIZE")?.unwrap_or(10usize);
        if worker_pool_size == 0 {
            bail!("WORKER_POOL_SIZE must be >= 1");
        }

        let ticker_timeout_secs = env_parsed("TICKER_TIMEOUT_SECS")?.unwrap_or(60u64);

        let rate_limit_enabled = env_parsed("RATE_LIMIT_ENABLED")?.unwrap_or(true);
        let rate_limit_per_minute = env_parsed("RATE_LIMIT_PER_MINUTE")?.unwrap_or(120u32);

        let log_dir = env_opt("LOG_DIR").map(PathBuf::from);

        let data_fetch_mode = env_opt("DATA_FETCH_MODE")
            .map(|s| DataFetchMode::parse(&s))
            .transpose()?
            .unwrap_or(DataFetchMode::Demo);

        let bulk_universe_cap = env_parsed("BULK_UNIVERSE_CAP")?.unwrap_or(500usize);
        let errors_cap = env_parsed("ERRORS_CAP")?.unwrap_or(1000usize);

        let bind_addr = env_opt("BIND_ADDR")
            .map(|s| s.parse::<SocketAddr>())
            .transpose()
            .context("BIND_ADDR must be a valid socket address (host:port)")?
            .unwrap_or_else(|| "127.0.0.1:8899".parse().unwrap());

        Ok(Config {
            run_mode,
            database_url,
            embedded_db_path,
            api_key,
            cors_origins,
            worker_pool_size,
            ticker_timeout_secs,
            rate_limit_enabled,
            rate_limit_per_minute,
            log_dir,
            data_fetch_mode,
            bulk_universe_cap,
            errors_cap,
            bind_addr,
        })
    }

    pub fn uses_server_backend(&self) -> bool {
        matches!(&self.database_url, Some(url) if url.starts_with("postgres://") || url.starts_with("postgresql://"))
    }
}

impl PartialEq for RunMode {
    fn eq(&self, other: &Self) -> bool {
        matches!(
            (self, other),
            (RunMode::Dev, RunMode::Dev)
                | (RunMode::Staging, RunMode::Staging)
                | (RunMode::Prod, RunMode::Prod)
        )
    }
}
impl Eq for RunMode {}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match env_opt(key) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("invalid {key}: {e}")),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variable mutation is process-global; serialize tests that
    // touch it so they don't interleave.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_all() {
        for k in [
            "RUN_MODE",
            "DATABASE_URL",
            "EMBEDDED_DB_PATH",
            "API_KEY",
            "CORS_ORIGINS",
            "WORKER_POOL_SIZE",
            "TICKER_TIMEOUT_SECS",
            "RATE_LIMIT_ENABLED",
            "RATE_LIMIT_PER_MINUTE",
            "LOG_DIR",
            "DATA_FETCH_MODE",
            "BULK_UNIVERSE_CAP",
            "ERRORS_CAP",
            "BIND_ADDR",
        ] {
            std::env::remove_var(k);
        }
    }

    #[test]
    fn defaults_apply_in_dev_mode() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.worker_pool_size, 10);
        assert_eq!(cfg.ticker_timeout_secs, 60);
        assert_eq!(cfg.bulk_universe_cap, 500);
        assert!(cfg.api_key.is_none());
        assert!(!cfg.uses_server_backend());
    }

    #[test]
    fn missing_api_key_fails_outside_dev() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        std::env::set_var("RUN_MODE", "prod");
        let result = Config::from_env();
        assert!(result.is_err());
        clear_all();
    }

    #[test]
    fn postgres_url_selects_server_backend() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        std::env::set_var("DATABASE_URL", "postgres://localhost/analysis");
        let cfg = Config::from_env().unwrap();
        assert!(cfg.uses_server_backend());
        clear_all();
    }

    #[test]
    fn zero_pool_size_is_rejected() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        std::env::set_var("WORKER_POOL_SIZE", "0");
        let result = Config::from_env();
        assert!(result.is_err());
        clear_all();
    }
}
