//! Database pool bootstrap for integration tests: an embedded SQLite file
//! in a scratch directory, fully migrated. The Postgres backend is exercised
//! the same way in CI via `DbPool::connect(Some(url), _)` against a
//! disposable test database; no fixture is needed there beyond a live URL.

use anyhow::Result;
use sja_db::DbPool;
use tempfile::TempDir;

/// Connects and migrates a fresh embedded-SQLite pool. The returned
/// [`TempDir`] must be kept alive for as long as the pool is in use — it
/// owns the directory the database file lives in.
pub async fn bootstrap_sqlite_pool() -> Result<(DbPool, TempDir)> {
    let dir = tempfile::tempdir()?;
    let pool = DbPool::connect(None, &dir.path().join("testkit.sqlite3")).await?;
    pool.migrate().await?;
    Ok((pool, dir))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bootstrap_produces_a_healthy_migrated_pool() {
        let (pool, _dir) = bootstrap_sqlite_pool().await.unwrap();
        pool.health_check().await.unwrap();
        assert!(pool.schema_version().await.unwrap() > 0);
    }
}
