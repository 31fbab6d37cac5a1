//! Dual-backend persistence layer.
//!
//! An embedded SQLite file backs local/dev deployments; a Postgres server
//! backs production. Callers write SQL once using a single positional
//! placeholder token (`?`) and a [`DbPool`] rewrites it per backend before
//! executing. `schema_version`-tracked migrations and a bounded exponential
//! retry for transient errors live here too.

pub mod migrations;
pub mod retry;
pub mod rewrite;
pub mod row;

use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{PgPool, Row, SqlitePool};

pub use row::NormalizedRow;
pub use rewrite::rewrite_placeholders;

/// An owned, type-erased argument for a rewritten query. Mirrors the small
/// set of scalar types the job/result/watchlist stores actually bind.
#[derive(Debug, Clone)]
pub enum Param {
    Text(String),
    Int(i64),
    Bool(bool),
    Null,
}

impl From<&str> for Param {
    fn from(v: &str) -> Self {
        Param::Text(v.to_string())
    }
}
impl From<String> for Param {
    fn from(v: String) -> Self {
        Param::Text(v)
    }
}
impl From<i64> for Param {
    fn from(v: i64) -> Self {
        Param::Int(v)
    }
}
impl From<bool> for Param {
    fn from(v: bool) -> Self {
        Param::Bool(v)
    }
}
impl<T: Into<Param>> From<Option<T>> for Param {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Param::Null,
        }
    }
}

/// Connection pool for one of the two supported backends, selected once at
/// startup by [`DbPool::connect`] and never switched at runtime.
#[derive(Clone)]
pub enum DbPool {
    Postgres(PgPool),
    Sqlite(SqlitePool),
}

impl DbPool {
    pub fn dialect(&self) -> rewrite::Dialect {
        match self {
            DbPool::Postgres(_) => rewrite::Dialect::Postgres,
            DbPool::Sqlite(_) => rewrite::Dialect::Sqlite,
        }
    }

    /// Connects to the server backend when `database_url` looks like a
    /// Postgres URL, otherwise opens (and creates, if missing) the embedded
    /// SQLite file at `embedded_path`.
    pub async fn connect(database_url: Option<&str>, embedded_path: &Path) -> Result<Self> {
        match database_url {
            Some(url) if url.starts_with("postgres://") || url.starts_with("postgresql://") => {
                let pool = PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await
                    .context("connect to postgres")?;
                Ok(DbPool::Postgres(pool))
            }
            _ => {
                if let Some(parent) = embedded_path.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent).with_context(|| {
                            format!("create embedded db directory {}", parent.display())
                        })?;
                    }
                }
                let opts = SqliteConnectOptions::from_str(&format!(
                    "sqlite://{}",
                    embedded_path.display()
                ))?
                .create_if_missing(true);
                let pool = SqlitePoolOptions::new()
                    .max_connections(1)
                    .connect_with(opts)
                    .await
                    .context("open embedded sqlite database")?;
                Ok(DbPool::Sqlite(pool))
            }
        }
    }

    /// Runs every migration in [`migrations::MIGRATIONS`] whose version
    /// exceeds the current `schema_version`, each inside its own
    /// transaction, bumping the version atomically as part of that
    /// transaction.
    pub async fn migrate(&self) -> Result<()> {
        migrations::run(self).await
    }

    /// Executes a write (`INSERT`/`UPDATE`/`DELETE`) statement written with
    /// `?` placeholders, rewriting it for the connected backend first.
    /// Returns the number of rows affected.
    pub async fn execute(&self, sql: &str, args: &[Param]) -> Result<u64> {
        retry::with_retry(|| self.execute_once(sql, args)).await
    }

    async fn execute_once(&self, sql: &str, args: &[Param]) -> Result<u64> {
        let rewritten = rewrite::rewrite_placeholders(sql, self.dialect());
        match self {
            DbPool::Postgres(pool) => {
                let mut q = sqlx::query(&rewritten);
                for a in args {
                    q = bind_pg(q, a);
                }
                let res = q.execute(pool).await.context("execute (postgres)")?;
                Ok(res.rows_affected())
            }
            DbPool::Sqlite(pool) => {
                let mut q = sqlx::query(&rewritten);
                for a in args {
                    q = bind_sqlite(q, a);
                }
                let res = q.execute(pool).await.context("execute (sqlite)")?;
                Ok(res.rows_affected())
            }
        }
    }

    /// Runs a `SELECT` written with `?` placeholders and returns every
    /// matching row normalized to a lowercase-keyed mapping.
    pub async fn query(&self, sql: &str, args: &[Param]) -> Result<Vec<NormalizedRow>> {
        retry::with_retry(|| self.query_once(sql, args)).await
    }

    async fn query_once(&self, sql: &str, args: &[Param]) -> Result<Vec<NormalizedRow>> {
        let rewritten = rewrite::rewrite_placeholders(sql, self.dialect());
        match self {
            DbPool::Postgres(pool) => {
                let mut q = sqlx::query(&rewritten);
                for a in args {
                    q = bind_pg(q, a);
                }
                let rows: Vec<PgRow> = q.fetch_all(pool).await.context("query (postgres)")?;
                rows.iter().map(row::from_pg_row).collect()
            }
            DbPool::Sqlite(pool) => {
                let mut q = sqlx::query(&rewritten);
                for a in args {
                    q = bind_sqlite(q, a);
                }
                let rows: Vec<SqliteRow> = q.fetch_all(pool).await.context("query (sqlite)")?;
                rows.iter().map(row::from_sqlite_row).collect()
            }
        }
    }

    /// Runs `sql` and returns the single matching row, or `None`.
    pub async fn query_one(&self, sql: &str, args: &[Param]) -> Result<Option<NormalizedRow>> {
        Ok(self.query(sql, args).await?.into_iter().next())
    }

    /// True when the database is reachable.
    pub async fn health_check(&self) -> Result<()> {
        match self {
            DbPool::Postgres(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
            }
            DbPool::Sqlite(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
            }
        }
        Ok(())
    }

    pub async fn schema_version(&self) -> Result<i64> {
        migrations::current_version(self).await
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            DbPool::Postgres(_) => "postgres",
            DbPool::Sqlite(_) => "sqlite",
        }
    }
}

fn bind_pg<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    a: &'q Param,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    match a {
        Param::Text(s) => q.bind(s.as_str()),
        Param::Int(i) => q.bind(*i),
        Param::Bool(b) => q.bind(*b),
        Param::Null => q.bind(Option::<String>::None),
    }
}

fn bind_sqlite<'q>(
    q: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    a: &'q Param,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    match a {
        Param::Text(s) => q.bind(s.as_str()),
        Param::Int(i) => q.bind(*i),
        Param::Bool(b) => q.bind(*b),
        Param::Null => q.bind(Option::<String>::None),
    }
}

/// Returns `true` when `err` represents a unique-constraint violation whose
/// constraint name contains `constraint_name_contains`. Used by the
/// job/result/watchlist stores to turn a raw database error into a
/// domain-specific duplicate error.
pub fn is_unique_violation(err: &anyhow::Error, constraint_name_contains: &str) -> bool {
    if let Some(sqlx::Error::Database(db_err)) = err.downcast_ref::<sqlx::Error>() {
        let is_unique = db_err.code().as_deref() == Some("23505") // postgres
            || db_err.message().contains("UNIQUE constraint failed"); // sqlite
        let name_matches = db_err
            .constraint()
            .map(|c| c.contains(constraint_name_contains))
            .unwrap_or(true);
        return is_unique && name_matches;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn connects_to_embedded_backend_by_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.sqlite3");
        let pool = DbPool::connect(None, &path).await.unwrap();
        assert_eq!(pool.backend_name(), "sqlite");
        pool.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn non_postgres_url_falls_back_to_embedded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test2.sqlite3");
        let pool = DbPool::connect(Some(""), &path).await.unwrap();
        assert_eq!(pool.backend_name(), "sqlite");
    }

    #[tokio::test]
    async fn migrate_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test3.sqlite3");
        let pool = DbPool::connect(None, &path).await.unwrap();
        pool.migrate().await.unwrap();
        pool.migrate().await.unwrap();
        let version = pool.schema_version().await.unwrap();
        assert_eq!(version, migrations::MIGRATIONS.last().unwrap().0);
    }
}
