//! Integer-versioned, idempotent schema migrations applied ascending from
//! the current `schema_version` row, one transaction per migration.

use anyhow::{Context, Result};

use crate::DbPool;

/// `(version, postgres_sql, sqlite_sql)`. Each statement set uses
/// `CREATE TABLE IF NOT EXISTS` / `CREATE INDEX IF NOT EXISTS` so re-running
/// an already-applied migration is a no-op.
pub const MIGRATIONS: &[(i64, &str, &str)] = &[
    (
        1,
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            sentinel_id INTEGER PRIMARY KEY,
            version BIGINT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS jobs (
            job_id TEXT PRIMARY KEY,
            status TEXT NOT NULL,
            total BIGINT NOT NULL,
            completed BIGINT NOT NULL DEFAULT 0,
            successful BIGINT NOT NULL DEFAULT 0,
            progress BIGINT NOT NULL DEFAULT 0,
            errors TEXT NOT NULL DEFAULT '[]',
            current_ticker TEXT,
            current_index BIGINT,
            message TEXT NOT NULL DEFAULT '',
            cancel_requested BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL,
            started_at TIMESTAMPTZ,
            updated_at TIMESTAMPTZ NOT NULL,
            completed_at TIMESTAMPTZ
        );
        CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status);
        CREATE TABLE IF NOT EXISTS analysis_results (
            id BIGSERIAL PRIMARY KEY,
            ticker TEXT NOT NULL,
            symbol TEXT NOT NULL,
            job_id TEXT,
            source TEXT NOT NULL,
            raw_data TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            UNIQUE(ticker, job_id)
        );
        CREATE INDEX IF NOT EXISTS idx_analysis_results_ticker_created
            ON analysis_results(ticker, created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_analysis_results_job_id ON analysis_results(job_id);
        CREATE TABLE IF NOT EXISTS watchlist (
            id BIGSERIAL PRIMARY KEY,
            ticker TEXT NOT NULL UNIQUE,
            symbol TEXT NOT NULL,
            notes TEXT,
            created_at TIMESTAMPTZ NOT NULL
        );
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            sentinel_id INTEGER PRIMARY KEY,
            version INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS jobs (
            job_id TEXT PRIMARY KEY,
            status TEXT NOT NULL,
            total INTEGER NOT NULL,
            completed INTEGER NOT NULL DEFAULT 0,
            successful INTEGER NOT NULL DEFAULT 0,
            progress INTEGER NOT NULL DEFAULT 0,
            errors TEXT NOT NULL DEFAULT '[]',
            current_ticker TEXT,
            current_index INTEGER,
            message TEXT NOT NULL DEFAULT '',
            cancel_requested INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            started_at TEXT,
            updated_at TEXT NOT NULL,
            completed_at TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status);
        CREATE TABLE IF NOT EXISTS analysis_results (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ticker TEXT NOT NULL,
            symbol TEXT NOT NULL,
            job_id TEXT,
            source TEXT NOT NULL,
            raw_data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE(ticker, job_id)
        );
        CREATE INDEX IF NOT EXISTS idx_analysis_results_ticker_created
            ON analysis_results(ticker, created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_analysis_results_job_id ON analysis_results(job_id);
        CREATE TABLE IF NOT EXISTS watchlist (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ticker TEXT NOT NULL UNIQUE,
            symbol TEXT NOT NULL,
            notes TEXT,
            created_at TEXT NOT NULL
        );
        "#,
    ),
    (
        2,
        r#"
        CREATE TABLE IF NOT EXISTS stocks_catalogue (
            ticker TEXT PRIMARY KEY,
            symbol TEXT NOT NULL,
            name TEXT NOT NULL
        );
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS stocks_catalogue (
            ticker TEXT PRIMARY KEY,
            symbol TEXT NOT NULL,
            name TEXT NOT NULL
        );
        "#,
    ),
];

pub async fn current_version(pool: &DbPool) -> Result<i64> {
    let row = pool
        .query_one(
            "SELECT version FROM schema_version WHERE sentinel_id = 1",
            &[],
        )
        .await;
    match row {
        Ok(Some(r)) => r.int("version"),
        // schema_version table itself may not exist yet on a brand-new database.
        _ => Ok(0),
    }
}

pub async fn run(pool: &DbPool) -> Result<()> {
    // migration 1 creates schema_version, so bootstrap it unconditionally
    // before checking the current version.
    apply_statement_block(pool, 1).await?;
    bump_version_if_absent(pool).await?;

    let current = current_version(pool).await?;
    for (version, pg_sql, sqlite_sql) in MIGRATIONS {
        if *version <= current {
            continue;
        }
        let sql = match pool.dialect() {
            crate::rewrite::Dialect::Postgres => pg_sql,
            crate::rewrite::Dialect::Sqlite => sqlite_sql,
        };
        run_statement_batch(pool, sql)
            .await
            .with_context(|| format!("apply migration {version}"))?;
        set_version(pool, *version).await?;
    }
    Ok(())
}

async fn apply_statement_block(pool: &DbPool, version: i64) -> Result<()> {
    let (_, pg_sql, sqlite_sql) = MIGRATIONS
        .iter()
        .find(|(v, _, _)| *v == version)
        .expect("bootstrap migration must exist");
    let sql = match pool.dialect() {
        crate::rewrite::Dialect::Postgres => pg_sql,
        crate::rewrite::Dialect::Sqlite => sqlite_sql,
    };
    run_statement_batch(pool, sql).await
}

async fn bump_version_if_absent(pool: &DbPool) -> Result<()> {
    let exists = pool
        .query_one("SELECT sentinel_id FROM schema_version WHERE sentinel_id = 1", &[])
        .await?
        .is_some();
    if !exists {
        set_version(pool, 1).await?;
    }
    Ok(())
}

async fn set_version(pool: &DbPool, version: i64) -> Result<()> {
    match pool.dialect() {
        crate::rewrite::Dialect::Postgres => {
            pool.execute(
                "INSERT INTO schema_version (sentinel_id, version) VALUES (1, ?) \
                 ON CONFLICT (sentinel_id) DO UPDATE SET version = excluded.version",
                &[version.into()],
            )
            .await?;
        }
        crate::rewrite::Dialect::Sqlite => {
            pool.execute(
                "INSERT INTO schema_version (sentinel_id, version) VALUES (1, ?) \
                 ON CONFLICT (sentinel_id) DO UPDATE SET version = excluded.version",
                &[version.into()],
            )
            .await?;
        }
    }
    Ok(())
}

/// Splits a multi-statement migration block on `;` and runs each statement
/// in turn. Good enough here because migration SQL never embeds a literal
/// semicolon inside a string.
async fn run_statement_batch(pool: &DbPool, sql: &str) -> Result<()> {
    for stmt in sql.split(';') {
        let stmt = stmt.trim();
        if stmt.is_empty() {
            continue;
        }
        pool.execute(stmt, &[]).await?;
    }
    Ok(())
}
