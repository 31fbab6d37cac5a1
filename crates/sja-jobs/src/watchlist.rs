//! Watchlist store (C5): membership CRUD keyed by `ticker` (spec §3/§4.5).

use chrono::Utc;
use sja_db::DbPool;
use sja_schemas::WatchlistItem;

use crate::error::WatchlistStoreError;

/// Notes are sanitized text capped at this length (spec §3).
const NOTES_MAX_LEN: usize = 500;

pub struct WatchlistStore {
    pool: DbPool,
}

impl WatchlistStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn add(
        &self,
        ticker: &str,
        symbol: &str,
        notes: Option<&str>,
    ) -> Result<WatchlistItem, WatchlistStoreError> {
        let notes = notes.map(|n| {
            if n.len() > NOTES_MAX_LEN {
                n[..NOTES_MAX_LEN].to_string()
            } else {
                n.to_string()
            }
        });
        let now = Utc::now();

        let result = self
            .pool
            .execute(
                "INSERT INTO watchlist (ticker, symbol, notes, created_at) VALUES (?, ?, ?, ?)",
                &[ticker.into(), symbol.into(), notes.into(), now.to_rfc3339().into()],
            )
            .await;

        match result {
            Ok(_) => {}
            Err(e) if sja_db::is_unique_violation(&e, "ticker") => {
                return Err(WatchlistStoreError::Duplicate(ticker.to_string()))
            }
            Err(e) => return Err(WatchlistStoreError::Backend(e)),
        }

        let row = self
            .pool
            .query_one("SELECT * FROM watchlist WHERE ticker = ?", &[ticker.into()])
            .await?
            .ok_or_else(|| {
                WatchlistStoreError::Backend(anyhow::anyhow!(
                    "inserted watchlist row vanished before read-back"
                ))
            })?;
        row_to_item(&row).map_err(WatchlistStoreError::Backend)
    }

    pub async fn remove(&self, ticker: &str) -> Result<(), WatchlistStoreError> {
        let affected = self
            .pool
            .execute("DELETE FROM watchlist WHERE ticker = ?", &[ticker.into()])
            .await?;
        if affected == 0 {
            return Err(WatchlistStoreError::NotFound(ticker.to_string()));
        }
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<WatchlistItem>, WatchlistStoreError> {
        let rows = self
            .pool
            .query("SELECT * FROM watchlist ORDER BY created_at DESC", &[])
            .await?;
        rows.iter()
            .map(row_to_item)
            .collect::<anyhow::Result<Vec<_>>>()
            .map_err(WatchlistStoreError::Backend)
    }
}

fn row_to_item(row: &sja_db::NormalizedRow) -> anyhow::Result<WatchlistItem> {
    Ok(WatchlistItem {
        id: row.int("id")?,
        ticker: row.text("ticker")?,
        symbol: row.text("symbol")?,
        notes: row.opt_text("notes"),
        created_at: row.timestamp("created_at")?,
    })
}
