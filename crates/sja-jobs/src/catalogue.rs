//! Read-only stocks catalogue: the "universe" of recognized tickers that
//! backs `GET /api/stocks/all` and "analyze all" universe resolution
//! (spec §4.7 "Analyze all" semantics).

use sja_db::DbPool;
use sja_schemas::StockEntry;

pub struct StockCatalogueStore {
    pool: DbPool,
}

pub struct CataloguePage {
    pub entries: Vec<StockEntry>,
    pub total: u64,
}

impl StockCatalogueStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn list_paged(&self, page: u32, per_page: u32) -> anyhow::Result<CataloguePage> {
        let total_row = self
            .pool
            .query_one("SELECT COUNT(*) AS n FROM stocks_catalogue", &[])
            .await?;
        let total = total_row.map(|r| r.int("n").unwrap_or(0)).unwrap_or(0).max(0) as u64;

        let offset = (page.saturating_sub(1)) as i64 * per_page as i64;
        let rows = self
            .pool
            .query(
                "SELECT * FROM stocks_catalogue ORDER BY ticker ASC LIMIT ? OFFSET ?",
                &[(per_page as i64).into(), offset.into()],
            )
            .await?;
        let entries = rows
            .iter()
            .map(|row| {
                Ok(StockEntry {
                    ticker: row.text("ticker")?,
                    symbol: row.text("symbol")?,
                    name: row.text("name")?,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(CataloguePage { entries, total })
    }

    /// Full set of tickers, used to resolve the "analyze all" universe.
    /// Ordering matches `list_paged` so bulk-job dispatch order is stable.
    pub async fn all_tickers(&self) -> anyhow::Result<Vec<String>> {
        let rows = self
            .pool
            .query("SELECT ticker FROM stocks_catalogue ORDER BY ticker ASC", &[])
            .await?;
        rows.iter().map(|row| row.text("ticker")).collect()
    }

    pub async fn count(&self) -> anyhow::Result<u64> {
        let row = self
            .pool
            .query_one("SELECT COUNT(*) AS n FROM stocks_catalogue", &[])
            .await?;
        Ok(row.map(|r| r.int("n").unwrap_or(0)).unwrap_or(0).max(0) as u64)
    }

    /// Inserts an entry if its ticker is not already present; used by
    /// startup seeding and tests. Not part of the public HTTP surface.
    pub async fn upsert(&self, entry: &StockEntry) -> anyhow::Result<()> {
        self.pool
            .execute(
                "INSERT INTO stocks_catalogue (ticker, symbol, name) VALUES (?, ?, ?) \
                 ON CONFLICT (ticker) DO UPDATE SET symbol = excluded.symbol, name = excluded.name",
                &[entry.ticker.as_str().into(), entry.symbol.as_str().into(), entry.name.as_str().into()],
            )
            .await?;
        Ok(())
    }
}
