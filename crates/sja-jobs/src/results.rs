//! Result store (C4): per-ticker analysis documents keyed by
//! `(ticker, job_id)`, queryable by history (most-recent-first) and by
//! page (spec §4.4).

use chrono::Utc;
use sja_db::DbPool;
use sja_schemas::{AnalysisResult, ResultSource};

use crate::error::ResultStoreError;

pub struct ResultStore {
    pool: DbPool,
}

/// A page of history results plus the total row count, so the caller can
/// build a `Pagination` envelope without a second round trip's caller-side
/// bookkeeping.
pub struct HistoryPage {
    pub results: Vec<AnalysisResult>,
    pub total: u64,
}

impl ResultStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        ticker: &str,
        symbol: &str,
        job_id: Option<&str>,
        source: ResultSource,
        raw_data: &serde_json::Value,
    ) -> Result<AnalysisResult, ResultStoreError> {
        let now = Utc::now();
        let raw_json = serde_json::to_string(raw_data)
            .map_err(|e| ResultStoreError::Backend(anyhow::anyhow!(e)))?;

        let result = self
            .pool
            .execute(
                "INSERT INTO analysis_results (ticker, symbol, job_id, source, raw_data, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?)",
                &[
                    ticker.into(),
                    symbol.into(),
                    job_id.into(),
                    source.as_str().into(),
                    raw_json.into(),
                    now.to_rfc3339().into(),
                ],
            )
            .await;

        match result {
            Ok(_) => {}
            Err(e) if sja_db::is_unique_violation(&e, "ticker") => {
                return Err(ResultStoreError::Duplicate {
                    ticker: ticker.to_string(),
                    job_id: job_id.map(str::to_string),
                })
            }
            Err(e) => return Err(ResultStoreError::Backend(e)),
        }

        self.fetch_one(ticker, job_id).await
    }

    async fn fetch_one(
        &self,
        ticker: &str,
        job_id: Option<&str>,
    ) -> Result<AnalysisResult, ResultStoreError> {
        let row = match job_id {
            Some(job_id) => self
                .pool
                .query_one(
                    "SELECT * FROM analysis_results WHERE ticker = ? AND job_id = ?",
                    &[ticker.into(), job_id.into()],
                )
                .await?,
            None => self
                .pool
                .query_one(
                    "SELECT * FROM analysis_results WHERE ticker = ? AND job_id IS NULL \
                     ORDER BY created_at DESC",
                    &[ticker.into()],
                )
                .await?,
        };
        let row = row.ok_or_else(|| {
            ResultStoreError::Backend(anyhow::anyhow!("inserted row vanished before read-back"))
        })?;
        row_to_result(&row).map_err(ResultStoreError::Backend)
    }

    /// Most recent `limit` rows for `ticker`, newest first. A thin wrapper
    /// over [`Self::history_paged`] with `page=1`.
    pub async fn history(
        &self,
        ticker: &str,
        limit: u32,
    ) -> Result<Vec<AnalysisResult>, ResultStoreError> {
        Ok(self.history_paged(ticker, 1, limit).await?.results)
    }

    pub async fn history_paged(
        &self,
        ticker: &str,
        page: u32,
        per_page: u32,
    ) -> Result<HistoryPage, ResultStoreError> {
        let total_row = self
            .pool
            .query_one(
                "SELECT COUNT(*) AS n FROM analysis_results WHERE ticker = ?",
                &[ticker.into()],
            )
            .await?;
        let total = total_row
            .map(|r| r.int("n").unwrap_or(0))
            .unwrap_or(0)
            .max(0) as u64;

        let offset = (page.saturating_sub(1)) as i64 * per_page as i64;
        let rows = self
            .pool
            .query(
                "SELECT * FROM analysis_results WHERE ticker = ? \
                 ORDER BY created_at DESC LIMIT ? OFFSET ?",
                &[ticker.into(), (per_page as i64).into(), offset.into()],
            )
            .await?;

        let results = rows
            .iter()
            .map(row_to_result)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(HistoryPage { results, total })
    }
}

fn row_to_result(row: &sja_db::NormalizedRow) -> anyhow::Result<AnalysisResult> {
    Ok(AnalysisResult {
        id: row.int("id")?,
        ticker: row.text("ticker")?,
        symbol: row.text("symbol")?,
        job_id: row.opt_text("job_id"),
        source: ResultSource::parse(&row.text("source")?)
            .ok_or_else(|| anyhow::anyhow!("invalid source in row"))?,
        raw_data: row.json("raw_data")?,
        created_at: row.timestamp("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn test_pool() -> DbPool {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.sqlite3");
        let pool = DbPool::connect(None, &path).await.unwrap();
        pool.migrate().await.unwrap();
        std::mem::forget(dir);
        pool
    }

    #[tokio::test]
    async fn insert_then_history_round_trips() {
        let store = ResultStore::new(test_pool().await);
        let doc = json!({"score": 72.0, "verdict": "Buy"});
        store
            .insert("AAA", "AAA", Some("job-1"), ResultSource::Bulk, &doc)
            .await
            .unwrap();

        let history = store.history("AAA", 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].ticker, "AAA");
        assert_eq!(history[0].raw_data["score"], 72.0);
    }

    #[tokio::test]
    async fn duplicate_ticker_job_id_is_rejected() {
        let store = ResultStore::new(test_pool().await);
        let doc = json!({});
        store
            .insert("BBB", "BBB", Some("job-2"), ResultSource::Bulk, &doc)
            .await
            .unwrap();
        let result = store
            .insert("BBB", "BBB", Some("job-2"), ResultSource::Bulk, &doc)
            .await;
        assert!(matches!(result, Err(ResultStoreError::Duplicate { .. })));
    }

    #[tokio::test]
    async fn same_ticker_different_job_is_allowed() {
        let store = ResultStore::new(test_pool().await);
        let doc = json!({});
        store
            .insert("CCC", "CCC", Some("job-a"), ResultSource::Bulk, &doc)
            .await
            .unwrap();
        store
            .insert("CCC", "CCC", Some("job-b"), ResultSource::Bulk, &doc)
            .await
            .unwrap();
        let history = store.history("CCC", 10).await.unwrap();
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn pagination_reports_total_and_pages() {
        let store = ResultStore::new(test_pool().await);
        for i in 0..5 {
            let doc = json!({"i": i});
            store
                .insert("DDD", "DDD", Some(&format!("job-{i}")), ResultSource::Bulk, &doc)
                .await
                .unwrap();
        }
        let page = store.history_paged("DDD", 1, 2).await.unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.results.len(), 2);
    }
}
