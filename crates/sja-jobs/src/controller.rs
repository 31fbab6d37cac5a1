//! Job controller (C8, spec §4.7): the single entrypoint `sja-api` calls
//! to submit, cancel, and inspect jobs. Binds the worker pool (C7) to the
//! job and result stores (C3/C4).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use sja_db::DbPool;
use sja_md::{DataPeriod, Provider};
use sja_orchestrator::AnalysisFault;
use sja_schemas::{Job, ResultSource};
use sja_scheduler::{ItemOutcome, WorkerPool};
use sja_strategy::StrategyConfig;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::catalogue::StockCatalogueStore;
use crate::error::JobStoreError;
use crate::results::ResultStore;
use crate::store::JobStore;

#[derive(Debug)]
pub enum ControllerError {
    /// Empty ticker list on a non-bulk request, or any other request-shape
    /// problem the caller should surface as `VALIDATION_ERROR`.
    Validation(String),
    /// "Analyze all" resolved a universe larger than `bulk_universe_cap`.
    BulkUniverseTooLarge { cap: usize, total: usize },
    Store(JobStoreError),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::Validation(msg) => write!(f, "validation error: {msg}"),
            ControllerError::BulkUniverseTooLarge { cap, total } => write!(
                f,
                "universe size {total} exceeds bulk analysis cap {cap}"
            ),
            ControllerError::Store(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ControllerError {}

impl From<JobStoreError> for ControllerError {
    fn from(e: JobStoreError) -> Self {
        ControllerError::Store(e)
    }
}

pub struct JobController {
    jobs: Arc<JobStore>,
    results: Arc<ResultStore>,
    catalogue: Arc<StockCatalogueStore>,
    provider: Arc<dyn Provider>,
    pool_size: usize,
    ticker_timeout: Duration,
    bulk_universe_cap: usize,
    cancel_tokens: Arc<AsyncMutex<HashMap<String, CancellationToken>>>,
}

impl JobController {
    pub fn new(
        pool: DbPool,
        provider: Arc<dyn Provider>,
        pool_size: usize,
        ticker_timeout: Duration,
        errors_cap: usize,
        bulk_universe_cap: usize,
    ) -> Self {
        Self {
            jobs: Arc::new(JobStore::new(pool.clone(), errors_cap)),
            results: Arc::new(ResultStore::new(pool.clone())),
            catalogue: Arc::new(StockCatalogueStore::new(pool)),
            provider,
            pool_size,
            ticker_timeout,
            bulk_universe_cap,
            cancel_tokens: Arc::new(AsyncMutex::new(HashMap::new())),
        }
    }

    pub fn jobs(&self) -> &JobStore {
        &self.jobs
    }

    pub fn results(&self) -> &ResultStore {
        &self.results
    }

    pub fn catalogue(&self) -> &StockCatalogueStore {
        &self.catalogue
    }

    /// Resolves the dispatch list for a request: the explicit tickers if
    /// given, else the full catalogue universe, rejecting (never
    /// truncating) an oversized universe (spec §4.7, Open Question ii).
    async fn resolve_tickers(
        &self,
        tickers: Vec<String>,
        allow_universe: bool,
    ) -> Result<Vec<String>, ControllerError> {
        if !tickers.is_empty() {
            return Ok(tickers);
        }
        if !allow_universe {
            return Err(ControllerError::Validation(
                "tickers must not be empty".to_string(),
            ));
        }
        let universe = self
            .catalogue
            .all_tickers()
            .await
            .map_err(|e| ControllerError::Store(JobStoreError::Backend(e)))?;
        if universe.len() > self.bulk_universe_cap {
            return Err(ControllerError::BulkUniverseTooLarge {
                cap: self.bulk_universe_cap,
                total: universe.len(),
            });
        }
        Ok(universe)
    }

    /// Submits a job for `tickers` (or, when empty and `allow_universe`,
    /// the resolved catalogue universe) and returns its `job_id`
    /// immediately; the work runs on a detached background task.
    pub async fn submit(
        &self,
        tickers: Vec<String>,
        allow_universe: bool,
        source: ResultSource,
        period: DataPeriod,
        strategy: StrategyConfig,
    ) -> Result<String, ControllerError> {
        let tickers = self.resolve_tickers(tickers, allow_universe).await?;
        if tickers.is_empty() {
            return Err(ControllerError::Validation(
                "tickers must not be empty".to_string(),
            ));
        }

        let job_id = uuid::Uuid::new_v4().to_string();
        self.jobs
            .create(&job_id, tickers.len() as i64, "queued")
            .await?;

        let token = CancellationToken::new();
        self.cancel_tokens
            .lock()
            .await
            .insert(job_id.clone(), token.clone());

        let jobs = self.jobs.clone();
        let results = self.results.clone();
        let provider = self.provider.clone();
        let cancel_tokens = self.cancel_tokens.clone();
        let pool_size = self.pool_size;
        let ticker_timeout = self.ticker_timeout;
        let spawn_job_id = job_id.clone();

        tokio::spawn(
            async move {
                run_job(
                    spawn_job_id.clone(),
                    tickers,
                    source,
                    period,
                    strategy,
                    jobs,
                    results,
                    provider,
                    pool_size,
                    ticker_timeout,
                    token,
                )
                .await;
                cancel_tokens.lock().await.remove(&spawn_job_id);
            }
            .instrument(tracing::info_span!("analysis_job", job_id = %job_id)),
        );

        Ok(job_id)
    }

    pub async fn cancel(&self, job_id: &str) -> Result<(), ControllerError> {
        self.jobs.request_cancel(job_id).await?;
        if let Some(token) = self.cancel_tokens.lock().await.get(job_id) {
            token.cancel();
        }
        Ok(())
    }

    pub async fn status(&self, job_id: &str) -> Result<Job, ControllerError> {
        self.jobs.status(job_id).await.map_err(Into::into)
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_job(
    job_id: String,
    tickers: Vec<String>,
    source: ResultSource,
    period: DataPeriod,
    strategy: StrategyConfig,
    jobs: Arc<JobStore>,
    results: Arc<ResultStore>,
    provider: Arc<dyn Provider>,
    pool_size: usize,
    ticker_timeout: Duration,
    cancel: CancellationToken,
) {
    if let Err(e) = jobs.start(&job_id).await {
        tracing::error!(job_id = %job_id, error = %e, "failed to start job");
        let _ = jobs.fail(&job_id, "failed to start job").await;
        return;
    }

    let worker_pool = WorkerPool::new(pool_size, ticker_timeout);
    let work_provider = provider.clone();
    let work_strategy = strategy.clone();
    let progress_jobs = jobs.clone();
    let progress_results = results.clone();
    let progress_job_id = job_id.clone();

    worker_pool
        .run(
            tickers,
            cancel,
            move |_index, ticker: String| {
                let provider = work_provider.clone();
                let strategy = work_strategy.clone();
                async move { sja_orchestrator::analyze_ticker(provider.as_ref(), &ticker, period, &strategy).await }
            },
            move |index, ticker: String, outcome| {
                let jobs = progress_jobs.clone();
                let results = progress_results.clone();
                let job_id = progress_job_id.clone();
                async move {
                    match outcome {
                        ItemOutcome::Success(doc) => {
                            let raw = match serde_json::to_value(&doc) {
                                Ok(v) => v,
                                Err(e) => {
                                    let _ = jobs
                                        .record_progress(&job_id, &ticker, index as i64, Err(&e.to_string()))
                                        .await;
                                    return;
                                }
                            };
                            if let Err(e) = results
                                .insert(&ticker, &ticker, Some(&job_id), source, &raw)
                                .await
                            {
                                tracing::warn!(job_id = %job_id, ticker = %ticker, error = %e, "failed to persist analysis result");
                            }
                            let _ = jobs
                                .record_progress(&job_id, &ticker, index as i64, Ok(()))
                                .await;
                        }
                        ItemOutcome::Failed(fault) => {
                            let message = fault_message(&fault);
                            let _ = jobs
                                .record_progress(&job_id, &ticker, index as i64, Err(&message))
                                .await;
                        }
                        ItemOutcome::TimedOut => {
                            let _ = jobs
                                .record_progress(&job_id, &ticker, index as i64, Err("ticker analysis timed out"))
                                .await;
                        }
                    }
                }
            },
        )
        .await;

    let cancelled = jobs.read_cancel_flag(&job_id).await.unwrap_or(false);
    if let Err(e) = jobs.finalize(&job_id, cancelled).await {
        tracing::error!(job_id = %job_id, error = %e, "failed to finalize job");
    }
}

fn fault_message(fault: &AnalysisFault) -> String {
    fault.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sja_md::ProviderError;
    use sja_schemas::OhlcvBar;

    struct DemoLikeProvider;

    #[async_trait]
    impl Provider for DemoLikeProvider {
        fn name(&self) -> &'static str {
            "demo-like"
        }

        async fn fetch_historical(
            &self,
            ticker: &str,
            period: DataPeriod,
        ) -> Result<Vec<OhlcvBar>, ProviderError> {
            sja_md::DemoProvider.fetch_historical(ticker, period).await
        }
    }

    async fn test_controller() -> JobController {
        test_controller_with_cap(500).await
    }

    async fn test_controller_with_cap(bulk_universe_cap: usize) -> JobController {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("controller.sqlite3");
        let pool = DbPool::connect(None, &path).await.unwrap();
        pool.migrate().await.unwrap();
        std::mem::forget(dir);
        JobController::new(
            pool,
            Arc::new(DemoLikeProvider),
            2,
            Duration::from_secs(5),
            1000,
            bulk_universe_cap,
        )
    }

    #[tokio::test]
    async fn submit_runs_to_completion() {
        let controller = test_controller().await;
        let job_id = controller
            .submit(
                vec!["AAA".to_string(), "BBB".to_string(), "CCC".to_string()],
                false,
                ResultSource::Bulk,
                DataPeriod::default(),
                StrategyConfig::default(),
            )
            .await
            .unwrap();

        let job = wait_for_terminal(&controller, &job_id).await;
        assert_eq!(job.total, 3);
        assert_eq!(job.completed, 3);
    }

    #[tokio::test]
    async fn empty_tickers_without_universe_is_validation_error() {
        let controller = test_controller().await;
        let result = controller
            .submit(vec![], false, ResultSource::Bulk, DataPeriod::default(), StrategyConfig::default())
            .await;
        assert!(matches!(result, Err(ControllerError::Validation(_))));
    }

    #[tokio::test]
    async fn oversized_universe_is_rejected_not_truncated() {
        let controller = test_controller_with_cap(2).await;
        for i in 0..3 {
            controller
                .catalogue()
                .upsert(&sja_schemas::StockEntry {
                    ticker: format!("T{i}"),
                    symbol: format!("T{i}"),
                    name: format!("Ticker {i}"),
                })
                .await
                .unwrap();
        }
        let result = controller
            .submit(vec![], true, ResultSource::Bulk, DataPeriod::default(), StrategyConfig::default())
            .await;
        assert!(matches!(result, Err(ControllerError::BulkUniverseTooLarge { .. })));
    }

    #[tokio::test]
    async fn cancel_before_dispatch_yields_cancelled_with_no_completions() {
        let controller = test_controller().await;
        let job_id = controller
            .submit(
                (0..20).map(|i| format!("T{i}")).collect(),
                false,
                ResultSource::Bulk,
                DataPeriod::default(),
                StrategyConfig::default(),
            )
            .await
            .unwrap();
        controller.cancel(&job_id).await.unwrap();
        let job = wait_for_terminal(&controller, &job_id).await;
        assert!(job.completed <= 20);
        assert_eq!(job.successful + job.errors.len() as i64, job.completed);
    }

    #[tokio::test]
    async fn cancel_on_unknown_job_is_not_found() {
        let controller = test_controller().await;
        let result = controller.cancel("missing").await;
        assert!(result.is_err());
    }

    async fn wait_for_terminal(controller: &JobController, job_id: &str) -> Job {
        for _ in 0..200 {
            let job = controller.status(job_id).await.unwrap();
            if job.status.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("job {job_id} did not reach a terminal state in time");
    }
}
