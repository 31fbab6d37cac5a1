//! Job store (C3): atomic CRUD and lifecycle transitions on the `jobs`
//! table (spec §4.3).

use chrono::Utc;
use sja_db::DbPool;
use sja_schemas::{Job, JobError, JobStatus};

use crate::error::JobStoreError;

pub struct JobStore {
    pool: DbPool,
    /// Default 1000 (spec §3): oldest entries are dropped first.
    errors_cap: usize,
}

impl JobStore {
    pub fn new(pool: DbPool, errors_cap: usize) -> Self {
        Self { pool, errors_cap }
    }

    pub async fn create(
        &self,
        job_id: &str,
        total: i64,
        message: &str,
    ) -> Result<(), JobStoreError> {
        let now = Utc::now();
        let result = self
            .pool
            .execute(
                "INSERT INTO jobs \
                 (job_id, status, total, completed, successful, progress, errors, \
                  current_ticker, current_index, message, cancel_requested, \
                  created_at, started_at, updated_at, completed_at) \
                 VALUES (?, ?, ?, 0, 0, 0, '[]', NULL, NULL, ?, ?, ?, NULL, ?, NULL)",
                &[
                    job_id.into(),
                    JobStatus::Queued.as_str().into(),
                    total.into(),
                    message.into(),
                    false.into(),
                    now.to_rfc3339().into(),
                    now.to_rfc3339().into(),
                ],
            )
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if sja_db::is_unique_violation(&e, "job") => {
                Err(JobStoreError::DuplicateJob(job_id.to_string()))
            }
            Err(e) => Err(JobStoreError::Backend(e)),
        }
    }

    /// Transitions `queued -> processing`. No-op if already `processing`
    /// (spec §4.3).
    pub async fn start(&self, job_id: &str) -> Result<(), JobStoreError> {
        let now = Utc::now();
        self.pool
            .execute(
                "UPDATE jobs SET status = ?, started_at = ?, updated_at = ? \
                 WHERE job_id = ? AND status = ?",
                &[
                    JobStatus::Processing.as_str().into(),
                    now.to_rfc3339().into(),
                    now.to_rfc3339().into(),
                    job_id.into(),
                    JobStatus::Queued.as_str().into(),
                ],
            )
            .await?;
        Ok(())
    }

    /// Records the outcome of one dispatched ticker (spec §4.3). The row
    /// is read, mutated in memory, and written back with a single `UPDATE`
    /// — safe because the worker pool's progress callback is already
    /// serialized per job (no two `record_progress` calls for the same
    /// job ever race each other).
    pub async fn record_progress(
        &self,
        job_id: &str,
        ticker: &str,
        index: i64,
        outcome: Result<(), &str>,
    ) -> Result<(), JobStoreError> {
        let row = self
            .pool
            .query_one("SELECT * FROM jobs WHERE job_id = ?", &[job_id.into()])
            .await?
            .ok_or_else(|| JobStoreError::NotFound(job_id.to_string()))?;

        let total = row.int("total")?;
        let mut completed = row.int("completed")?;
        let mut successful = row.int("successful")?;
        let mut errors: Vec<JobError> = serde_json::from_value(row.json("errors")?)
            .unwrap_or_default();

        completed += 1;
        match outcome {
            Ok(()) => successful += 1,
            Err(message) => {
                errors.push(JobError {
                    ticker: ticker.to_string(),
                    message: message.to_string(),
                });
                if errors.len() > self.errors_cap {
                    let overflow = errors.len() - self.errors_cap;
                    errors.drain(0..overflow);
                }
            }
        }

        let progress = Job::compute_progress(completed, total);
        let now = Utc::now();

        self.pool
            .execute(
                "UPDATE jobs SET completed = ?, successful = ?, progress = ?, errors = ?, \
                 current_ticker = ?, current_index = ?, updated_at = ? WHERE job_id = ?",
                &[
                    completed.into(),
                    successful.into(),
                    progress.into(),
                    serde_json::to_string(&errors).unwrap_or_else(|_| "[]".to_string()).into(),
                    ticker.into(),
                    index.into(),
                    now.to_rfc3339().into(),
                    job_id.into(),
                ],
            )
            .await?;
        Ok(())
    }

    /// Transitions to a terminal state. Only legal from `processing`
    /// (spec §4.3); the caller is expected to have called `start` first.
    pub async fn finalize(&self, job_id: &str, cancelled: bool) -> Result<(), JobStoreError> {
        let status = if cancelled {
            JobStatus::Cancelled
        } else {
            JobStatus::Completed
        };
        let now = Utc::now();
        let affected = self
            .pool
            .execute(
                "UPDATE jobs SET status = ?, completed_at = ?, updated_at = ? \
                 WHERE job_id = ? AND status = ?",
                &[
                    status.as_str().into(),
                    now.to_rfc3339().into(),
                    now.to_rfc3339().into(),
                    job_id.into(),
                    JobStatus::Processing.as_str().into(),
                ],
            )
            .await?;
        if affected == 0 {
            return Err(JobStoreError::Backend(anyhow::anyhow!(
                "cannot finalize job {job_id}: not in processing state"
            )));
        }
        Ok(())
    }

    /// Fails a job outright (controller-level fault, spec §4.7 step 4).
    pub async fn fail(&self, job_id: &str, message: &str) -> Result<(), JobStoreError> {
        let now = Utc::now();
        self.pool
            .execute(
                "UPDATE jobs SET status = ?, message = ?, completed_at = ?, updated_at = ? \
                 WHERE job_id = ? AND status != ? AND status != ? AND status != ?",
                &[
                    JobStatus::Failed.as_str().into(),
                    message.into(),
                    now.to_rfc3339().into(),
                    now.to_rfc3339().into(),
                    job_id.into(),
                    JobStatus::Completed.as_str().into(),
                    JobStatus::Failed.as_str().into(),
                    JobStatus::Cancelled.as_str().into(),
                ],
            )
            .await?;
        Ok(())
    }

    /// Sets `cancel_requested`. Monotonic once true (spec §3); rejects
    /// terminal jobs with `JOB_CANCEL_INVALID` (spec §4.3).
    pub async fn request_cancel(&self, job_id: &str) -> Result<(), JobStoreError> {
        let now = Utc::now();
        let affected = self
            .pool
            .execute(
                "UPDATE jobs SET cancel_requested = ?, updated_at = ? \
                 WHERE job_id = ? AND status IN (?, ?)",
                &[
                    true.into(),
                    now.to_rfc3339().into(),
                    job_id.into(),
                    JobStatus::Queued.as_str().into(),
                    JobStatus::Processing.as_str().into(),
                ],
            )
            .await?;

        if affected > 0 {
            return Ok(());
        }

        // Distinguish "not found" from "already terminal" for the caller.
        match self.status(job_id).await {
            Ok(_) => Err(JobStoreError::CancelInvalid(job_id.to_string())),
            Err(e) => Err(e),
        }
    }

    pub async fn read_cancel_flag(&self, job_id: &str) -> Result<bool, JobStoreError> {
        let row = self
            .pool
            .query_one(
                "SELECT cancel_requested FROM jobs WHERE job_id = ?",
                &[job_id.into()],
            )
            .await?
            .ok_or_else(|| JobStoreError::NotFound(job_id.to_string()))?;
        row.boolean("cancel_requested").map_err(Into::into)
    }

    pub async fn status(&self, job_id: &str) -> Result<Job, JobStoreError> {
        let row = self
            .pool
            .query_one("SELECT * FROM jobs WHERE job_id = ?", &[job_id.into()])
            .await?
            .ok_or_else(|| JobStoreError::NotFound(job_id.to_string()))?;

        let status = JobStatus::parse(&row.text("status")?)
            .ok_or_else(|| JobStoreError::Backend(anyhow::anyhow!("invalid status in row")))?;
        let errors: Vec<JobError> = serde_json::from_value(row.json("errors")?).unwrap_or_default();

        Ok(Job {
            job_id: row.text("job_id")?,
            status,
            total: row.int("total")?,
            completed: row.int("completed")?,
            successful: row.int("successful")?,
            progress: row.int("progress")?,
            errors,
            current_ticker: row.opt_text("current_ticker"),
            current_index: row.opt_int("current_index"),
            message: row.text("message").unwrap_or_default(),
            cancel_requested: row.boolean("cancel_requested")?,
            created_at: row.timestamp("created_at")?,
            started_at: row.opt_timestamp("started_at"),
            updated_at: row.timestamp("updated_at")?,
            completed_at: row.opt_timestamp("completed_at"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> DbPool {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.sqlite3");
        let pool = DbPool::connect(None, &path).await.unwrap();
        pool.migrate().await.unwrap();
        std::mem::forget(dir); // keep temp file alive for the test's duration
        pool
    }

    #[tokio::test]
    async fn create_then_status_round_trips() {
        let store = JobStore::new(test_pool().await, 1000);
        store.create("job-1", 3, "queued").await.unwrap();
        let job = store.status("job-1").await.unwrap();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.total, 3);
        assert_eq!(job.completed, 0);
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let store = JobStore::new(test_pool().await, 1000);
        store.create("job-dup", 1, "").await.unwrap();
        let result = store.create("job-dup", 1, "").await;
        assert!(matches!(result, Err(JobStoreError::DuplicateJob(_))));
    }

    #[tokio::test]
    async fn start_transitions_to_processing() {
        let store = JobStore::new(test_pool().await, 1000);
        store.create("job-2", 1, "").await.unwrap();
        store.start("job-2").await.unwrap();
        let job = store.status("job-2").await.unwrap();
        assert_eq!(job.status, JobStatus::Processing);
        assert!(job.started_at.is_some());
    }

    #[tokio::test]
    async fn record_progress_accumulates_and_recomputes_progress() {
        let store = JobStore::new(test_pool().await, 1000);
        store.create("job-3", 4, "").await.unwrap();
        store.start("job-3").await.unwrap();
        store.record_progress("job-3", "AAA", 1, Ok(())).await.unwrap();
        store.record_progress("job-3", "BBB", 2, Err("boom")).await.unwrap();

        let job = store.status("job-3").await.unwrap();
        assert_eq!(job.completed, 2);
        assert_eq!(job.successful, 1);
        assert_eq!(job.errors.len(), 1);
        assert_eq!(job.errors[0].ticker, "BBB");
        assert_eq!(job.progress, 50);
    }

    #[tokio::test]
    async fn errors_overflow_evicts_oldest() {
        let store = JobStore::new(test_pool().await, 2);
        store.create("job-4", 10, "").await.unwrap();
        store.start("job-4").await.unwrap();
        for i in 0..3 {
            store
                .record_progress("job-4", &format!("T{i}"), i, Err("bad"))
                .await
                .unwrap();
        }
        let job = store.status("job-4").await.unwrap();
        assert_eq!(job.errors.len(), 2);
        assert_eq!(job.errors[0].ticker, "T1");
        assert_eq!(job.errors[1].ticker, "T2");
    }

    #[tokio::test]
    async fn finalize_sets_terminal_state_and_completed_at() {
        let store = JobStore::new(test_pool().await, 1000);
        store.create("job-5", 1, "").await.unwrap();
        store.start("job-5").await.unwrap();
        store.finalize("job-5", false).await.unwrap();
        let job = store.status("job-5").await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.completed_at.unwrap() >= job.started_at.unwrap());
    }

    #[tokio::test]
    async fn cancel_on_terminal_job_is_rejected() {
        let store = JobStore::new(test_pool().await, 1000);
        store.create("job-6", 1, "").await.unwrap();
        store.start("job-6").await.unwrap();
        store.finalize("job-6", false).await.unwrap();
        let result = store.request_cancel("job-6").await;
        assert!(matches!(result, Err(JobStoreError::CancelInvalid(_))));
    }

    #[tokio::test]
    async fn cancel_on_unknown_job_is_not_found() {
        let store = JobStore::new(test_pool().await, 1000);
        let result = store.request_cancel("does-not-exist").await;
        assert!(matches!(result, Err(JobStoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn cancel_request_is_monotonic() {
        let store = JobStore::new(test_pool().await, 1000);
        store.create("job-7", 1, "").await.unwrap();
        store.start("job-7").await.unwrap();
        store.request_cancel("job-7").await.unwrap();
        assert!(store.read_cancel_flag("job-7").await.unwrap());
    }

    #[tokio::test]
    async fn status_of_unknown_job_is_not_found() {
        let store = JobStore::new(test_pool().await, 1000);
        let result = store.status("nope").await;
        assert!(matches!(result, Err(JobStoreError::NotFound(_))));
    }
}
