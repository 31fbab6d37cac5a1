//! Domain errors for the job, result, and watchlist stores. These are
//! mapped to wire error codes by `sja-api`; nothing in this crate knows
//! about HTTP.

use std::fmt;

#[derive(Debug)]
pub enum JobStoreError {
    DuplicateJob(String),
    NotFound(String),
    CancelInvalid(String),
    Backend(anyhow::Error),
}

impl fmt::Display for JobStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStoreError::DuplicateJob(id) => write!(f, "job already exists: {id}"),
            JobStoreError::NotFound(id) => write!(f, "job not found: {id}"),
            JobStoreError::CancelInvalid(id) => {
                write!(f, "job {id} is in a terminal state; cannot cancel")
            }
            JobStoreError::Backend(e) => write!(f, "job store backend error: {e}"),
        }
    }
}

impl std::error::Error for JobStoreError {}

impl From<anyhow::Error> for JobStoreError {
    fn from(e: anyhow::Error) -> Self {
        JobStoreError::Backend(e)
    }
}

#[derive(Debug)]
pub enum ResultStoreError {
    Duplicate { ticker: String, job_id: Option<String> },
    Backend(anyhow::Error),
}

impl fmt::Display for ResultStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultStoreError::Duplicate { ticker, job_id } => write!(
                f,
                "duplicate analysis result for ticker={ticker} job_id={job_id:?}"
            ),
            ResultStoreError::Backend(e) => write!(f, "result store backend error: {e}"),
        }
    }
}

impl std::error::Error for ResultStoreError {}

impl From<anyhow::Error> for ResultStoreError {
    fn from(e: anyhow::Error) -> Self {
        ResultStoreError::Backend(e)
    }
}

#[derive(Debug)]
pub enum WatchlistStoreError {
    Duplicate(String),
    NotFound(String),
    Backend(anyhow::Error),
}

impl fmt::Display for WatchlistStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchlistStoreError::Duplicate(ticker) => {
                write!(f, "ticker already on watchlist: {ticker}")
            }
            WatchlistStoreError::NotFound(ticker) => {
                write!(f, "ticker not on watchlist: {ticker}")
            }
            WatchlistStoreError::Backend(e) => write!(f, "watchlist store backend error: {e}"),
        }
    }
}

impl std::error::Error for WatchlistStoreError {}

impl From<anyhow::Error> for WatchlistStoreError {
    fn from(e: anyhow::Error) -> Self {
        WatchlistStoreError::Backend(e)
    }
}
