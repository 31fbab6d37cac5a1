//! Uniform error mapping for the HTTP surface (spec §4.8, §7).
//!
//! `AppError` is the single type every handler's `Result` fails with.
//! `IntoResponse` is the only place that knows how a domain error becomes
//! a status code and an [`ErrorEnvelope`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use sja_jobs::{ControllerError, JobStoreError, ResultStoreError, WatchlistStoreError};
use sja_schemas::api::{ErrorCode, ErrorEnvelope, ValidationErrorDetail};

#[derive(Debug)]
pub enum AppError {
    Unauthorized,
    RateLimitExceeded,
    Validation(Vec<ValidationErrorDetail>),
    InvalidRequest(String),
    InvalidTicker(String),
    JobNotFound(String),
    JobDuplicate(String),
    JobCancelInvalid(String),
    JobStartFailed(String),
    WatchlistDuplicate(String),
    WatchlistNotFound(String),
    Analysis(String),
    BulkAnalysis(String),
    History(String),
    Status(String),
    StockLookup(String),
}

impl AppError {
    fn code(&self) -> ErrorCode {
        match self {
            AppError::Unauthorized => ErrorCode::Unauthorized,
            AppError::RateLimitExceeded => ErrorCode::RateLimitExceeded,
            AppError::Validation(_) => ErrorCode::ValidationError,
            AppError::InvalidRequest(_) => ErrorCode::InvalidRequest,
            AppError::InvalidTicker(_) => ErrorCode::InvalidTicker,
            AppError::JobNotFound(_) => ErrorCode::JobNotFound,
            AppError::JobDuplicate(_) => ErrorCode::JobDuplicate,
            AppError::JobCancelInvalid(_) => ErrorCode::JobCancelInvalid,
            AppError::JobStartFailed(_) => ErrorCode::JobStartFailed,
            AppError::WatchlistDuplicate(_) => ErrorCode::WatchlistDuplicate,
            AppError::WatchlistNotFound(_) => ErrorCode::WatchlistNotFound,
            AppError::Analysis(_) => ErrorCode::AnalysisError,
            AppError::BulkAnalysis(_) => ErrorCode::BulkAnalysisError,
            AppError::History(_) => ErrorCode::HistoryError,
            AppError::Status(_) => ErrorCode::StatusError,
            AppError::StockLookup(_) => ErrorCode::StockLookupError,
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Unauthorized => "missing or invalid API key".to_string(),
            AppError::RateLimitExceeded => "rate limit exceeded".to_string(),
            AppError::Validation(_) => "request failed validation".to_string(),
            AppError::InvalidRequest(m)
            | AppError::InvalidTicker(m)
            | AppError::JobNotFound(m)
            | AppError::JobDuplicate(m)
            | AppError::JobCancelInvalid(m)
            | AppError::JobStartFailed(m)
            | AppError::WatchlistDuplicate(m)
            | AppError::WatchlistNotFound(m)
            | AppError::Analysis(m)
            | AppError::BulkAnalysis(m)
            | AppError::History(m)
            | AppError::Status(m)
            | AppError::StockLookup(m) => m.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let status = StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut envelope = ErrorEnvelope::new(code, self.message());
        if let AppError::Validation(errors) = self {
            envelope = envelope.with_validation_errors(errors);
        }
        (status, Json(envelope)).into_response()
    }
}

impl From<ControllerError> for AppError {
    fn from(e: ControllerError) -> Self {
        match e {
            ControllerError::Validation(msg) => AppError::InvalidRequest(msg),
            ControllerError::BulkUniverseTooLarge { cap, total } => AppError::BulkAnalysis(format!(
                "universe of {total} tickers exceeds the bulk analysis cap of {cap}"
            )),
            ControllerError::Store(e) => e.into(),
        }
    }
}

impl From<JobStoreError> for AppError {
    fn from(e: JobStoreError) -> Self {
        match e {
            JobStoreError::DuplicateJob(id) => AppError::JobDuplicate(format!("job already exists: {id}")),
            JobStoreError::NotFound(id) => AppError::JobNotFound(format!("job not found: {id}")),
            JobStoreError::CancelInvalid(id) => {
                AppError::JobCancelInvalid(format!("job {id} is in a terminal state; cannot cancel"))
            }
            JobStoreError::Backend(e) => AppError::Status(e.to_string()),
        }
    }
}

impl From<ResultStoreError> for AppError {
    fn from(e: ResultStoreError) -> Self {
        AppError::History(e.to_string())
    }
}

impl From<WatchlistStoreError> for AppError {
    fn from(e: WatchlistStoreError) -> Self {
        match e {
            WatchlistStoreError::Duplicate(ticker) => {
                AppError::WatchlistDuplicate(format!("ticker already on watchlist: {ticker}"))
            }
            WatchlistStoreError::NotFound(ticker) => {
                AppError::WatchlistNotFound(format!("ticker not on watchlist: {ticker}"))
            }
            WatchlistStoreError::Backend(e) => AppError::Status(e.to_string()),
        }
    }
}
