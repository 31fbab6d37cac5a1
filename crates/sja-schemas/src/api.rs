//! Wire DTOs for the HTTP surface (spec §4.8, §6): request schemas, the
//! uniform error envelope, and pagination. Shared between `sja-api`,
//! `sja-jobs`, and `sja-orchestrator` so none of them re-derives the wire
//! shape independently.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The authoritative error-code set (spec §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Unauthorized,
    ValidationError,
    InvalidRequest,
    InvalidTicker,
    JobNotFound,
    JobDuplicate,
    JobCancelInvalid,
    JobStartFailed,
    WatchlistDuplicate,
    WatchlistNotFound,
    AnalysisError,
    BulkAnalysisError,
    HistoryError,
    StatusError,
    StockLookupError,
    RateLimitExceeded,
}

impl ErrorCode {
    /// HTTP status this code is surfaced as (spec §7 taxonomy).
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::Unauthorized => 401,
            ErrorCode::ValidationError
            | ErrorCode::InvalidRequest
            | ErrorCode::InvalidTicker => 400,
            ErrorCode::JobNotFound | ErrorCode::WatchlistNotFound => 404,
            ErrorCode::JobDuplicate
            | ErrorCode::JobCancelInvalid
            | ErrorCode::WatchlistDuplicate => 409,
            ErrorCode::RateLimitExceeded => 429,
            ErrorCode::AnalysisError
            | ErrorCode::BulkAnalysisError
            | ErrorCode::HistoryError
            | ErrorCode::StatusError
            | ErrorCode::StockLookupError
            | ErrorCode::JobStartFailed => 500,
        }
    }
}

/// One entry in `details.validation_errors` (spec §8 scenario 5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub validation_errors: Vec<ValidationErrorDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
    pub timestamp: DateTime<Utc>,
}

/// The uniform error envelope every failed request returns (spec §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

impl ErrorEnvelope {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                code,
                message: message.into(),
                details: None,
                timestamp: Utc::now(),
            },
        }
    }

    pub fn with_validation_errors(mut self, errors: Vec<ValidationErrorDetail>) -> Self {
        self.error.details = Some(ErrorDetails {
            validation_errors: errors,
        });
        self
    }
}

/// Pagination request parameters, already bounds-checked by the caller.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, per_page: 20 }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn compute(page: u32, per_page: u32, total: u64) -> Self {
        let total_pages = if total == 0 {
            1
        } else {
            ((total as f64) / (per_page as f64)).ceil() as u64
        };
        Self {
            page,
            per_page,
            total,
            total_pages,
            has_next: (page as u64) < total_pages,
            has_prev: page > 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SortMeta {
    pub sort: String,
    pub order: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PagedEnvelope<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
    pub meta: SortMeta,
}

/// `POST /api/analysis/analyze` and `POST /api/stocks/analyze-all-stocks`
/// request body (spec §4.8 recognized options).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub tickers: Vec<String>,
    #[serde(default)]
    pub symbols: Option<Vec<String>>,
    pub capital: Option<f64>,
    pub strategy_id: Option<i64>,
    pub risk_percent: Option<f64>,
    pub position_size_limit: Option<f64>,
    pub risk_reward_ratio: Option<f64>,
    pub data_period: Option<String>,
    pub use_demo_data: Option<bool>,
    pub enabled_indicators: Option<HashMap<String, bool>>,
    pub category_weights: Option<HashMap<String, f64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobSubmitResponse {
    pub job_id: String,
    pub status: String,
    pub total: i64,
}

/// `GET /api/analysis/status/<job_id>` response (spec §6).
///
/// `errors` is deliberately a JSON-*encoded string*, not a native array —
/// this mirrors the `errors` column's on-disk representation (spec §4.3)
/// verbatim rather than decoding it at the API boundary.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: String,
    pub progress: i64,
    pub completed: i64,
    pub total: i64,
    pub successful: i64,
    pub errors: String,
    pub current_index: Option<i64>,
    pub current_ticker: Option<String>,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisHistoryEntry {
    pub id: i64,
    pub ticker: String,
    pub symbol: String,
    pub analysis_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub job_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisHistoryResponse {
    pub ticker: String,
    pub history: Vec<AnalysisHistoryEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchlistAddRequest {
    pub symbol: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WatchlistResponse {
    pub watchlist: Vec<crate::WatchlistItem>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: &'static str,
}
