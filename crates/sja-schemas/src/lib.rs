use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod api;

/// Lifecycle state of an analysis job.
///
/// Transitions: `Queued -> Processing -> {Completed, Failed, Cancelled}`.
/// Once a job reaches a terminal state no field on its row may change again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(JobStatus::Queued),
            "processing" => Some(JobStatus::Processing),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            "cancelled" => Some(JobStatus::Cancelled),
            _ => None,
        }
    }
}

/// A single entry in a job's bounded error log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobError {
    pub ticker: String,
    pub message: String,
}

/// Full row shape for one analysis job.
///
/// Mutated only through the atomic operations in the job store; every
/// field here is derived or written by exactly one of those operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub status: JobStatus,
    pub total: i64,
    pub completed: i64,
    pub successful: i64,
    pub progress: i64,
    pub errors: Vec<JobError>,
    pub current_ticker: Option<String>,
    pub current_index: Option<i64>,
    pub message: String,
    pub cancel_requested: bool,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// `round(100 * completed / max(total, 1))`, matching the job store's
    /// recomputation on every progress write.
    pub fn compute_progress(completed: i64, total: i64) -> i64 {
        let denom = total.max(1) as f64;
        ((100.0 * completed as f64) / denom).round() as i64
    }
}

/// Where an [`AnalysisResult`] originated: an explicit bulk/ad-hoc analyze
/// call, or a recurring scan over the user's watchlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    Watchlist,
    Bulk,
}

impl ResultSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultSource::Watchlist => "watchlist",
            ResultSource::Bulk => "bulk",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "watchlist" => Some(ResultSource::Watchlist),
            "bulk" => Some(ResultSource::Bulk),
            _ => None,
        }
    }
}

/// Categorical label derived from a numeric score, per the fixed thresholds
/// `>=80 Strong Buy, >=60 Buy, >40 Neutral, >=20 Sell, <20 Strong Sell`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    StrongBuy,
    Buy,
    Neutral,
    Sell,
    StrongSell,
}

impl Verdict {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Verdict::StrongBuy
        } else if score >= 60.0 {
            Verdict::Buy
        } else if score > 40.0 {
            Verdict::Neutral
        } else if score >= 20.0 {
            Verdict::Sell
        } else {
            Verdict::StrongSell
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::StrongBuy => "Strong Buy",
            Verdict::Buy => "Buy",
            Verdict::Neutral => "Neutral",
            Verdict::Sell => "Sell",
            Verdict::StrongSell => "Strong Sell",
        }
    }
}

/// One indicator's vote against a single ticker's OHLCV window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorVote {
    pub name: String,
    pub category: String,
    pub vote: i8,
    pub confidence: f64,
}

/// The document persisted into `raw_data` for one completed ticker analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisDocument {
    pub score: f64,
    pub verdict: String,
    pub votes: Vec<IndicatorVote>,
    pub entry: f64,
    pub stop: f64,
    pub target: f64,
}

/// Row shape for one stored per-ticker analysis result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub id: i64,
    pub ticker: String,
    pub symbol: String,
    pub job_id: Option<String>,
    pub source: ResultSource,
    pub raw_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Row shape for one watchlist membership entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistItem {
    pub id: i64,
    pub ticker: String,
    pub symbol: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A single OHLCV bar as produced by the data-fetch boundary.
///
/// Prices are kept as decimal strings at the wire/storage boundary so
/// downstream arithmetic chooses its own precision deliberately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvBar {
    pub ts_utc: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// A single catalogue entry for the "universe" of recognized tickers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockEntry {
    pub ticker: String,
    pub symbol: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_status_round_trips_through_str() {
        for s in ["queued", "processing", "completed", "failed", "cancelled"] {
            let parsed = JobStatus::parse(s).unwrap();
            assert_eq!(parsed.as_str(), s);
        }
    }

    #[test]
    fn progress_rounds_half_up() {
        assert_eq!(Job::compute_progress(1, 3), 33);
        assert_eq!(Job::compute_progress(2, 3), 67);
        assert_eq!(Job::compute_progress(0, 0), 0);
        assert_eq!(Job::compute_progress(5, 5), 100);
    }

    #[test]
    fn verdict_thresholds_match_boundaries() {
        assert_eq!(Verdict::from_score(80.0).as_str(), "Strong Buy");
        assert_eq!(Verdict::from_score(60.0).as_str(), "Buy");
        assert_eq!(Verdict::from_score(59.99).as_str(), "Neutral");
        assert_eq!(Verdict::from_score(40.01).as_str(), "Neutral");
        assert_eq!(Verdict::from_score(40.0).as_str(), "Sell");
        assert_eq!(Verdict::from_score(20.0).as_str(), "Sell");
        assert_eq!(Verdict::from_score(19.99).as_str(), "Strong Sell");
    }

    #[test]
    fn terminal_statuses_are_marked_terminal() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }
}
