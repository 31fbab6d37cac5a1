//! Axum router and all HTTP handlers (spec §4.8).
//!
//! `build_router` is the single entry point; `sja-daemon`'s `main.rs` calls
//! it and attaches the trace/CORS layers on top.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sja_schemas::api::{
    AnalysisHistoryEntry, AnalysisHistoryResponse, AnalyzeRequest, JobStatusResponse,
    JobSubmitResponse, PagedEnvelope, Pagination, SortMeta, WatchlistAddRequest, WatchlistResponse,
};
use sja_schemas::{Job, ResultSource};

use crate::auth;
use crate::error::AppError;
use crate::state::AppState;
use crate::validation::{parse_analyze_request, validate_pagination};

pub fn build_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/api/analysis/analyze", post(analyze))
        .route("/api/analysis/status/:job_id", get(job_status))
        .route("/api/analysis/cancel/:job_id", post(cancel_job))
        .route("/api/analysis/history/:ticker", get(history))
        .route("/api/stocks/analyze-all-stocks", post(analyze_all_stocks))
        .route("/api/stocks/all", get(stocks_all))
        .route(
            "/api/watchlist",
            get(watchlist_list).post(watchlist_add).delete(watchlist_remove),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    let public = Router::new().route("/health", get(health));

    public.merge(protected).with_state(state)
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct HealthDetailResponse {
    status: String,
    database: &'static str,
    schema_version: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.pool.health_check().await {
        Ok(()) => {
            let schema_version = state.pool.schema_version().await.unwrap_or(-1);
            (
                StatusCode::OK,
                Json(HealthDetailResponse {
                    status: "ok".to_string(),
                    database: state.pool.backend_name(),
                    schema_version,
                }),
            )
        }
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthDetailResponse {
                status: "degraded".to_string(),
                database: state.pool.backend_name(),
                schema_version: -1,
            }),
        ),
    }
}

// ---------------------------------------------------------------------------
// POST /api/analysis/analyze
// ---------------------------------------------------------------------------

async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<JobSubmitResponse>, AppError> {
    let tickers = req.tickers.clone();
    let parsed = parse_analyze_request(&req, tickers, false)?;
    let job_id = state
        .controller
        .submit(parsed.tickers, false, ResultSource::Bulk, parsed.period, parsed.strategy)
        .await
        .map_err(AppError::from)?;
    let job = state.controller.status(&job_id).await.map_err(AppError::from)?;
    Ok(Json(JobSubmitResponse {
        job_id: job.job_id,
        status: job.status.as_str().to_string(),
        total: job.total,
    }))
}

// ---------------------------------------------------------------------------
// GET /api/analysis/status/<job_id>
// ---------------------------------------------------------------------------

async fn job_status(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<JobStatusResponse>, AppError> {
    let job = state.controller.status(&job_id).await.map_err(AppError::from)?;
    Ok(Json(job_to_response(job)))
}

fn job_to_response(job: Job) -> JobStatusResponse {
    JobStatusResponse {
        job_id: job.job_id,
        status: job.status.as_str().to_string(),
        progress: job.progress,
        completed: job.completed,
        total: job.total,
        successful: job.successful,
        errors: serde_json::to_string(&job.errors).unwrap_or_else(|_| "[]".to_string()),
        current_index: job.current_index,
        current_ticker: job.current_ticker,
        message: job.message,
        created_at: job.created_at,
        updated_at: job.updated_at,
        started_at: job.started_at,
        completed_at: job.completed_at,
    }
}

// ---------------------------------------------------------------------------
// POST /api/analysis/cancel/<job_id>
// ---------------------------------------------------------------------------

async fn cancel_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<JobStatusResponse>, AppError> {
    state.controller.cancel(&job_id).await.map_err(AppError::from)?;
    let job = state.controller.status(&job_id).await.map_err(AppError::from)?;
    Ok(Json(job_to_response(job)))
}

// ---------------------------------------------------------------------------
// GET /api/analysis/history/<ticker>
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PageQuery {
    page: Option<u32>,
    per_page: Option<u32>,
}

async fn history(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
    Query(q): Query<PageQuery>,
) -> Result<Json<AnalysisHistoryResponse>, AppError> {
    let (page, per_page) = validate_pagination(q.page, q.per_page)?;
    let page_result = state
        .controller
        .results()
        .history_paged(&ticker, page, per_page)
        .await
        .map_err(AppError::from)?;

    let history = page_result
        .results
        .into_iter()
        .map(|r| AnalysisHistoryEntry {
            id: r.id,
            ticker: r.ticker,
            symbol: r.symbol,
            analysis_data: r.raw_data,
            created_at: r.created_at,
            job_id: r.job_id,
        })
        .collect();

    Ok(Json(AnalysisHistoryResponse { ticker, history }))
}

// ---------------------------------------------------------------------------
// POST /api/stocks/analyze-all-stocks
// ---------------------------------------------------------------------------

async fn analyze_all_stocks(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<JobSubmitResponse>, AppError> {
    let tickers = req.symbols.clone().unwrap_or_else(|| req.tickers.clone());
    let parsed = parse_analyze_request(&req, tickers, true)?;
    let job_id = state
        .controller
        .submit(parsed.tickers, true, ResultSource::Bulk, parsed.period, parsed.strategy)
        .await
        .map_err(AppError::from)?;
    let job = state.controller.status(&job_id).await.map_err(AppError::from)?;
    Ok(Json(JobSubmitResponse {
        job_id: job.job_id,
        status: job.status.as_str().to_string(),
        total: job.total,
    }))
}

// ---------------------------------------------------------------------------
// GET /api/stocks/all
// ---------------------------------------------------------------------------

async fn stocks_all(
    State(state): State<Arc<AppState>>,
    Query(q): Query<PageQuery>,
) -> Result<Json<PagedEnvelope<sja_schemas::StockEntry>>, AppError> {
    let (page, per_page) = validate_pagination(q.page, q.per_page)?;
    let page_result = state
        .controller
        .catalogue()
        .list_paged(page, per_page)
        .await
        .map_err(|e| AppError::StockLookup(e.to_string()))?;

    Ok(Json(PagedEnvelope {
        data: page_result.entries,
        pagination: Pagination::compute(page, per_page, page_result.total),
        meta: SortMeta {
            sort: "ticker".to_string(),
            order: "asc".to_string(),
        },
    }))
}

// ---------------------------------------------------------------------------
// GET / POST / DELETE /api/watchlist
// ---------------------------------------------------------------------------

async fn watchlist_list(State(state): State<Arc<AppState>>) -> Result<Json<WatchlistResponse>, AppError> {
    let watchlist = state.watchlist.list().await.map_err(AppError::from)?;
    let count = watchlist.len();
    Ok(Json(WatchlistResponse { watchlist, count }))
}

async fn watchlist_add(
    State(state): State<Arc<AppState>>,
    Json(req): Json<WatchlistAddRequest>,
) -> Result<Json<sja_schemas::WatchlistItem>, AppError> {
    if req.symbol.trim().is_empty() {
        return Err(AppError::InvalidRequest("symbol must not be empty".to_string()));
    }
    let item = state
        .watchlist
        .add(&req.symbol, &req.symbol, req.notes.as_deref())
        .await
        .map_err(AppError::from)?;
    Ok(Json(item))
}

#[derive(Debug, Deserialize)]
struct WatchlistDeleteQuery {
    symbol: String,
}

async fn watchlist_remove(
    State(state): State<Arc<AppState>>,
    Query(q): Query<WatchlistDeleteQuery>,
) -> Result<StatusCode, AppError> {
    state.watchlist.remove(&q.symbol).await.map_err(AppError::from)?;
    Ok(StatusCode::NO_CONTENT)
}
