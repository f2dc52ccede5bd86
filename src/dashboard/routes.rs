//! Dashboard API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<DashboardState>`.
//! Every successful operation replaces the held snapshot wholesale.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::engine::dispatcher::BatchOutcome;
use crate::engine::enricher::QuoteMap;
use crate::engine::orchestrator::{
    DashboardSnapshot, PredictionOrchestrator, PredictionRow, SignalSummary,
};
use crate::engine::rotator::TrendingRotator;
use crate::services::ServiceError;
use crate::types::{SearchHit, SignalboardError};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub orchestrator: PredictionOrchestrator,
    /// Last snapshot produced by any operation.
    pub latest: RwLock<Option<DashboardSnapshot>>,
}

impl DashboardState {
    pub fn new(orchestrator: PredictionOrchestrator) -> Self {
        Self {
            orchestrator,
            latest: RwLock::new(None),
        }
    }

    /// Render `snapshot` and keep it as the latest unless a newer one
    /// was published in the meantime.
    pub async fn publish(&self, snapshot: DashboardSnapshot) -> SnapshotResponse {
        let response = SnapshotResponse::from(&snapshot);
        let mut latest = self.latest.write().await;
        let held = latest.as_ref().map(|current| current.fetched_at);
        match held {
            Some(held) if held > snapshot.fetched_at => {
                debug!(%held, offered = %snapshot.fetched_at, "Keeping newer snapshot");
            }
            _ => *latest = Some(snapshot),
        }
        response
    }
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotResponse {
    pub rows: Vec<PredictionRow>,
    pub quotes: QuoteMap,
    pub summary: SignalSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<BatchOutcome>,
    pub fetched_at: DateTime<Utc>,
}

impl From<&DashboardSnapshot> for SnapshotResponse {
    fn from(snapshot: &DashboardSnapshot) -> Self {
        Self {
            rows: snapshot.rows(),
            quotes: snapshot.quotes.clone(),
            summary: snapshot.signal_summary(),
            generation: snapshot.generation.clone(),
            fetched_at: snapshot.fetched_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendingResponse {
    pub date: NaiveDate,
    pub group: usize,
    pub symbols: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub timed_out: bool,
    /// Collaborator that failed, when one did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<&'static str>,
}

/// Handler error mapped onto an HTTP status.
#[derive(Debug)]
pub enum ApiError {
    Operation(SignalboardError),
    Search(ServiceError),
    BadRequest(String),
    NotFound(String),
}

impl From<SignalboardError> for ApiError {
    fn from(e: SignalboardError) -> Self {
        ApiError::Operation(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Operation(SignalboardError::EmptyQuery) | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Operation(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Search(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Operation(_) | ApiError::Search(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn body(&self) -> ErrorBody {
        let service = match self {
            ApiError::Operation(SignalboardError::Repository(e)) | ApiError::Search(e) => {
                Some(e.service())
            }
            ApiError::Operation(SignalboardError::Dispatch { source, .. }) => Some(source.service()),
            _ => None,
        };
        let (error, timed_out) = match self {
            ApiError::Operation(e) => (e.to_string(), e.is_timeout()),
            ApiError::Search(e) => (e.to_string(), e.is_timeout()),
            ApiError::BadRequest(m) | ApiError::NotFound(m) => (m.clone(), false),
        };
        ErrorBody {
            error,
            timed_out,
            service,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = self.body();
        if status.is_server_error() {
            error!(
                status = status.as_u16(),
                service = body.service.unwrap_or("-"),
                error = %body.error,
                "Request failed"
            );
        }
        (status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// POST /api/initialize
pub async fn initialize(State(state): State<AppState>) -> Result<Json<SnapshotResponse>, ApiError> {
    let snapshot = state.orchestrator.initialize().await?;
    Ok(Json(state.publish(snapshot).await))
}

/// POST /api/refresh
pub async fn refresh(State(state): State<AppState>) -> Result<Json<SnapshotResponse>, ApiError> {
    let snapshot = state.orchestrator.refresh().await?;
    Ok(Json(state.publish(snapshot).await))
}

/// POST /api/analyze
pub async fn analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<SnapshotResponse>, ApiError> {
    let snapshot = state.orchestrator.analyze_symbol(&req.query).await?;
    info!(query = %req.query, count = snapshot.predictions.len(), "Analysis complete");
    Ok(Json(state.publish(snapshot).await))
}

/// GET /api/snapshot
pub async fn get_snapshot(State(state): State<AppState>) -> Result<Json<SnapshotResponse>, ApiError> {
    let latest = state.latest.read().await;
    latest
        .as_ref()
        .map(|s| Json(SnapshotResponse::from(s)))
        .ok_or_else(|| ApiError::NotFound("Dashboard not initialized yet".into()))
}

/// GET /api/trending
pub async fn get_trending(State(state): State<AppState>) -> Json<TrendingResponse> {
    let date = state.orchestrator.rotator().today();
    Json(TrendingResponse {
        date,
        group: TrendingRotator::index_for(date),
        symbols: TrendingRotator::symbols_for(date),
    })
}

/// GET /api/search?q=
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<SearchHit>>, ApiError> {
    let query = params.q.trim();
    if query.is_empty() {
        return Err(ApiError::BadRequest("Missing search query".into()));
    }
    let hits = state
        .orchestrator
        .resolver()
        .search(query)
        .await
        .map_err(ApiError::Search)?;
    Ok(Json(hits))
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
