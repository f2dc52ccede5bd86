//! External collaborators.
//!
//! Defines the three service seams the orchestration layer consumes:
//! - `PredictionStore`: read access to persisted predictions
//! - `InferenceService`: analyses a symbol and persists a new prediction
//! - `MarketDataService`: live quotes and fuzzy symbol search
//!
//! `backend::BackendClient` implements all three against the hosted
//! backend gateway.

pub mod backend;

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

use crate::types::{Prediction, Quote, SearchHit};

/// Service names used in errors and log fields.
pub const PREDICTION_STORE: &str = "prediction-store";
pub const INFERENCE: &str = "inference";
pub const MARKET_DATA: &str = "market-data";

/// Read access to persisted predictions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PredictionStore: Send + Sync {
    /// Most recent predictions ordered by `created_at` descending.
    async fn fetch_recent(&self, limit: usize) -> Result<Vec<Prediction>, ServiceError>;
}

/// The inference service. Success means a new prediction was persisted.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InferenceService: Send + Sync {
    async fn analyze(&self, symbol: &str) -> Result<(), ServiceError>;
}

/// Live market data.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataService: Send + Sync {
    /// One batched quote request for all `symbols`.
    async fn current_quotes(&self, symbols: &[String]) -> Result<Vec<Quote>, ServiceError>;

    /// Fuzzy search by company name or partial symbol.
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ServiceError>;
}

/// Transport-level failure of an external collaborator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ServiceError {
    #[error("{service} timed out after {}ms", timeout.as_millis())]
    Timeout {
        service: &'static str,
        timeout: Duration,
    },

    #[error("{service} request failed: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },

    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("{service} rejected the request: {message}")]
    Rejected {
        service: &'static str,
        message: String,
    },

    #[error("{service} response could not be decoded: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },
}

impl ServiceError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ServiceError::Timeout { .. })
    }

    pub fn service(&self) -> &'static str {
        match self {
            ServiceError::Timeout { service, .. }
            | ServiceError::Transport { service, .. }
            | ServiceError::Status { service, .. }
            | ServiceError::Rejected { service, .. }
            | ServiceError::Decode { service, .. } => service,
        }
    }
}

/// Run a collaborator call under a deadline.
///
/// Expiry maps to `ServiceError::Timeout` so callers can tell a slow
/// service apart from a failing one.
pub async fn with_timeout<T, F>(
    service: &'static str,
    timeout: Duration,
    call: F,
) -> Result<T, ServiceError>
where
    F: Future<Output = Result<T, ServiceError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(ServiceError::Timeout { service, timeout }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
