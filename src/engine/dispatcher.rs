//! Analysis request dispatch.
//!
//! Sends analyze requests to the inference service, one symbol at a time.
//! Batch generation runs sequentially and isolates failures per symbol:
//! one symbol's inference error never stops the rest of the batch.

use serde::{Serialize, Serializer};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::services::{with_timeout, InferenceService, ServiceError, INFERENCE};

// ---------------------------------------------------------------------------
// Batch result
// ---------------------------------------------------------------------------

/// Outcome of a generation batch, in request order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchOutcome {
    pub succeeded: Vec<String>,
    pub failed: Vec<FailedAnalysis>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedAnalysis {
    pub symbol: String,
    #[serde(serialize_with = "error_message")]
    pub error: ServiceError,
}

fn error_message<S: Serializer>(error: &ServiceError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(error)
}

impl BatchOutcome {
    /// Number of analyze requests issued.
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn all_failed(&self) -> bool {
        self.succeeded.is_empty() && !self.failed.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

pub struct AnalysisDispatcher {
    inference: Arc<dyn InferenceService>,
    timeout: Duration,
}

impl AnalysisDispatcher {
    pub fn new(inference: Arc<dyn InferenceService>, timeout: Duration) -> Self {
        Self { inference, timeout }
    }

    /// Issue a single analyze request. No retry.
    pub async fn request_analysis(&self, symbol: &str) -> Result<(), ServiceError> {
        with_timeout(INFERENCE, self.timeout, self.inference.analyze(symbol)).await
    }

    /// Analyze each symbol in turn, recording per-symbol success or failure.
    pub async fn generate_batch(&self, symbols: &[String]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for symbol in symbols {
            match self.request_analysis(symbol).await {
                Ok(()) => {
                    info!(symbol = %symbol, "Generated prediction");
                    outcome.succeeded.push(symbol.clone());
                }
                Err(e) => {
                    warn!(
                        symbol = %symbol,
                        error = %e,
                        timed_out = e.is_timeout(),
                        "Prediction generation failed, continuing with next symbol"
                    );
                    outcome.failed.push(FailedAnalysis {
                        symbol: symbol.clone(),
                        error: e,
                    });
                }
            }
        }

        info!(
            attempted = outcome.attempted(),
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "Generation batch complete"
        );
        outcome
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
