//! Prediction repository adapter.
//!
//! Reads the newest predictions from the store. Unlike the other adapters,
//! read failures are NOT absorbed here: the orchestrator must be able to
//! tell "store is empty" apart from "store is unreachable" before it
//! decides whether to run cold-start generation.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::services::{with_timeout, PredictionStore, ServiceError, PREDICTION_STORE};
use crate::types::Prediction;

/// Extra read rounds allowed to top the page back up after invalid rows.
const MAX_REFILL_ROUNDS: usize = 3;

/// Result of one repository read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOutcome {
    /// Valid predictions, newest first, at most `limit`.
    pub predictions: Vec<Prediction>,
    /// Rows the store returned, valid or not.
    pub stored: usize,
    /// Rows skipped because they broke the prediction invariants.
    pub dropped: usize,
}

impl FetchOutcome {
    /// Whether the store itself holds no rows at all.
    pub fn store_is_empty(&self) -> bool {
        self.stored == 0
    }
}

/// Thin adapter over a `PredictionStore`.
pub struct PredictionRepository {
    store: Arc<dyn PredictionStore>,
    timeout: Duration,
}

impl PredictionRepository {
    pub fn new(store: Arc<dyn PredictionStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Newest-first predictions, at most `limit` of them.
    ///
    /// Rows that break the prediction invariants are dropped with a
    /// warning rather than shown. When that leaves the page short, the
    /// store is re-read with a larger limit so the page still holds the
    /// newest `limit` valid rows.
    pub async fn fetch_recent(&self, limit: usize) -> Result<FetchOutcome, ServiceError> {
        let mut request = limit;
        let mut round = 0;

        loop {
            let rows =
                with_timeout(PREDICTION_STORE, self.timeout, self.store.fetch_recent(request)).await?;
            let stored = rows.len();

            let mut predictions: Vec<Prediction> = rows
                .into_iter()
                .filter(|p| match p.validate() {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(id = %p.id, symbol = %p.symbol, error = %e, "Skipping invalid prediction row");
                        false
                    }
                })
                .collect();
            let dropped = stored - predictions.len();

            let exhausted = stored < request;
            if predictions.len() >= limit || exhausted || round == MAX_REFILL_ROUNDS {
                // Stable sort keeps the store's order among equal timestamps.
                predictions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                predictions.truncate(limit);

                debug!(stored, dropped, kept = predictions.len(), limit, round, "Fetched recent predictions");
                return Ok(FetchOutcome {
                    predictions,
                    stored,
                    dropped,
                });
            }

            request = limit + dropped;
            round += 1;
            debug!(request, dropped, "Page short after invalid rows, re-reading store");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
