//! Prediction orchestrator.
//!
//! Ties the adapters together into the three operations the dashboard
//! calls: `initialize`, `refresh` and `analyze_symbol`. Each returns a
//! complete new `DashboardSnapshot`; nothing is mutated in place and the
//! store remains the only source of truth.
//!
//! Cold start: when the store is empty, `initialize` generates predictions
//! for today's trending group. A single-flight guard ensures concurrent
//! initializations during the same cold-start window share one generation
//! run instead of each issuing a full batch of inference requests.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::dispatcher::{AnalysisDispatcher, BatchOutcome};
use super::enricher::{QuoteEnricher, QuoteMap};
use super::repository::{FetchOutcome, PredictionRepository};
use super::resolver::SymbolResolver;
use super::rotator::TrendingRotator;
use crate::types::{Prediction, Quote, SignalType, SignalboardError, SymbolSet};

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Everything the dashboard needs to render, as of `fetched_at`.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    /// Newest first.
    pub predictions: Vec<Prediction>,
    /// Missing entries mean "quote unavailable".
    pub quotes: QuoteMap,
    /// Present only when this snapshot triggered cold-start generation.
    pub generation: Option<BatchOutcome>,
    pub fetched_at: DateTime<Utc>,
}

/// A prediction joined with its live quote.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionRow {
    pub prediction: Prediction,
    pub quote: Option<Quote>,
    /// Predicted move against the live price, in percent.
    pub expected_move_pct: Option<f64>,
    pub stale: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SignalSummary {
    pub buy: usize,
    pub sell: usize,
    pub hold: usize,
}

impl DashboardSnapshot {
    pub fn rows(&self) -> Vec<PredictionRow> {
        self.predictions
            .iter()
            .map(|p| {
                let quote = self.quotes.get(&p.symbol);
                PredictionRow {
                    prediction: p.clone(),
                    quote: quote.cloned(),
                    expected_move_pct: quote.and_then(|q| p.expected_move_pct(q.price)),
                    stale: p.is_stale(self.fetched_at),
                }
            })
            .collect()
    }

    pub fn signal_summary(&self) -> SignalSummary {
        self.predictions
            .iter()
            .fold(SignalSummary::default(), |mut acc, p| {
                match p.signal_type {
                    SignalType::Buy => acc.buy += 1,
                    SignalType::Sell => acc.sell += 1,
                    SignalType::Hold => acc.hold += 1,
                }
                acc
            })
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct PredictionOrchestrator {
    repository: PredictionRepository,
    resolver: SymbolResolver,
    enricher: QuoteEnricher,
    rotator: TrendingRotator,
    dispatcher: AnalysisDispatcher,
    recent_limit: usize,
    /// Held for the duration of a cold-start generation run.
    cold_start: Mutex<()>,
    /// Completed cold-start generation runs.
    generations: AtomicU64,
}

impl PredictionOrchestrator {
    pub fn new(
        repository: PredictionRepository,
        resolver: SymbolResolver,
        enricher: QuoteEnricher,
        rotator: TrendingRotator,
        dispatcher: AnalysisDispatcher,
        recent_limit: usize,
    ) -> Self {
        Self {
            repository,
            resolver,
            enricher,
            rotator,
            dispatcher,
            recent_limit,
            cold_start: Mutex::new(()),
            generations: AtomicU64::new(0),
        }
    }

    pub fn rotator(&self) -> &TrendingRotator {
        &self.rotator
    }

    pub fn resolver(&self) -> &SymbolResolver {
        &self.resolver
    }

    /// Load the dashboard, generating predictions first if the store is empty.
    pub async fn initialize(&self) -> Result<DashboardSnapshot, SignalboardError> {
        let observed = self.generations.load(Ordering::Acquire);
        let mut fetched = self.fetch_recent().await?;
        let mut generation = None;

        // Only a store with no rows at all triggers generation; rows that
        // fail validation still count as existing predictions.
        if fetched.store_is_empty() {
            generation = self.cold_start_generation(observed).await;
            fetched = self.fetch_recent().await?;
            info!(count = fetched.predictions.len(), "Re-queried store after cold start");
        } else if fetched.predictions.is_empty() {
            warn!(dropped = fetched.dropped, "Store holds only invalid predictions, not generating");
        }

        Ok(self.snapshot(fetched.predictions, generation).await)
    }

    /// Re-read the store and re-price. Never generates.
    pub async fn refresh(&self) -> Result<DashboardSnapshot, SignalboardError> {
        let fetched = self.fetch_recent().await?;
        Ok(self.snapshot(fetched.predictions, None).await)
    }

    /// Resolve free text to a symbol, request analysis for it, then refresh.
    ///
    /// A dispatch failure ends the operation before the refresh.
    pub async fn analyze_symbol(&self, raw_input: &str) -> Result<DashboardSnapshot, SignalboardError> {
        if raw_input.trim().is_empty() {
            return Err(SignalboardError::EmptyQuery);
        }

        let symbol = self.resolver.resolve(raw_input).await;
        info!(query = %raw_input, symbol = %symbol, "Requesting on-demand analysis");

        self.dispatcher
            .request_analysis(&symbol)
            .await
            .map_err(|source| SignalboardError::Dispatch {
                symbol: symbol.clone(),
                source,
            })?;

        self.refresh().await
    }

    // -- Internal helpers ------------------------------------------------

    async fn fetch_recent(&self) -> Result<FetchOutcome, SignalboardError> {
        self.repository
            .fetch_recent(self.recent_limit)
            .await
            .map_err(|e| {
                warn!(
                    service = e.service(),
                    error = %e,
                    timed_out = e.is_timeout(),
                    "Prediction store read failed"
                );
                SignalboardError::Repository(e)
            })
    }

    /// Run trending generation unless another caller already did so since
    /// `observed` was read. Returns the outcome only if this call ran it.
    async fn cold_start_generation(&self, observed: u64) -> Option<BatchOutcome> {
        let _guard = self.cold_start.lock().await;

        if self.generations.load(Ordering::Acquire) != observed {
            info!("Cold-start generation already ran concurrently, skipping");
            return None;
        }

        let symbols = self.rotator.todays_symbols();
        info!(
            group = self.rotator.todays_index(),
            symbols = ?symbols,
            "Store empty, generating predictions for trending symbols"
        );

        let outcome = self.dispatcher.generate_batch(&symbols).await;
        self.generations.fetch_add(1, Ordering::Release);

        if outcome.all_failed() {
            warn!(failed = outcome.failed.len(), "Every trending symbol failed to generate");
        }
        Some(outcome)
    }

    async fn snapshot(
        &self,
        predictions: Vec<Prediction>,
        generation: Option<BatchOutcome>,
    ) -> DashboardSnapshot {
        let symbols = SymbolSet::from_predictions(&predictions);
        let quotes = self.enricher.enrich(&symbols).await;
        DashboardSnapshot {
            predictions,
            quotes,
            generation,
            fetched_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
