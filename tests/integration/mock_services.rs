//! In-memory backend for integration testing.
//!
//! Provides a deterministic implementation of all three service traits.
//! Successful analysis requests persist a fresh prediction, so the
//! orchestrator's store-then-generate-then-requery flow can be exercised
//! end to end with no network.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use signalboard::services::{
    InferenceService, MarketDataService, PredictionStore, ServiceError, INFERENCE, MARKET_DATA,
    PREDICTION_STORE,
};
use signalboard::types::{Prediction, Quote, SearchHit, SignalType};

/// A mock backend whose state is fully controllable from test code.
#[derive(Clone, Default)]
pub struct MockBackend {
    predictions: Arc<Mutex<Vec<Prediction>>>,
    prices: Arc<Mutex<HashMap<String, f64>>>,
    directory: Arc<Mutex<Vec<SearchHit>>>,
    /// Symbols the inference service refuses to analyze.
    failing: Arc<Mutex<HashSet<String>>>,
    analyze_calls: Arc<Mutex<Vec<String>>>,
    quote_calls: Arc<Mutex<Vec<Vec<String>>>>,
    store_reads: Arc<Mutex<usize>>,
    /// If set, store reads return this error.
    store_error: Arc<Mutex<Option<String>>>,
    /// If set, quote requests return this error.
    quotes_error: Arc<Mutex<Option<String>>>,
}

impl MockBackend {
    /// Create an empty backend with a small price table and directory.
    pub fn new() -> Self {
        let backend = Self::default();
        {
            let mut prices = backend.prices.lock().unwrap();
            for (symbol, price) in [
                ("AAPL", 190.0),
                ("MSFT", 410.0),
                ("GOOGL", 170.0),
                ("TSLA", 250.0),
                ("NVDA", 120.0),
            ] {
                prices.insert(symbol.to_string(), price);
            }
        }
        backend.directory.lock().unwrap().extend([
            hit("AAPL", "Apple Inc."),
            hit("TSLA", "Tesla, Inc."),
            hit("NVDA", "NVIDIA Corporation"),
        ]);
        backend
    }

    /// Seed the store with an existing prediction.
    pub fn seed(&self, symbol: &str, signal: SignalType) {
        self.predictions.lock().unwrap().push(prediction(symbol, signal));
    }

    /// Seed a row the repository must reject (confidence above 1). It is
    /// stamped a second ahead so it sorts newest.
    pub fn seed_invalid(&self, symbol: &str) {
        let mut row = prediction(symbol, SignalType::Buy);
        row.confidence_score = 1.5;
        row.created_at += Duration::seconds(1);
        row.expires_at += Duration::seconds(1);
        self.predictions.lock().unwrap().push(row);
    }

    pub fn fail_symbol(&self, symbol: &str) {
        self.failing.lock().unwrap().insert(symbol.to_string());
    }

    pub fn set_store_error(&self, msg: &str) {
        *self.store_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn set_quotes_error(&self, msg: &str) {
        *self.quotes_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn analyze_calls(&self) -> Vec<String> {
        self.analyze_calls.lock().unwrap().clone()
    }

    pub fn quote_calls(&self) -> Vec<Vec<String>> {
        self.quote_calls.lock().unwrap().clone()
    }

    pub fn store_reads(&self) -> usize {
        *self.store_reads.lock().unwrap()
    }

    pub fn stored(&self) -> usize {
        self.predictions.lock().unwrap().len()
    }
}

fn hit(symbol: &str, name: &str) -> SearchHit {
    SearchHit {
        symbol: symbol.to_string(),
        name: Some(name.to_string()),
        exchange: Some("NASDAQ".to_string()),
    }
}

fn prediction(symbol: &str, signal: SignalType) -> Prediction {
    let created_at = Utc::now();
    Prediction {
        id: Uuid::new_v4().to_string(),
        symbol: symbol.to_string(),
        predicted_price: Decimal::new(20150, 2),
        confidence_score: 0.68,
        signal_type: signal,
        created_at,
        expires_at: created_at + Duration::days(1),
        technical_indicators: serde_json::json!({ "macd": "bullish" }),
    }
}

#[async_trait]
impl PredictionStore for MockBackend {
    async fn fetch_recent(&self, limit: usize) -> Result<Vec<Prediction>, ServiceError> {
        *self.store_reads.lock().unwrap() += 1;
        if let Some(msg) = self.store_error.lock().unwrap().clone() {
            return Err(ServiceError::Status {
                service: PREDICTION_STORE,
                status: 503,
                body: msg,
            });
        }
        let mut rows = self.predictions.lock().unwrap().clone();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit);
        Ok(rows)
    }
}

#[async_trait]
impl InferenceService for MockBackend {
    async fn analyze(&self, symbol: &str) -> Result<(), ServiceError> {
        self.analyze_calls.lock().unwrap().push(symbol.to_string());
        // Let concurrent callers interleave while the "model" runs.
        tokio::task::yield_now().await;

        if self.failing.lock().unwrap().contains(symbol) {
            return Err(ServiceError::Rejected {
                service: INFERENCE,
                message: format!("no data for {symbol}"),
            });
        }
        self.predictions
            .lock()
            .unwrap()
            .push(prediction(symbol, SignalType::Buy));
        Ok(())
    }
}

#[async_trait]
impl MarketDataService for MockBackend {
    async fn current_quotes(&self, symbols: &[String]) -> Result<Vec<Quote>, ServiceError> {
        self.quote_calls.lock().unwrap().push(symbols.to_vec());
        if let Some(msg) = self.quotes_error.lock().unwrap().clone() {
            return Err(ServiceError::Transport {
                service: MARKET_DATA,
                message: msg,
            });
        }
        let prices = self.prices.lock().unwrap();
        Ok(symbols
            .iter()
            .filter_map(|s| {
                prices.get(s).map(|&price| Quote {
                    symbol: s.clone(),
                    price,
                    change: 1.0,
                    change_percent: 0.5,
                })
            })
            .collect())
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ServiceError> {
        let needle = query.to_lowercase();
        Ok(self
            .directory
            .lock()
            .unwrap()
            .iter()
            .filter(|h| {
                h.symbol.to_lowercase().contains(&needle)
                    || h.name
                        .as_deref()
                        .is_some_and(|n| n.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect())
    }
}
