//! Shared types for signalboard.
//!
//! These types form the data model used across all modules. Predictions
//! are produced by the inference service and are read-only here; quotes
//! are transient and refetched on every enrichment.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::services::ServiceError;

// ---------------------------------------------------------------------------
// Prediction
// ---------------------------------------------------------------------------

/// A persisted model prediction for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Opaque identifier assigned by the store (uuid or integer key).
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    pub symbol: String,
    pub predicted_price: Decimal,
    /// Model-reported reliability in [0, 1]. Never rounded by this layer.
    pub confidence_score: f64,
    pub signal_type: SignalType,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub technical_indicators: serde_json::Value,
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} → ${} ({:.0}% confidence)",
            self.symbol,
            self.signal_type,
            self.predicted_price,
            self.confidence_score * 100.0,
        )
    }
}

impl Prediction {
    /// Check the invariants the inference service is expected to uphold.
    pub fn validate(&self) -> Result<(), PredictionError> {
        if !(0.0..=1.0).contains(&self.confidence_score) {
            return Err(PredictionError::ConfidenceOutOfRange(self.confidence_score));
        }
        if self.expires_at <= self.created_at {
            return Err(PredictionError::ExpiresBeforeCreated {
                created_at: self.created_at,
                expires_at: self.expires_at,
            });
        }
        if self.symbol.trim().is_empty() {
            return Err(PredictionError::MissingSymbol);
        }
        Ok(())
    }

    /// Advisory only: stale predictions are still displayed.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Predicted move relative to a live price, in percent.
    ///
    /// Returns `None` when the live price is zero or not finite.
    pub fn expected_move_pct(&self, live_price: f64) -> Option<f64> {
        if !live_price.is_finite() || live_price == 0.0 {
            return None;
        }
        let predicted = self.predicted_price.to_f64()?;
        Some((predicted - live_price) / live_price * 100.0)
    }
}

/// Accept either a JSON string or a JSON integer as an identifier.
fn opaque_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Int(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Int(n) => n.to_string(),
    })
}

/// Invariant violations on a fetched prediction row.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictionError {
    #[error("confidence score {0} outside [0, 1]")]
    ConfidenceOutOfRange(f64),

    #[error("expires_at {expires_at} is not after created_at {created_at}")]
    ExpiresBeforeCreated {
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    },

    #[error("prediction has no symbol")]
    MissingSymbol,
}

// ---------------------------------------------------------------------------
// Signal type
// ---------------------------------------------------------------------------

/// Discrete trading recommendation attached to a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalType {
    #[serde(alias = "BUY", alias = "Buy")]
    Buy,
    #[serde(alias = "SELL", alias = "Sell")]
    Sell,
    #[serde(alias = "HOLD", alias = "Hold")]
    Hold,
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalType::Buy => write!(f, "buy"),
            SignalType::Sell => write!(f, "sell"),
            SignalType::Hold => write!(f, "hold"),
        }
    }
}

// ---------------------------------------------------------------------------
// Quotes and search
// ---------------------------------------------------------------------------

/// A live quote snapshot. Transient; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    /// Absolute change since the previous close.
    #[serde(default)]
    pub change: f64,
    #[serde(default)]
    pub change_percent: f64,
}

/// One fuzzy-search match from the market-data service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub symbol: String,
    #[serde(default, alias = "company_name", alias = "longName")]
    pub name: Option<String>,
    #[serde(default)]
    pub exchange: Option<String>,
}

// ---------------------------------------------------------------------------
// Symbol set
// ---------------------------------------------------------------------------

/// Ordered, deduplicated set of symbols, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SymbolSet(Vec<String>);

impl SymbolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Distinct symbols of a prediction batch.
    pub fn from_predictions(predictions: &[Prediction]) -> Self {
        predictions.iter().map(|p| p.symbol.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<'a> FromIterator<&'a str> for SymbolSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut seen = HashSet::new();
        let symbols = iter
            .into_iter()
            .filter(|s| seen.insert(*s))
            .map(String::from)
            .collect();
        Self(symbols)
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Failures surfaced by the orchestration operations.
///
/// Enrichment, resolution and per-symbol generation failures are absorbed
/// where they happen and never appear here.
#[derive(Debug, thiserror::Error)]
pub enum SignalboardError {
    #[error("Prediction store read failed: {0}")]
    Repository(#[source] ServiceError),

    #[error("Analysis request for {symbol} failed: {source}")]
    Dispatch {
        symbol: String,
        #[source]
        source: ServiceError,
    },

    #[error("Analysis query is empty")]
    EmptyQuery,
}

impl SignalboardError {
    /// Whether the underlying collaborator call hit its deadline.
    pub fn is_timeout(&self) -> bool {
        match self {
            SignalboardError::Repository(e) => e.is_timeout(),
            SignalboardError::Dispatch { source, .. } => source.is_timeout(),
            SignalboardError::EmptyQuery => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Build a valid prediction created `age_mins` ago and expiring a day later.
#[cfg(test)]
pub fn sample_prediction(id: &str, symbol: &str, age_mins: i64) -> Prediction {
    let created_at = Utc::now() - chrono::Duration::minutes(age_mins);
    Prediction {
        id: id.to_string(),
        symbol: symbol.to_string(),
        predicted_price: Decimal::new(18725, 2),
        confidence_score: 0.73,
        signal_type: SignalType::Buy,
        created_at,
        expires_at: created_at + chrono::Duration::days(1),
        technical_indicators: serde_json::json!({ "rsi": 61.2 }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
