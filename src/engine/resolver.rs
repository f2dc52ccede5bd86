//! Free-text → canonical symbol resolution.
//!
//! Input that already looks like a ticker (1–5 letters) is used as-is.
//! Anything else goes through the market-data fuzzy search and the first
//! hit wins. Resolution never fails: if search errors or finds nothing,
//! the upper-cased input is passed downstream and the inference request
//! surfaces the bad symbol instead.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::services::{with_timeout, MarketDataService, ServiceError, MARKET_DATA};
use crate::types::SearchHit;

/// Longest input treated as a ticker without searching.
const MAX_TICKER_LEN: usize = 5;

/// Upper bound on search hits passed back to callers.
pub const MAX_SEARCH_RESULTS: usize = 10;

/// Best-effort symbol resolver backed by market-data search.
pub struct SymbolResolver {
    market_data: Arc<dyn MarketDataService>,
    timeout: Duration,
}

impl SymbolResolver {
    pub fn new(market_data: Arc<dyn MarketDataService>, timeout: Duration) -> Self {
        Self { market_data, timeout }
    }

    /// Whether `candidate` matches `^[A-Z]{1,5}$`.
    pub fn is_ticker(candidate: &str) -> bool {
        (1..=MAX_TICKER_LEN).contains(&candidate.len())
            && candidate.chars().all(|c| c.is_ascii_uppercase())
    }

    /// Resolve raw user input to a canonical symbol.
    pub async fn resolve(&self, raw_input: &str) -> String {
        let upper = raw_input.trim().to_uppercase();

        if Self::is_ticker(&upper) {
            debug!(symbol = %upper, "Input already a ticker");
            return upper;
        }

        match self.search(raw_input.trim()).await {
            Ok(hits) => match hits.into_iter().next() {
                Some(hit) => {
                    info!(query = %raw_input, symbol = %hit.symbol, "Resolved via search");
                    hit.symbol
                }
                None => {
                    warn!(query = %raw_input, "Search found no match, using input as symbol");
                    upper
                }
            },
            Err(e) => {
                warn!(query = %raw_input, error = %e, "Search failed, using input as symbol");
                upper
            }
        }
    }

    /// Fuzzy search, bounded by the market-data timeout and capped at
    /// `MAX_SEARCH_RESULTS` hits.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ServiceError> {
        let mut hits = with_timeout(MARKET_DATA, self.timeout, self.market_data.search(query)).await?;
        hits.truncate(MAX_SEARCH_RESULTS);
        Ok(hits)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
