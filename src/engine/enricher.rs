//! Live quote enrichment.
//!
//! Prices the distinct symbols of a prediction batch with a single batched
//! quote request, regardless of how many predictions are on screen. Quote
//! failures are absorbed: the caller gets an empty map and renders
//! "quote unavailable" rather than an error. Nothing is cached, so every
//! call returns the latest live values.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::services::{with_timeout, MarketDataService, MARKET_DATA};
use crate::types::{Quote, SymbolSet};

/// Symbol → latest quote.
pub type QuoteMap = BTreeMap<String, Quote>;

/// Batched quote fetcher.
pub struct QuoteEnricher {
    market_data: Arc<dyn MarketDataService>,
    timeout: Duration,
    /// When false, an empty symbol set returns an empty map without a request.
    request_empty: bool,
}

impl QuoteEnricher {
    pub fn new(market_data: Arc<dyn MarketDataService>, timeout: Duration) -> Self {
        Self {
            market_data,
            timeout,
            request_empty: false,
        }
    }

    /// Forward empty symbol sets to the service instead of short-circuiting.
    pub fn requesting_empty_sets(mut self, request_empty: bool) -> Self {
        self.request_empty = request_empty;
        self
    }

    /// Fetch quotes for every symbol in `symbols` with one request.
    pub async fn enrich(&self, symbols: &SymbolSet) -> QuoteMap {
        if symbols.is_empty() && !self.request_empty {
            debug!("No symbols to price, skipping quote request");
            return QuoteMap::new();
        }

        let request = symbols.as_slice();
        match with_timeout(MARKET_DATA, self.timeout, self.market_data.current_quotes(request)).await {
            Ok(quotes) => {
                let map: QuoteMap = quotes
                    .into_iter()
                    .map(|q| (q.symbol.clone(), q))
                    .collect();
                info!(
                    requested = symbols.len(),
                    priced = map.len(),
                    "Quote enrichment complete"
                );
                map
            }
            Err(e) => {
                warn!(
                    requested = symbols.len(),
                    error = %e,
                    timed_out = e.is_timeout(),
                    "Quote enrichment failed, continuing without quotes"
                );
                QuoteMap::new()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
