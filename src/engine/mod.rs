//! Core engine: store-vs-generate orchestration and its adapters.

pub mod dispatcher;
pub mod enricher;
pub mod orchestrator;
pub mod repository;
pub mod resolver;
pub mod rotator;

use std::sync::Arc;

use crate::config::OrchestratorConfig;
use crate::services::{InferenceService, MarketDataService, PredictionStore};

use dispatcher::AnalysisDispatcher;
use enricher::QuoteEnricher;
use orchestrator::PredictionOrchestrator;
use repository::PredictionRepository;
use resolver::SymbolResolver;
use rotator::TrendingRotator;

/// Wire an orchestrator from its collaborators and configuration.
pub fn build_orchestrator(
    store: Arc<dyn PredictionStore>,
    inference: Arc<dyn InferenceService>,
    market_data: Arc<dyn MarketDataService>,
    rotator: TrendingRotator,
    cfg: &OrchestratorConfig,
) -> PredictionOrchestrator {
    PredictionOrchestrator::new(
        PredictionRepository::new(store, cfg.repository_timeout()),
        SymbolResolver::new(market_data.clone(), cfg.market_data_timeout()),
        QuoteEnricher::new(market_data, cfg.market_data_timeout())
            .requesting_empty_sets(cfg.request_quotes_for_empty_set),
        rotator,
        AnalysisDispatcher::new(inference, cfg.inference_timeout()),
        cfg.recent_limit,
    )
}
