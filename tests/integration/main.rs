//! End-to-end orchestration tests against an in-memory backend.

mod mock_services;

use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;

use mock_services::MockBackend;
use signalboard::config::OrchestratorConfig;
use signalboard::engine::build_orchestrator;
use signalboard::engine::orchestrator::PredictionOrchestrator;
use signalboard::engine::rotator::TrendingRotator;
use signalboard::types::{SignalType, SignalboardError};

/// Day 0 of the rotation: AAPL, MSFT, GOOGL.
fn new_year() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
}

fn orchestrator(backend: &MockBackend) -> PredictionOrchestrator {
    let backend = Arc::new(backend.clone());
    build_orchestrator(
        backend.clone(),
        backend.clone(),
        backend,
        TrendingRotator::pinned(new_year()),
        &OrchestratorConfig::default(),
    )
}

#[tokio::test]
async fn cold_start_generates_trending_group_once() {
    let backend = MockBackend::new();
    let orch = orchestrator(&backend);

    let snap = orch.initialize().await.unwrap();

    assert_eq!(backend.analyze_calls(), vec!["AAPL", "MSFT", "GOOGL"]);
    assert_eq!(backend.store_reads(), 2);
    assert_eq!(snap.predictions.len(), 3);
    assert_eq!(snap.quotes.len(), 3);
    let outcome = snap.generation.unwrap();
    assert_eq!(outcome.succeeded.len(), 3);
    assert!(outcome.failed.is_empty());
}

#[tokio::test]
async fn cold_start_partial_failure_still_loads() {
    let backend = MockBackend::new();
    backend.fail_symbol("AAPL");
    backend.fail_symbol("GOOGL");

    let snap = orchestrator(&backend).initialize().await.unwrap();

    assert_eq!(backend.analyze_calls().len(), 3);
    assert_eq!(snap.predictions.len(), 1);
    assert_eq!(snap.predictions[0].symbol, "MSFT");
    let outcome = snap.generation.unwrap();
    assert_eq!(outcome.succeeded, vec!["MSFT"]);
    let failed: Vec<_> = outcome.failed.iter().map(|f| f.symbol.as_str()).collect();
    assert_eq!(failed, vec!["AAPL", "GOOGL"]);
}

#[tokio::test]
async fn populated_store_never_generates() {
    let backend = MockBackend::new();
    backend.seed("TSLA", SignalType::Sell);

    let orch = orchestrator(&backend);
    let snap = orch.initialize().await.unwrap();
    orch.refresh().await.unwrap();

    assert!(backend.analyze_calls().is_empty());
    assert!(snap.generation.is_none());
    assert_eq!(snap.signal_summary().sell, 1);
}

#[tokio::test]
async fn store_with_only_invalid_rows_does_not_generate() {
    let backend = MockBackend::new();
    backend.seed_invalid("TSLA");

    let snap = orchestrator(&backend).initialize().await.unwrap();

    assert!(backend.analyze_calls().is_empty());
    assert!(snap.generation.is_none());
    assert!(snap.predictions.is_empty());
    assert_eq!(backend.stored(), 1);
}

#[tokio::test]
async fn invalid_newest_row_does_not_shrink_the_page() {
    let backend = MockBackend::new();
    for _ in 0..12 {
        backend.seed("MSFT", SignalType::Hold);
    }
    backend.seed_invalid("TSLA");

    let snap = orchestrator(&backend).refresh().await.unwrap();

    assert_eq!(snap.predictions.len(), 10);
    assert!(snap.predictions.iter().all(|p| p.symbol == "MSFT"));
    assert_eq!(backend.store_reads(), 2);
}

#[tokio::test]
async fn store_failure_skips_generation() {
    let backend = MockBackend::new();
    backend.set_store_error("maintenance");

    let err = orchestrator(&backend).initialize().await.unwrap_err();

    assert!(matches!(err, SignalboardError::Repository(_)));
    assert!(!err.is_timeout());
    assert!(backend.analyze_calls().is_empty());
    assert!(backend.quote_calls().is_empty());
}

#[tokio::test]
async fn concurrent_initialize_shares_one_generation() {
    let backend = MockBackend::new();
    let orch = orchestrator(&backend);

    let (a, b) = futures::join!(orch.initialize(), orch.initialize());
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(backend.analyze_calls().len(), 3);
    assert_eq!(backend.stored(), 3);
    assert_eq!(a.predictions.len(), 3);
    assert_eq!(b.predictions.len(), 3);
    assert_eq!(
        [a.generation.is_some(), b.generation.is_some()]
            .iter()
            .filter(|ran| **ran)
            .count(),
        1
    );
}

#[tokio::test]
async fn quotes_are_batched_per_distinct_symbol() {
    let backend = MockBackend::new();
    backend.seed("TSLA", SignalType::Buy);
    backend.seed("AAPL", SignalType::Hold);
    backend.seed("TSLA", SignalType::Sell);

    orchestrator(&backend).refresh().await.unwrap();

    let calls = backend.quote_calls();
    assert_eq!(calls.len(), 1);
    let mut requested = calls[0].clone();
    requested.sort();
    assert_eq!(requested, vec!["AAPL", "TSLA"]);
}

#[tokio::test]
async fn quote_failure_is_absorbed() {
    let backend = MockBackend::new();
    backend.seed("NVDA", SignalType::Buy);
    backend.set_quotes_error("upstream reset");

    let snap = orchestrator(&backend).refresh().await.unwrap();

    assert_eq!(snap.predictions.len(), 1);
    assert!(snap.quotes.is_empty());
    assert!(snap.rows()[0].quote.is_none());
}

#[tokio::test]
async fn analyze_by_company_name_adds_prediction() {
    let backend = MockBackend::new();
    backend.seed("AAPL", SignalType::Hold);
    let orch = orchestrator(&backend);

    let snap = orch.analyze_symbol("nvidia corp").await.unwrap();

    assert_eq!(backend.analyze_calls(), vec!["NVDA"]);
    assert_eq!(snap.predictions.len(), 2);
    assert!(snap.predictions.iter().any(|p| p.symbol == "NVDA"));
    assert!(snap.quotes.contains_key("NVDA"));
}

#[tokio::test]
async fn analyze_ticker_skips_search() {
    let backend = MockBackend::new();
    let orch = orchestrator(&backend);

    orch.analyze_symbol(" tsla ").await.unwrap();

    assert_eq!(backend.analyze_calls(), vec!["TSLA"]);
}

#[tokio::test]
async fn failed_analysis_leaves_store_untouched() {
    let backend = MockBackend::new();
    backend.seed("AAPL", SignalType::Buy);
    backend.fail_symbol("ZZZZ");
    let orch = orchestrator(&backend);
    let reads_before = backend.store_reads();

    let err = orch.analyze_symbol("zzzz").await.unwrap_err();

    match err {
        SignalboardError::Dispatch { symbol, .. } => assert_eq!(symbol, "ZZZZ"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(backend.stored(), 1);
    assert_eq!(backend.store_reads(), reads_before);
}

#[tokio::test]
async fn recent_limit_caps_the_dashboard() {
    let backend = MockBackend::new();
    for _ in 0..15 {
        backend.seed("MSFT", SignalType::Hold);
    }
    let cfg = OrchestratorConfig {
        recent_limit: 5,
        repository_timeout_secs: 1,
        ..OrchestratorConfig::default()
    };
    let shared = Arc::new(backend.clone());
    let orch = build_orchestrator(
        shared.clone(),
        shared.clone(),
        shared,
        TrendingRotator::pinned(new_year()),
        &cfg,
    );

    let snap = orch.refresh().await.unwrap();
    assert_eq!(snap.predictions.len(), 5);
    assert_eq!(cfg.repository_timeout(), Duration::from_secs(1));
}
