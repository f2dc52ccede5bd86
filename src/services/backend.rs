//! Hosted backend gateway client.
//!
//! The dashboard's backend exposes two surfaces:
//! - a REST table endpoint for persisted predictions
//!   (`GET {base}/rest/v1/{table}?select=*&order=created_at.desc&limit=N`)
//! - edge functions invoked with an `action` payload
//!   (`POST {base}/functions/v1/{function}`)
//!
//! Auth: `apikey` header plus `Authorization: Bearer {key}` on every call.
//! Edge functions may answer 200 with an `{"error": "..."}` body, which is
//! treated as a rejection.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use super::{
    InferenceService, MarketDataService, PredictionStore, ServiceError, INFERENCE, MARKET_DATA,
    PREDICTION_STORE,
};
use crate::config::BackendConfig;
use crate::types::{Prediction, Quote, SearchHit};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = "signalboard/0.1.0";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct QuotesEnvelope {
    #[serde(default)]
    quotes: Vec<Quote>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    #[serde(default)]
    results: Vec<SearchHit>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AnalyzeEnvelope {
    #[serde(default)]
    error: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Gateway client implementing all three collaborator traits.
pub struct BackendClient {
    http: Client,
    base_url: String,
    api_key: SecretString,
    predictions_table: String,
    inference_function: String,
    market_data_function: String,
}

impl BackendClient {
    pub fn new(config: &BackendConfig, api_key: SecretString) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client for backend gateway")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            predictions_table: config.predictions_table.clone(),
            inference_function: config.inference_function.clone(),
            market_data_function: config.market_data_function.clone(),
        })
    }

    // -- URL builders ----------------------------------------------------

    fn recent_predictions_url(&self, limit: usize) -> String {
        format!(
            "{}/rest/v1/{}?select=*&order={}&limit={limit}",
            self.base_url,
            urlencoding::encode(&self.predictions_table),
            urlencoding::encode("created_at.desc"),
        )
    }

    fn function_url(&self, function: &str) -> String {
        format!("{}/functions/v1/{}", self.base_url, urlencoding::encode(function))
    }

    // -- Internal helpers ------------------------------------------------

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let key = self.api_key.expose_secret();
        request
            .header("apikey", key.as_str())
            .bearer_auth(key)
    }

    async fn send(
        &self,
        service: &'static str,
        request: RequestBuilder,
    ) -> Result<Response, ServiceError> {
        let resp = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| transport_error(service, e))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ServiceError::Status { service, status, body });
        }
        Ok(resp)
    }

    async fn invoke_function<T: DeserializeOwned>(
        &self,
        service: &'static str,
        function: &str,
        payload: serde_json::Value,
    ) -> Result<T, ServiceError> {
        let url = self.function_url(function);
        let action = payload["action"].as_str().unwrap_or_default();
        debug!(url = %url, action, "Invoking backend function");

        let resp = self.send(service, self.http.post(&url).json(&payload)).await?;
        let body = resp.text().await.map_err(|e| transport_error(service, e))?;
        decode_body(service, &body)
    }
}

/// Decode a response body. An empty body decodes as JSON `null`.
fn decode_body<T: DeserializeOwned>(service: &'static str, body: &str) -> Result<T, ServiceError> {
    let text = if body.trim().is_empty() { "null" } else { body };
    serde_json::from_str(text).map_err(|e| ServiceError::Decode {
        service,
        message: e.to_string(),
    })
}

fn transport_error(service: &'static str, err: reqwest::Error) -> ServiceError {
    ServiceError::Transport {
        service,
        message: err.to_string(),
    }
}

fn rejected(service: &'static str, error: Option<String>) -> Result<(), ServiceError> {
    match error {
        Some(message) => Err(ServiceError::Rejected { service, message }),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Trait implementations
// ---------------------------------------------------------------------------

#[async_trait]
impl PredictionStore for BackendClient {
    async fn fetch_recent(&self, limit: usize) -> Result<Vec<Prediction>, ServiceError> {
        let url = self.recent_predictions_url(limit);
        debug!(url = %url, "Fetching recent predictions");

        let resp = self.send(PREDICTION_STORE, self.http.get(&url)).await?;
        let body = resp
            .text()
            .await
            .map_err(|e| transport_error(PREDICTION_STORE, e))?;
        decode_body(PREDICTION_STORE, &body)
    }
}

#[async_trait]
impl InferenceService for BackendClient {
    async fn analyze(&self, symbol: &str) -> Result<(), ServiceError> {
        let envelope: Option<AnalyzeEnvelope> = self
            .invoke_function(
                INFERENCE,
                &self.inference_function,
                json!({ "action": "analyze_stock", "symbol": symbol }),
            )
            .await?;
        rejected(INFERENCE, envelope.unwrap_or_default().error)
    }
}

#[async_trait]
impl MarketDataService for BackendClient {
    async fn current_quotes(&self, symbols: &[String]) -> Result<Vec<Quote>, ServiceError> {
        let envelope: QuotesEnvelope = self
            .invoke_function(
                MARKET_DATA,
                &self.market_data_function,
                json!({ "action": "current_quotes", "symbols": symbols }),
            )
            .await?;
        rejected(MARKET_DATA, envelope.error)?;
        Ok(envelope.quotes)
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ServiceError> {
        let envelope: SearchEnvelope = self
            .invoke_function(
                MARKET_DATA,
                &self.market_data_function,
                json!({ "action": "search_stocks", "query": query }),
            )
            .await?;
        rejected(MARKET_DATA, envelope.error)?;
        Ok(envelope.results)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
