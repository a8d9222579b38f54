use crate::client::error::{ServiceError, Stage};
use crate::client::AnalysisService;
use crate::config::Settings;
use crate::domain::report::{AnalysisReport, IndustryNews, SearchResponse};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_RETRIES: u32 = 1;
const BASE_BACKOFF_MS: u64 = 250;
const MAX_BACKOFF: Duration = Duration::from_secs(8);

const QUERY_PATH: &str = "/query";
const ANALYZE_PATH: &str = "/analyze/company";
const NEWS_PATH: &str = "/news/by-okved";

#[derive(Debug, Clone)]
pub struct HttpAnalysisClient {
    http: reqwest::Client,
    api_base_url: String,
    news_base_url: String,
    retries: u32,
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
}

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    tin: &'a str,
}

impl HttpAnalysisClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_base_url = settings.require_api_base_url()?.to_string();
        let news_base_url = settings
            .news_api_base_url
            .clone()
            .unwrap_or_else(|| api_base_url.clone());

        let timeout_secs = std::env::var("ANALYST_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let retries = std::env::var("ANALYST_HTTP_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RETRIES)
            .max(1);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build analysis service http client")?;

        Ok(Self {
            http,
            api_base_url,
            news_base_url,
            retries,
        })
    }

    fn url(base: &str, path: &str) -> String {
        format!("{}{}", base.trim_end_matches('/'), path)
    }

    async fn fetch_once<T: DeserializeOwned>(
        stage: Stage,
        req: reqwest::RequestBuilder,
    ) -> Result<T> {
        let res = req
            .send()
            .await
            .with_context(|| format!("{} request failed", stage.as_str()))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .with_context(|| format!("failed to read {} response", stage.as_str()))?;
        let raw_json = serde_json::from_str::<Value>(&text).ok();

        if !status.is_success() {
            return Err(ServiceError {
                stage,
                status: Some(status.as_u16()),
                detail: truncate(&text, 512),
                raw_response_json: raw_json,
            }
            .into());
        }

        let Some(raw_json) = raw_json else {
            return Err(ServiceError {
                stage,
                status: Some(status.as_u16()),
                detail: format!("response is not valid JSON: {}", truncate(&text, 512)),
                raw_response_json: None,
            }
            .into());
        };

        serde_json::from_value::<T>(raw_json.clone()).map_err(|err| {
            ServiceError {
                stage,
                status: Some(status.as_u16()),
                detail: format!("unexpected response shape: {err}"),
                raw_response_json: Some(raw_json),
            }
            .into()
        })
    }

    async fn with_retries<T, F, Fut>(&self, stage: Stage, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if attempt >= self.retries || !is_retryable(&err) {
                        return Err(err);
                    }
                    let backoff = backoff_for(attempt);
                    tracing::warn!(
                        stage = stage.as_str(),
                        attempt,
                        ?backoff,
                        error = %err,
                        "analysis service call failed; retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl AnalysisService for HttpAnalysisClient {
    fn service_name(&self) -> &'static str {
        "http_json"
    }

    async fn search_companies(&self, query: &str) -> Result<SearchResponse> {
        let url = Self::url(&self.api_base_url, QUERY_PATH);
        self.with_retries(Stage::Search, || {
            let req = self.http.post(&url).json(&QueryRequest { query });
            Self::fetch_once(Stage::Search, req)
        })
        .await
    }

    async fn analyze_company(&self, tin: &str) -> Result<AnalysisReport> {
        let url = Self::url(&self.api_base_url, ANALYZE_PATH);
        self.with_retries(Stage::Analyze, || {
            let req = self.http.post(&url).json(&AnalyzeRequest { tin });
            Self::fetch_once(Stage::Analyze, req)
        })
        .await
    }

    async fn news_by_activity_code(&self, code: &str) -> Result<IndustryNews> {
        let url = Self::url(&self.news_base_url, NEWS_PATH);
        self.with_retries(Stage::News, || {
            let req = self.http.get(&url).query(&[("descriptions", code)]);
            Self::fetch_once(Stage::News, req)
        })
        .await
    }
}

/// Delay after the `attempt`-th failure: 250ms doubling, capped at 8s.
fn backoff_for(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    Duration::from_millis(BASE_BACKOFF_MS << exponent).min(MAX_BACKOFF)
}

/// Client errors (4xx) and undecodable bodies are not worth repeating.
fn is_retryable(err: &anyhow::Error) -> bool {
    match err.downcast_ref::<ServiceError>() {
        Some(service) => service.status.map_or(true, |s| s >= 500),
        None => true,
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
