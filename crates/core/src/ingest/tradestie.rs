use crate::config::Settings;
use crate::domain::contract::batch_from_raw;
use crate::domain::sentiment::StockBatch;
use crate::error::ProviderError;
use crate::ingest::provider::SentimentProvider;
use crate::ingest::types::TradestieStock;
use crate::time::RequestKey;
use anyhow::{Context, Result};
use reqwest::header::{HeaderValue, ACCEPT};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://tradestie.com/api/v1/apps/reddit";
const DEFAULT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_RETRIES: u32 = 1;
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Sentiment scraped from r/wallstreetbets comments, served by the Tradestie API.
#[derive(Debug, Clone)]
pub struct TradestieProvider {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
    retries: u32,
}

impl TradestieProvider {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_options(
            base_url,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            DEFAULT_RETRIES,
        )
    }

    /// `retries` counts attempts, so `1` means a single request.
    pub fn with_options(base_url: impl Into<String>, timeout: Duration, retries: u32) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build sentiment provider http client")?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            timeout,
            retries: retries.max(1),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings
            .provider_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let timeout =
            Duration::from_secs(settings.provider_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
        let retries = settings.provider_retries.unwrap_or(DEFAULT_RETRIES);

        Self::with_options(base_url, timeout, retries)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Every attempt may use the full client timeout, plus the backoff sleeps
    /// between attempts.
    pub fn worst_case_fetch(&self) -> Duration {
        (1..self.retries).fold(
            self.timeout.saturating_mul(self.retries),
            |total, attempt| total.saturating_add(backoff(attempt)),
        )
    }

    async fn fetch_once(&self, key: &RequestKey) -> Result<Vec<TradestieStock>, ProviderError> {
        let res = self
            .http
            .get(&self.base_url)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .query(&[("date", key.as_str())])
            .send()
            .await?;

        let status = res.status();
        let text = res.text().await?;

        if !status.is_success() {
            return Err(ProviderError::Status {
                status,
                body: text.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait::async_trait]
impl SentimentProvider for TradestieProvider {
    fn provider_name(&self) -> &'static str {
        "tradestie_wsb"
    }

    fn fetch_budget(&self) -> Option<Duration> {
        Some(self.worst_case_fetch())
    }

    async fn fetch(&self, key: &RequestKey) -> Result<StockBatch, ProviderError> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.fetch_once(key).await {
                Ok(records) => return Ok(batch_from_raw(records)?),
                Err(err) => {
                    if attempt >= self.retries {
                        return Err(err);
                    }
                    let delay = backoff(attempt);
                    tracing::warn!(attempt, backoff = ?delay, %key, error = %err, "sentiment provider fetch failed; retrying");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(250 << attempt.saturating_sub(1).min(6))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sentiment::Sentiment;
    use axum::{extract::Query, http::StatusCode, routing::get, Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/api/v1/apps/reddit")
    }

    #[test]
    fn parses_upstream_shape() {
        let v = json!([
            {"no_of_comments": 179, "Sentiment": "Bullish", "sentiment_score": 0.13, "Ticker": "GME"}
        ]);
        let parsed: Vec<TradestieStock> = serde_json::from_value(v).unwrap();
        assert_eq!(parsed[0].ticker, "GME");
        assert_eq!(parsed[0].sentiment, "Bullish");
        assert_eq!(parsed[0].no_of_comments, 179);
    }

    #[test]
    fn rejects_string_scores_via_deserialize() {
        let v = json!([
            {"no_of_comments": 1, "Sentiment": "Bullish", "sentiment_score": "0.13", "Ticker": "GME"}
        ]);
        assert!(serde_json::from_value::<Vec<TradestieStock>>(v).is_err());
    }

    #[test]
    fn fetch_budget_covers_timeout_retries_and_backoff() {
        let single = TradestieProvider::with_options("http://localhost", Duration::from_secs(30), 1)
            .unwrap();
        assert_eq!(single.fetch_budget(), Some(Duration::from_secs(30)));

        let retried = TradestieProvider::with_options("http://localhost", Duration::from_secs(10), 3)
            .unwrap();
        // 3 attempts of 10 s, then 250 ms and 500 ms of backoff.
        assert_eq!(retried.fetch_budget(), Some(Duration::from_millis(30_750)));
    }

    #[test]
    fn settings_timeout_flows_into_budget() {
        let settings = Settings {
            sentry_dsn: None,
            provider_url: Some("http://localhost".to_string()),
            provider_timeout_secs: Some(30),
            provider_retries: None,
        };
        let provider = TradestieProvider::from_settings(&settings).unwrap();
        assert_eq!(provider.fetch_budget(), Some(Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn sends_date_query_and_converts_response() {
        let app = Router::new().route(
            "/api/v1/apps/reddit",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                let date = q.get("date").cloned().unwrap_or_default();
                Json(json!([
                    {"no_of_comments": 10, "Sentiment": "Bullish", "sentiment_score": 0.13, "Ticker": date},
                    {"no_of_comments": 4, "Sentiment": "Bearish", "sentiment_score": -0.227, "Ticker": "EV"}
                ]))
            }),
        );
        let provider = TradestieProvider::new(serve(app).await).unwrap();

        let key = crate::time::derive_key(Some("2022-06-11"));
        let batch = provider.fetch(&key).await.unwrap();

        assert_eq!(batch.len(), 2);
        // The stub echoes the date back as the ticker.
        assert_eq!(batch.items()[0].ticker(), "2022-06-11");
        assert_eq!(batch.items()[1].sentiment(), Sentiment::Bearish);
    }

    #[tokio::test]
    async fn maps_non_success_status_to_error() {
        let app = Router::new().route(
            "/api/v1/apps/reddit",
            get(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
        );
        let provider = TradestieProvider::new(serve(app).await).unwrap();

        let err = provider
            .fetch(&crate::time::derive_key(None))
            .await
            .unwrap_err();
        match err {
            ProviderError::Status { status, body } => {
                assert_eq!(status, reqwest::StatusCode::BAD_GATEWAY);
                assert_eq!(body, "upstream down");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_sentiment_fails_whole_fetch() {
        let app = Router::new().route(
            "/api/v1/apps/reddit",
            get(|| async {
                Json(json!([
                    {"no_of_comments": 10, "Sentiment": "Bullish", "sentiment_score": 0.13, "Ticker": "GME"},
                    {"no_of_comments": 3, "Sentiment": "Neutral", "sentiment_score": 0.0, "Ticker": "TA"}
                ]))
            }),
        );
        let provider = TradestieProvider::new(serve(app).await).unwrap();

        let err = provider
            .fetch(&crate::time::derive_key(None))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidSentiment(ref v) if v.0 == "Neutral"));
    }

    #[tokio::test]
    async fn malformed_body_is_decode_error() {
        let app = Router::new().route(
            "/api/v1/apps/reddit",
            get(|| async { Json(json!({"error": "not an array"})) }),
        );
        let provider = TradestieProvider::new(serve(app).await).unwrap();

        let err = provider
            .fetch(&crate::time::derive_key(None))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Decode(_)));
    }

    #[tokio::test]
    async fn retries_until_success() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let app = Router::new().route(
            "/api/v1/apps/reddit",
            get(move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        return Err(StatusCode::SERVICE_UNAVAILABLE);
                    }
                    Ok(Json::<Value>(json!([
                        {"no_of_comments": 1, "Sentiment": "Bullish", "sentiment_score": 0.5, "Ticker": "IQ"}
                    ])))
                }
            }),
        );
        let provider =
            TradestieProvider::with_options(serve(app).await, Duration::from_secs(5), 2).unwrap();

        let batch = provider.fetch(&crate::time::derive_key(None)).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
