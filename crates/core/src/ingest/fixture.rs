use crate::domain::contract::{batch_from_raw, RawStock};
use crate::domain::sentiment::StockBatch;
use crate::error::ProviderError;
use crate::ingest::provider::SentimentProvider;
use crate::time::RequestKey;
use anyhow::Context;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// In-process provider serving a fixed batch, for tests and offline runs.
#[derive(Debug, Default)]
pub struct FixtureProvider {
    data: RwLock<StockBatch>,
    blocked: AtomicBool,
    fetch_count: AtomicUsize,
    latency: Option<Duration>,
    fetch_budget: Option<Duration>,
}

impl FixtureProvider {
    pub fn new(batch: StockBatch) -> Self {
        Self {
            data: RwLock::new(batch),
            ..Self::default()
        }
    }

    /// Parses a JSON array of `{ticker, sentiment, sentiment_score}` records.
    pub fn from_json(json: &str) -> Result<Self, ProviderError> {
        let records: Vec<RawStock> = serde_json::from_str(json)?;
        Ok(Self::new(batch_from_raw(records)?))
    }

    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read fixture {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("invalid fixture {}", path.display()))
    }

    /// Delays every fetch by `latency` before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Reports `budget` as the provider's fetch budget, as a configured
    /// network provider would.
    pub fn with_fetch_budget(mut self, budget: Duration) -> Self {
        self.fetch_budget = Some(budget);
        self
    }

    /// While blocked, every fetch fails as if the upstream were unreachable.
    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    pub async fn set_data(&self, batch: StockBatch) {
        *self.data.write().await = batch;
    }
}

#[async_trait::async_trait]
impl SentimentProvider for FixtureProvider {
    fn provider_name(&self) -> &'static str {
        "fixture"
    }

    fn fetch_budget(&self) -> Option<Duration> {
        self.fetch_budget
    }

    async fn fetch(&self, _key: &RequestKey) -> Result<StockBatch, ProviderError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.blocked.load(Ordering::SeqCst) {
            return Err(ProviderError::Unavailable(
                "couldn't access data provider".to_string(),
            ));
        }
        Ok(self.data.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sentiment::{Sentiment, Stock};
    use crate::time::derive_key;

    #[tokio::test]
    async fn serves_parsed_fixture_and_counts_calls() {
        let provider = FixtureProvider::from_json(
            r#"[
                {"sentiment":"Bullish","sentiment_score":0.13,"ticker":"GME"},
                {"sentiment":"Bearish","sentiment_score":-0.227,"ticker":"EV"}
            ]"#,
        )
        .unwrap();

        let batch = provider.fetch(&derive_key(None)).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.items()[1], Stock::new("EV", Sentiment::Bearish, -0.227));
        assert_eq!(provider.fetch_count(), 1);
    }

    #[test]
    fn malformed_fixture_is_an_error_not_a_panic() {
        assert!(matches!(
            FixtureProvider::from_json("[{\"ticker\": 1}]"),
            Err(ProviderError::Decode(_))
        ));
        assert!(matches!(
            FixtureProvider::from_json(
                r#"[{"sentiment":"Sideways","sentiment_score":0.0,"ticker":"X"}]"#
            ),
            Err(ProviderError::InvalidSentiment(_))
        ));
    }

    #[test]
    fn missing_fixture_file_is_an_error() {
        let err = FixtureProvider::from_path("/definitely/not/here.json").unwrap_err();
        assert!(format!("{err:#}").contains("failed to read fixture"));
    }

    #[tokio::test]
    async fn blocked_provider_fails_but_still_counts() {
        let provider = FixtureProvider::new(StockBatch::default());
        provider.set_blocked(true);

        let err = provider.fetch(&derive_key(None)).await.unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable(_)));
        assert_eq!(provider.fetch_count(), 1);

        provider.set_blocked(false);
        assert!(provider.fetch(&derive_key(None)).await.is_ok());
    }

    #[tokio::test]
    async fn set_data_replaces_served_batch() {
        let provider = FixtureProvider::new(StockBatch::default());
        provider
            .set_data(StockBatch::new(vec![Stock::new("UK", Sentiment::Bullish, 0.026)]))
            .await;

        let batch = provider.fetch(&derive_key(None)).await.unwrap();
        assert_eq!(batch.items()[0].ticker(), "UK");
    }
}
