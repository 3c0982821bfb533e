use crate::domain::sentiment::StockBatch;
use crate::error::ProviderError;
use crate::time::RequestKey;
use std::time::Duration;

/// Upstream source of stock sentiment.
///
/// Dropping the returned future cancels the fetch; implementations must not
/// leave shared state half-updated when that happens.
#[async_trait::async_trait]
pub trait SentimentProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Longest a single `fetch` may take, retries and backoff included.
    /// `None` leaves the deadline to the caller.
    fn fetch_budget(&self) -> Option<Duration> {
        None
    }

    async fn fetch(&self, key: &RequestKey) -> Result<StockBatch, ProviderError>;
}
