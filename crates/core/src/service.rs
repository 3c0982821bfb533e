use crate::cache::TtlCache;
use crate::config::ServerConfig;
use crate::domain::sentiment::{RequestParams, StockBatch};
use crate::error::{ProviderError, ServiceError};
use crate::ingest::provider::SentimentProvider;
use crate::time::{derive_key, RequestKey};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Serves stock sentiment per day, caching each day's batch for a fixed TTL.
///
/// A request whose day is cached is answered from memory without touching the
/// provider. Otherwise the provider is asked once; a successful batch is
/// stored and returned, a failure is returned without caching anything.
/// Concurrent misses on the same day are not coalesced; the last batch stored
/// wins.
pub struct SentimentService {
    cache: Arc<TtlCache<RequestKey, StockBatch>>,
    provider: Arc<dyn SentimentProvider>,
    fetch_timeout: Duration,
}

impl SentimentService {
    pub fn new(ttl: Duration, provider: Arc<dyn SentimentProvider>) -> Self {
        Self::with_cache(TtlCache::new(ttl), provider)
    }

    pub fn from_config(config: &ServerConfig, provider: Arc<dyn SentimentProvider>) -> Self {
        Self::new(config.ttl(), provider)
    }

    /// Uses a preconfigured store, e.g. one with a capacity bound.
    ///
    /// The fetch deadline is the provider's own budget when it reports one,
    /// otherwise [`DEFAULT_FETCH_TIMEOUT`].
    pub fn with_cache(
        cache: TtlCache<RequestKey, StockBatch>,
        provider: Arc<dyn SentimentProvider>,
    ) -> Self {
        let fetch_timeout = provider.fetch_budget().unwrap_or(DEFAULT_FETCH_TIMEOUT);
        Self {
            cache: Arc::new(cache),
            provider,
            fetch_timeout,
        }
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    pub fn ttl(&self) -> Duration {
        self.cache.default_ttl()
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    /// Starts background removal of expired batches.
    pub fn start_sweeper(&self, period: Duration) -> JoinHandle<()> {
        TtlCache::spawn_sweeper(&self.cache, period)
    }

    pub async fn get_stock_sentiments(
        &self,
        params: &RequestParams,
    ) -> Result<StockBatch, ServiceError> {
        let key = derive_key(params.date.as_deref());

        if let Some(batch) = self.cache.get(&key) {
            tracing::debug!(%key, items = batch.len(), "sentiment cache hit");
            return Ok(batch);
        }

        let fresh = self.pull_fresh_data(&key).await.map_err(|err| {
            tracing::warn!(
                %key,
                provider = self.provider.provider_name(),
                error = %err,
                "problem fetching latest sentiment data"
            );
            ServiceError::FetchFailed(err)
        })?;

        tracing::info!(%key, items = fresh.len(), provider = self.provider.provider_name(), "cached fresh sentiment batch");
        self.cache.set(key, fresh.clone());
        Ok(fresh)
    }

    async fn pull_fresh_data(&self, key: &RequestKey) -> Result<StockBatch, ProviderError> {
        tokio::time::timeout(self.fetch_timeout, self.provider.fetch(key))
            .await
            .map_err(|_| ProviderError::Timeout(self.fetch_timeout))?
    }
}

impl std::fmt::Debug for SentimentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentimentService")
            .field("provider", &self.provider.provider_name())
            .field("ttl", &self.cache.default_ttl())
            .field("fetch_timeout", &self.fetch_timeout)
            .field("cached_entries", &self.cache.len())
            .finish()
    }
}
