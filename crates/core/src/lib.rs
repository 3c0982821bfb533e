pub mod cache;
pub mod domain;
pub mod error;
pub mod ingest;
pub mod service;
pub mod time;

pub mod config {
    use anyhow::Context;
    use std::time::Duration;

    pub const DEFAULT_HOST: &str = "0.0.0.0";
    pub const DEFAULT_PORT: u16 = 8100;
    pub const DEFAULT_TTL_MINUTES: u64 = 15;

    /// Process configuration read once at startup and handed to the service.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ServerConfig {
        pub host: String,
        pub port: u16,
        pub ttl_minutes: u64,
    }

    impl Default for ServerConfig {
        fn default() -> Self {
            Self {
                host: DEFAULT_HOST.to_string(),
                port: DEFAULT_PORT,
                ttl_minutes: DEFAULT_TTL_MINUTES,
            }
        }
    }

    impl ServerConfig {
        pub fn ttl(&self) -> Duration {
            Duration::from_secs(self.ttl_minutes.saturating_mul(60))
        }

        /// Resolves `host` (IP literal or hostname) to the first bindable address.
        pub async fn bind_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
            tokio::net::lookup_host((self.host.as_str(), self.port))
                .await
                .with_context(|| format!("failed to resolve bind host: {}", self.host))?
                .next()
                .with_context(|| format!("bind host resolved to no address: {}", self.host))
        }
    }

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub sentry_dsn: Option<String>,
        pub provider_url: Option<String>,
        pub provider_timeout_secs: Option<u64>,
        pub provider_retries: Option<u32>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                provider_url: std::env::var("SENTIMENT_PROVIDER_URL")
                    .ok()
                    .filter(|s| !s.trim().is_empty()),
                provider_timeout_secs: parse_env("SENTIMENT_PROVIDER_TIMEOUT_SECS")?,
                provider_retries: parse_env("SENTIMENT_PROVIDER_RETRIES")?,
            })
        }
    }

    fn parse_env<T>(name: &str) -> anyhow::Result<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match std::env::var(name) {
            Ok(raw) if !raw.trim().is_empty() => raw
                .trim()
                .parse::<T>()
                .map(Some)
                .with_context(|| format!("{name} is not a valid value: {raw}")),
            _ => Ok(None),
        }
    }

}
