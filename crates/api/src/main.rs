use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sentiment_core::cache::TtlCache;
use sentiment_core::config::{
    ServerConfig, Settings, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_TTL_MINUTES,
};
use sentiment_core::domain::{RequestParams, StockBatch};
use sentiment_core::ingest::{FixtureProvider, SentimentProvider, TradestieProvider};
use sentiment_core::service::SentimentService;

const MIN_SWEEP_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Parser)]
#[command(name = "sentiment_api")]
struct Args {
    /// The address of this server.
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// The port of this server.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// The TTL for client request caching, in minutes.
    #[arg(long, default_value_t = DEFAULT_TTL_MINUTES)]
    ttl: u64,

    /// Serve sentiment from a JSON fixture instead of the upstream API.
    #[arg(long)]
    fixture: Option<PathBuf>,

    /// Upper bound on the number of cached days.
    #[arg(long)]
    max_entries: Option<usize>,
}

impl Args {
    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            ttl_minutes: self.ttl,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    let config = args.server_config();

    tracing::info!(
        host = %config.host,
        port = config.port,
        ttl_minutes = config.ttl_minutes,
        "starting server"
    );

    let provider: Arc<dyn SentimentProvider> = match &args.fixture {
        Some(path) => Arc::new(FixtureProvider::from_path(path)?),
        None => Arc::new(TradestieProvider::from_settings(&settings)?),
    };

    let mut cache = TtlCache::new(config.ttl());
    if let Some(max_entries) = args.max_entries {
        cache = cache.with_max_entries(max_entries);
    }
    let service = Arc::new(SentimentService::with_cache(cache, provider));
    let _sweeper = service.start_sweeper(config.ttl().max(MIN_SWEEP_PERIOD));

    tracing::info!(provider = service.provider_name(), "sentiment provider ready");

    let app = app(AppState { service });

    let addr = config.bind_addr().await?;
    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/sentiments", get(get_stock_sentiments))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Clone)]
struct AppState {
    service: Arc<SentimentService>,
}

#[derive(Debug, Deserialize)]
struct SentimentQuery {
    date: Option<String>,
}

/// Failure returned to clients: a message, never the provider cause.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

async fn get_stock_sentiments(
    State(state): State<AppState>,
    Query(query): Query<SentimentQuery>,
) -> Result<Json<StockBatch>, ApiError> {
    // `?date=` counts as no date.
    let params = RequestParams {
        date: query.date.filter(|d| !d.trim().is_empty()),
    };

    match state.service.get_stock_sentiments(&params).await {
        Ok(batch) => Ok(Json(batch)),
        Err(err) => {
            let message = err.to_string();
            sentry_anyhow::capture_anyhow(&anyhow::Error::new(err));
            Err(ApiError {
                status: StatusCode::SERVICE_UNAVAILABLE,
                message,
            })
        }
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
