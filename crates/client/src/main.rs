use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use sentiment_core::domain::StockBatch;
use sentiment_core::time::request_key::KEY_DATE_FORMAT;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Requests the same day's sentiment several times. Every request after the
/// first should be answered from the server cache, which shows in the timing.
#[derive(Debug, Parser)]
#[command(name = "sentiment_client")]
struct Args {
    /// Base URL of the sentiment server.
    #[arg(long, default_value = "http://127.0.0.1:8100")]
    server: String,

    /// Market date (YYYY-MM-DD). Defaults to the server's current date.
    #[arg(long)]
    date: Option<String>,

    /// Number of identical requests to send.
    #[arg(long, default_value_t = 2)]
    repeat: u32,

    /// Pause between requests, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let date = resolve_date(args.date.as_deref())?;

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .context("failed to build http client")?;

    for attempt in 1..=args.repeat {
        tracing::info!(attempt, server = %args.server, ?date, "request started");
        let started = Instant::now();
        let batch = fetch_batch(&http, &args.server, date).await?;
        tracing::info!(
            attempt,
            items = batch.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "received sentiment batch"
        );

        for stock in &batch {
            println!("{stock}");
        }

        if attempt < args.repeat {
            tokio::time::sleep(Duration::from_millis(args.interval_ms)).await;
        }
    }

    Ok(())
}

fn resolve_date(date_arg: Option<&str>) -> anyhow::Result<Option<NaiveDate>> {
    date_arg
        .map(|s| {
            NaiveDate::parse_from_str(s, KEY_DATE_FORMAT)
                .with_context(|| format!("--date must be YYYY-MM-DD (got {s})"))
        })
        .transpose()
}

fn endpoint(server: &str) -> String {
    format!("{}/sentiments", server.trim_end_matches('/'))
}

async fn fetch_batch(
    http: &reqwest::Client,
    server: &str,
    date: Option<NaiveDate>,
) -> anyhow::Result<StockBatch> {
    let mut req = http.get(endpoint(server));
    if let Some(date) = date {
        req = req.query(&[("date", date.format(KEY_DATE_FORMAT).to_string())]);
    }

    let res = req.send().await.context("sentiment request failed")?;
    let status = res.status();
    let text = res
        .text()
        .await
        .context("failed to read sentiment response")?;

    if !status.is_success() {
        let message = serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
            .unwrap_or(text);
        anyhow::bail!("sentiment server HTTP {status}: {message}");
    }

    serde_json::from_str::<StockBatch>(&text)
        .with_context(|| format!("sentiment response is not a stock batch: {text}"))
}
