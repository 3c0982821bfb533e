use crate::error::InvalidSentimentValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    Bullish,
    Bearish,
}

impl Sentiment {
    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Bullish => "Bullish",
            Sentiment::Bearish => "Bearish",
        }
    }
}

impl FromStr for Sentiment {
    type Err = InvalidSentimentValue;

    // Exact, case-sensitive match on the upstream literals.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Bullish" => Ok(Sentiment::Bullish),
            "Bearish" => Ok(Sentiment::Bearish),
            other => Err(InvalidSentimentValue(other.to_string())),
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sentiment of a single ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stock {
    ticker: String,
    sentiment: Sentiment,
    sentiment_score: f32,
}

impl Stock {
    pub fn new(ticker: impl Into<String>, sentiment: Sentiment, sentiment_score: f32) -> Self {
        Self {
            ticker: ticker.into(),
            sentiment,
            sentiment_score,
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn sentiment(&self) -> Sentiment {
        self.sentiment
    }

    pub fn sentiment_score(&self) -> f32 {
        self.sentiment_score
    }
}

impl fmt::Display for Stock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} {:.3}",
            self.ticker, self.sentiment, self.sentiment_score
        )
    }
}

/// All stocks returned for one request key, in upstream order.
///
/// The items live behind an `Arc<[Stock]>`: cloning a batch shares the same
/// immutable slice, so a cached batch can be handed to any number of callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockBatch {
    items: Arc<[Stock]>,
}

impl StockBatch {
    pub fn new(items: Vec<Stock>) -> Self {
        Self {
            items: items.into(),
        }
    }

    pub fn items(&self) -> &[Stock] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Stock> {
        self.items.iter()
    }
}

impl Default for StockBatch {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl FromIterator<Stock> for StockBatch {
    fn from_iter<I: IntoIterator<Item = Stock>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a StockBatch {
    type Item = &'a Stock;
    type IntoIter = std::slice::Iter<'a, Stock>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Parameters of a sentiment request. `date` is expected as `YYYY-MM-DD`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestParams {
    pub date: Option<String>,
}

impl RequestParams {
    pub fn today() -> Self {
        Self { date: None }
    }

    pub fn for_date(date: impl Into<String>) -> Self {
        Self {
            date: Some(date.into()),
        }
    }
}
