use crate::domain::sentiment::{Stock, StockBatch};
use crate::error::InvalidSentimentValue;
use serde::{Deserialize, Serialize};

/// An unvalidated stock record as it arrives from a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawStock {
    #[serde(alias = "Ticker")]
    pub ticker: String,
    #[serde(alias = "Sentiment")]
    pub sentiment: String,
    #[serde(alias = "SentimentScore")]
    pub sentiment_score: f32,
}

impl RawStock {
    pub fn validate_and_into_stock(self) -> Result<Stock, InvalidSentimentValue> {
        let sentiment = self.sentiment.parse()?;
        Ok(Stock::new(self.ticker, sentiment, self.sentiment_score))
    }
}

/// Converts a provider response into a batch. A single bad sentiment literal
/// rejects the whole response.
pub fn batch_from_raw<I, R>(records: I) -> Result<StockBatch, InvalidSentimentValue>
where
    I: IntoIterator<Item = R>,
    R: Into<RawStock>,
{
    records
        .into_iter()
        .map(|r| r.into().validate_and_into_stock())
        .collect::<Result<Vec<_>, _>>()
        .map(StockBatch::new)
}
