use crate::domain::contract::RawStock;
use serde::{Deserialize, Serialize};

/// One entry of the Tradestie r/wallstreetbets endpoint.
///
/// Example: `https://tradestie.com/api/v1/apps/reddit?date=2022-06-11`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradestieStock {
    pub no_of_comments: i64,
    #[serde(rename = "Sentiment")]
    pub sentiment: String,
    pub sentiment_score: f32,
    #[serde(rename = "Ticker")]
    pub ticker: String,
}

impl From<TradestieStock> for RawStock {
    fn from(s: TradestieStock) -> Self {
        RawStock {
            ticker: s.ticker,
            sentiment: s.sentiment,
            sentiment_score: s.sentiment_score,
        }
    }
}
