pub mod contract;
pub mod sentiment;

pub use sentiment::{RequestParams, Sentiment, Stock, StockBatch};
