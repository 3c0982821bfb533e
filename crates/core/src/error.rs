use std::time::Duration;

/// A sentiment literal that is neither `Bullish` nor `Bearish`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("encountered incorrect grammar for sentiment field {0:?}; needs to be either 'Bullish' or 'Bearish'")]
pub struct InvalidSentimentValue(pub String);

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("data provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("data provider HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("provider response is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    InvalidSentiment(#[from] InvalidSentimentValue),

    #[error("data provider did not answer within {0:?}")]
    Timeout(Duration),

    #[error("data provider unavailable: {0}")]
    Unavailable(String),
}

/// Caller-facing failure of the sentiment service.
///
/// The provider cause is kept as the error source for logs, but the message
/// shown to callers is always the same.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("problem fetching latest sentiment data")]
    FetchFailed(#[source] ProviderError),
}
