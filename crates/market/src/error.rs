//! Error types for market data operations.

use thiserror::Error;

/// Errors that can occur while talking to the upstream price API.
#[derive(Debug, Error)]
pub enum MarketError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("upstream returned HTTP {0}")]
    Status(u16),

    #[error("failed to parse response: {0}")]
    Parse(String),

    /// Terminal outcome after retries are exhausted. Callers must treat
    /// this as "skip the affected alerts, retry next cycle".
    #[error("market data unavailable: {0}")]
    DataUnavailable(String),
}

impl From<reqwest::Error> for MarketError {
    fn from(err: reqwest::Error) -> Self {
        MarketError::Http(err.to_string())
    }
}

impl MarketError {
    /// Returns true if this error is transient and worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            MarketError::Http(_) => true,
            // 429 and server errors tend to clear up; 4xx won't.
            MarketError::Status(code) => *code == 429 || *code >= 500,
            MarketError::Parse(_) => false,
            MarketError::DataUnavailable(_) => false,
        }
    }
}
