use chrono::NaiveDate;
use thiserror::Error;

/// Failures at the market data boundary.
#[derive(Debug, Error)]
pub enum MarketDataError {
    /// Transport-level failure (connect, timeout, body read)
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status without a provider error body
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    /// The provider answered with an explicit error object
    #[error("{code}: {description}")]
    Provider { code: String, description: String },

    /// Payload did not have the expected chart shape
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Bars not strictly ascending by date
    #[error("bars out of order at {0}")]
    Unordered(NaiveDate),
}

/// Failures inside the return calculation.
#[derive(Debug, Error, PartialEq)]
pub enum ReturnError {
    #[error("price series is empty")]
    EmptySeries,

    /// Previous close of exactly zero makes the percentage change undefined
    #[error("previous close is zero before {0}, daily change is undefined")]
    ZeroClose(NaiveDate),

    #[error("close on {0} is not a finite number")]
    NonFiniteClose(NaiveDate),

    /// Compounded product drifted from last/first close ratio
    #[error("compounded value {compounded:.6} does not match close ratio value {expected:.6}")]
    IdentityMismatch { compounded: f64, expected: f64 },
}

/// Invalid user or file configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("investment amount must be at least 0.01, got {0}")]
    InvalidAmount(String),

    #[error("no candidate tickers configured")]
    NoCandidates,

    #[error("cannot read ticker file {path}: {source}")]
    TickerFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
