//! Error types for the news aggregation core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NewsError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("API error: {code} - {message}")]
    ApiError {
        code: String,
        message: String,
    },

    #[error("Circuit breaker open for source: {0}")]
    CircuitBreakerOpen(String),

    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Every selected source failed")]
    AllSourcesFailed,
}

pub type Result<T> = std::result::Result<T, NewsError>;
