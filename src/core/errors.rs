//! Custom error types for translation operations

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Translation-related errors
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Authentication endpoint rejected the subscription key
    #[error("Authentication failed: {status} - {message}")]
    AuthenticationError {
        status: u16,
        message: String,
    },

    /// Language code not in the engine's table
    #[error("Unsupported language code '{code}' for {engine}")]
    UnsupportedLanguage {
        code: String,
        engine: String,
    },

    /// Credential used after its expiry
    #[error("Access token expired at {expired_at}")]
    CredentialExpired {
        expired_at: DateTime<Utc>,
    },

    /// Translation API request failed
    #[error("API error: {status} - {message}")]
    ApiError {
        status: u16,
        message: String,
    },

    /// Network error
    #[error("Network error: {message}")]
    NetworkError {
        message: String,
    },

    /// Invalid response from API
    #[error("Invalid response: {message}")]
    InvalidResponseError {
        message: String,
    },

    /// Engine name outside the supported set
    #[error("Unknown engine: {name} (expected one of: google, microsoft)")]
    UnknownEngine {
        name: String,
    },

    /// No key passed and none configured
    #[error("Missing API key for {engine}; set {env_var} or pass a key explicitly")]
    MissingApiKey {
        engine: String,
        env_var: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
    },

    /// Distributed worker failed or broke protocol
    #[error("Worker error: {message}")]
    WorkerError {
        message: String,
    },

    /// Wrapper for anyhow errors
    #[error("Internal error: {0}")]
    InternalError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Reqwest error, stored without its request URL
    #[error("HTTP client error: {0}")]
    HttpError(reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

impl TranslationError {
    /// Transport failure. The URL is dropped since it can carry an API key.
    pub fn network(err: reqwest::Error) -> Self {
        TranslationError::NetworkError {
            message: err.without_url().to_string(),
        }
    }

    /// Unreadable response body, without the request URL
    pub fn invalid_response(err: reqwest::Error) -> Self {
        TranslationError::InvalidResponseError {
            message: err.without_url().to_string(),
        }
    }
}

impl From<reqwest::Error> for TranslationError {
    fn from(err: reqwest::Error) -> Self {
        TranslationError::HttpError(err.without_url())
    }
}

impl From<anyhow::Error> for TranslationError {
    fn from(err: anyhow::Error) -> Self {
        TranslationError::InternalError(err.to_string())
    }
}

/// Result type for translation operations
pub type Result<T> = std::result::Result<T, TranslationError>;
