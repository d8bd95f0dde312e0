// Core structs: Listing, plus per-component error types
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One scraped car listing. `price` and `benefit` are decimal digit
/// strings; "0" or the empty string means "unknown".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    pub model: String,
    pub price: String,
    #[serde(default)]
    pub benefit: String,
    pub link: String,
}

/// Raw card fields as produced by an extraction strategy, before id
/// derivation and brand cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCard {
    pub id: Option<String>,
    pub model: String,
    pub price: String,
    pub benefit: String,
    pub link: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected response status {0}")]
    Status(reqwest::StatusCode),
}

impl FetchError {
    /// Network-level failures and 5xx responses are worth another attempt;
    /// a 4xx will not get better by retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Http(_) => true,
            FetchError::Status(code) => code.is_server_error(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("bad selector or expression: {0}")]
    BadSelector(String),
    #[error("page did not match the extraction regex")]
    RegexMismatch,
    #[error("embedded JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no value at key path {0}")]
    MissingPath(String),
    #[error("missing field {0}")]
    MissingField(&'static str),
    #[error("no items found on the page")]
    NoItems,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv parse error: {0}")]
    Csv(#[from] csv::Error),
    #[error("csv key column {0} not found")]
    MissingKeyColumn(String),
}

#[derive(Debug, Error)]
pub enum EditError {
    #[error("unknown site or file name: {0}")]
    InvalidName(String),
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("file is read-only: {0}")]
    ReadOnly(String),
    #[error("no value at path {0}")]
    BadPath(String),
    #[error("cannot assign a scalar to a {0} node")]
    NotScalar(&'static str),
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
