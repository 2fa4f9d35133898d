use std::path::PathBuf;
use thiserror::Error;

use crate::models::{ConfigError, TaxonomyError};

/// Main error type for pigen
#[derive(Error, Debug)]
pub enum PigenError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Taxonomy error: {0}")]
    Taxonomy(#[from] TaxonomyError),

    #[error("Model gateway error: {0}")]
    Gateway(#[from] SoftFailure),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No API keys configured. Add them to [gateway].api_keys in pigen.toml or set PIGEN_API_KEYS")]
    NoCredentials,

    #[error("Connection test failed: {0}")]
    ConnectionTest(String),

    #[error("Source file not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("Init error: {0}")]
    Init(String),
}

/// Retryable, non-fatal failure of a single model invocation.
///
/// Every gateway call site treats these as "no result" and falls back or
/// retries; none of them should ever abort a batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SoftFailure {
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },

    #[error("Rate limited by remote service (HTTP 429)")]
    RateLimited,

    #[error("Response contained no candidate text")]
    EmptyResponse,

    #[error("Failed to parse response body: {0}")]
    MalformedBody(String),
}

/// Malformed model output that could not be turned into a record
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Response JSON is an empty array")]
    EmptyArray,

    #[error("Response JSON is not an object")]
    NotAnObject,

    #[error("Response object has no usable 'output' field")]
    MissingOutput,
}

impl ExtractError {
    /// Corrective instruction echoed into the next generation attempt
    pub fn retry_reason(&self) -> String {
        match self {
            ExtractError::InvalidJson(_) => {
                "The response must be a single valid JSON object with the keys described above. Do not wrap it in prose.".to_string()
            }
            ExtractError::EmptyArray | ExtractError::NotAnObject => {
                "Respond with exactly one JSON object, not an array or a bare value.".to_string()
            }
            ExtractError::MissingOutput => {
                "The JSON object must contain an 'output' field holding the complete C source code.".to_string()
            }
        }
    }
}

/// Errors related to dataset snapshot files
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read snapshot {0}: {1}")]
    ReadError(PathBuf, std::io::Error),

    #[error("Failed to write snapshot {0}: {1}")]
    WriteError(PathBuf, std::io::Error),

    #[error("Failed to parse snapshot {0}: {1}")]
    ParseError(PathBuf, String),

    #[error("Failed to serialize snapshot: {0}")]
    SerializeError(String),
}

pub type Result<T> = std::result::Result<T, PigenError>;
