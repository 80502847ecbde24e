use crate::config::ConfigError;
use crate::filter::FilterError;
use thiserror::Error;

/// A decoded item that does not fit the entity model
#[derive(Debug, Error)]
#[error("{entity}{} failed validation: {source}", .index.map(|i| format!(" item {i}")).unwrap_or_default())]
pub struct ValidationError {
    pub entity: String,
    /// Zero-based position in a list response
    pub index: Option<usize>,
    #[source]
    pub source: serde_json::Error,
}

/// Errors surfaced by entity manager operations
#[derive(Debug, Error)]
pub enum ODataError {
    /// Transport failure or timeout before any response arrived
    #[error("Connection to '{url}' failed: {reason}")]
    Connectivity { url: String, reason: String },

    #[error("Unexpected response status {status} {reason}: {body}")]
    Response {
        status: u16,
        reason: String,
        body: String,
    },

    #[error("Failed to decode response: {0}")]
    Decoding(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to encode request body: {0}")]
    Encoding(#[source] serde_json::Error),

    #[error("Invalid filter: {0}")]
    Usage(#[from] FilterError),

    /// Connection settings rejected before any request was sent
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ODataError {
    /// HTTP status of a response error
    pub fn status(&self) -> Option<u16> {
        match self {
            ODataError::Response { status, .. } => Some(*status),
            _ => None,
        }
    }
}
