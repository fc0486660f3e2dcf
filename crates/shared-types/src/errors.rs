//! Common error types used across all Pulse crates
//! Provides consistent error handling and reporting

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Base error type for all Pulse operations
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum PulseError {
    // Network errors
    #[error("Network request failed: {message}")]
    Network { message: String },

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Request timeout: {message}")]
    Timeout { message: String, duration_ms: u64 },

    // Data-related errors
    #[error("Data parse error: {message}")]
    DataParse {
        message: String,
        line: Option<usize>,
    },

    #[error("Malformed sample: {message}")]
    MalformedSample { message: String },

    #[error("Degenerate metadata: {message}")]
    DegenerateMetadata { message: String },

    // Channel errors
    #[error("Channel closed: {message}")]
    ChannelClosed { message: String },

    // Configuration errors
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        message: String,
        field: Option<String>,
    },
}

/// Result type alias for Pulse operations
pub type PulseResult<T> = Result<T, PulseError>;

impl PulseError {
    pub fn network(message: impl Into<String>) -> Self {
        PulseError::Network {
            message: message.into(),
        }
    }

    pub fn channel_closed(message: impl Into<String>) -> Self {
        PulseError::ChannelClosed {
            message: message.into(),
        }
    }

    pub fn invalid_config(field: &str, message: impl Into<String>) -> Self {
        PulseError::InvalidConfig {
            message: message.into(),
            field: Some(field.to_string()),
        }
    }

    /// Whether retrying the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PulseError::Network { .. }
                | PulseError::Timeout { .. }
                | PulseError::ChannelClosed { .. }
                | PulseError::HttpStatus { status: 500..=599, .. }
        )
    }
}

impl From<serde_json::Error> for PulseError {
    fn from(err: serde_json::Error) -> Self {
        PulseError::DataParse {
            message: err.to_string(),
            line: Some(err.line()),
        }
    }
}
