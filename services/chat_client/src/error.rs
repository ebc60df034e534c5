//! services/chat_client/src/error.rs
//!
//! Defines the primary error type for the chat client service.

use crate::config::ConfigError;

/// The primary error type for the `chat_client` service.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
