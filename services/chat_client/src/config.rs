//! services/chat_client/src/config.rs
//!
//! Defines the client's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use axum::http::HeaderValue;
use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    /// Root collection under which each conversation keeps its messages.
    pub chats_collection: String,
    /// Collection of per-participant conversation membership records.
    pub membership_collection: String,
    pub default_avatar_url: String,
    pub widget_origin: HeaderValue,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        // --- Bridge Settings ---
        let bind_address_str = var_or("BIND_ADDRESS", "127.0.0.1:3000");
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let widget_origin_str = var_or("WIDGET_ORIGIN", "http://localhost:19006");
        let widget_origin = widget_origin_str.parse::<HeaderValue>().map_err(|e| {
            ConfigError::InvalidValue("WIDGET_ORIGIN".to_string(), e.to_string())
        })?;

        // --- Store Layout ---
        let chats_collection = non_empty("CHATS_COLLECTION", var_or("CHATS_COLLECTION", "chats"))?;
        let membership_collection = non_empty(
            "MEMBERSHIP_COLLECTION",
            var_or("MEMBERSHIP_COLLECTION", "userChatrooms"),
        )?;

        let default_avatar_url = var_or("DEFAULT_AVATAR_URL", "https://i.pravatar.cc/300");

        Ok(Self {
            bind_address,
            log_level,
            chats_collection,
            membership_collection,
            default_avatar_url,
            widget_origin,
        })
    }
}

fn non_empty(name: &str, value: String) -> Result<String, ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::InvalidValue(
            name.to_string(),
            "must not be empty".to_string(),
        ));
    }
    Ok(value)
}
