//! crates/chat_sync_core/src/domain.rs
//!
//! Defines the core data structures shared by the session gate and the
//! conversation feed. The serialized shape of `Message` is the one the chat
//! widget and the document store both speak.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The authenticated identity reported by the authentication service.
/// Opaque to the core; in practice an email-like handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(pub String);

impl Identity {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The participant who sent a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl Author {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            avatar: None,
        }
    }

    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }
}

/// One chat entry. `id` and `created_at` are assigned by the sender;
/// `created_at` is the only ordering key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "createdAt", with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    pub text: String,
    #[serde(rename = "user")]
    pub author: Author,
}

/// The authentication state machine driving screen selection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No notification has arrived yet. No screen decision is made.
    #[default]
    Initializing,
    Unauthenticated,
    Authenticated(Identity),
}

impl SessionState {
    /// Applies one authentication-change notification. Every state accepts
    /// every notification, so there is no terminal state.
    pub fn on_notification(&self, notification: Option<Identity>) -> SessionState {
        match notification {
            Some(identity) => SessionState::Authenticated(identity),
            None => SessionState::Unauthenticated,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionState::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Initializing)
    }

    /// The flat `{ identity, loading }` view of this state.
    pub fn session(&self) -> Session {
        Session {
            identity: self.identity().cloned(),
            loading: self.is_loading(),
        }
    }
}

/// The current authentication result plus the loading flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub identity: Option<Identity>,
    pub loading: bool,
}
