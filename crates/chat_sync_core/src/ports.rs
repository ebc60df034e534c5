//! crates/chat_sync_core/src/ports.rs
//!
//! Defines the service contracts (traits) the core consumes.
//! These traits form the boundary of the hexagonal architecture, keeping the
//! session gate and the conversation feed independent of any concrete
//! authentication service or real-time document store.

use crate::domain::Identity;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::{CancellationToken, DropGuard};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., network, storage).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Invalid input: {0}")]
    Invalid(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Subscription Handle
//=========================================================================================

/// A live registration with an external notification source.
///
/// Dropping the handle (or calling [`Subscription::cancel`]) releases the
/// registration. Sources check [`Subscription::token`]'s state before every
/// delivery and must not call the handler once it is cancelled.
#[must_use = "dropping a Subscription cancels it immediately"]
pub struct Subscription {
    token: CancellationToken,
    _guard: DropGuard,
}

impl Subscription {
    /// Creates a fresh handle. The returned token stays with the source.
    pub fn new() -> (Self, CancellationToken) {
        let token = CancellationToken::new();
        let source_token = token.clone();
        let subscription = Self {
            token: token.clone(),
            _guard: token.drop_guard(),
        };
        (subscription, source_token)
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Releases the registration now rather than at drop.
    pub fn cancel(self) {
        self.token.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

//=========================================================================================
// Document Store Types
//=========================================================================================

/// The field map of a stored document.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// A document as delivered by a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub fields: Fields,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Ascending,
    Descending,
}

/// How `set_document` treats an existing document with the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Replace,
    Merge,
}

/// Receives authentication-change notifications: an identity, or `None` for absence.
pub type AuthHandler = Arc<dyn Fn(Option<Identity>) + Send + Sync>;

/// Receives the full ordered document set of a collection on every change.
pub type SnapshotHandler = Arc<dyn Fn(PortResult<Vec<StoredDocument>>) + Send + Sync>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait AuthService: Send + Sync {
    /// Registers a handler for authentication changes. The current state is
    /// delivered once on registration and again on every change.
    fn on_auth_change(&self, handler: AuthHandler) -> Subscription;

    async fn sign_in(&self, email: &str, password: &str) -> PortResult<Identity>;

    async fn sign_up(&self, email: &str, password: &str) -> PortResult<Identity>;

    async fn sign_out(&self) -> PortResult<()>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Subscribes to a collection ordered by `order_field`. The full snapshot
    /// is delivered on registration and again after every change.
    fn subscribe_ordered(
        &self,
        collection: &str,
        order_field: &str,
        direction: OrderDirection,
        handler: SnapshotHandler,
    ) -> Subscription;

    /// Adds a document with a store-assigned id and returns that id.
    async fn add_document(&self, collection: &str, fields: Fields) -> PortResult<String>;

    async fn set_document(
        &self,
        collection: &str,
        document_id: &str,
        fields: Fields,
        mode: WriteMode,
    ) -> PortResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropping_a_subscription_cancels_the_source_token() {
        let (subscription, token) = Subscription::new();
        assert!(!token.is_cancelled());
        drop(subscription);
        assert!(token.is_cancelled());
    }

    #[test]
    fn explicit_cancel_releases_immediately() {
        let (subscription, token) = Subscription::new();
        assert!(!subscription.is_cancelled());
        subscription.cancel();
        assert!(token.is_cancelled());
    }
}
