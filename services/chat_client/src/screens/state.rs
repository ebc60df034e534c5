//! services/chat_client/src/screens/state.rs
//!
//! Defines the application state shared by every screen and connection.

use crate::config::Config;
use chat_sync_core::ports::{AuthService, DocumentStore};
use chat_sync_core::session_gate::SessionGate;
use std::sync::Arc;

/// Created once at startup by the binary and handed to every handler.
/// The gate is the only holder of session state; screens read it from here.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<dyn AuthService>,
    pub store: Arc<dyn DocumentStore>,
    pub gate: Arc<SessionGate>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Starts the session gate against `auth` and bundles the collaborators.
    pub fn new(
        auth: Arc<dyn AuthService>,
        store: Arc<dyn DocumentStore>,
        config: Arc<Config>,
    ) -> Self {
        let gate = Arc::new(SessionGate::start(auth.clone()));
        Self {
            auth,
            store,
            gate,
            config,
        }
    }
}
