//! crates/chat_sync_core/src/session_gate.rs
//!
//! Tracks the authentication state and publishes it to whoever selects screens.
//! The gate owns its auth-change subscription for its whole lifetime and
//! releases it on shutdown or drop.

use crate::domain::{Identity, Session, SessionState};
use crate::ports::{AuthHandler, AuthService, Subscription};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

pub struct SessionGate {
    auth: Arc<dyn AuthService>,
    state: Arc<watch::Sender<SessionState>>,
    subscription: Subscription,
}

impl SessionGate {
    /// Starts in `Initializing` and registers with the authentication service.
    pub fn start(auth: Arc<dyn AuthService>) -> Self {
        let (sender, _) = watch::channel(SessionState::Initializing);
        let state = Arc::new(sender);

        let handler_state = Arc::clone(&state);
        let handler: AuthHandler = Arc::new(move |notification: Option<Identity>| {
            handler_state.send_if_modified(|current| {
                let next = current.on_notification(notification.clone());
                if *current == next {
                    return false;
                }
                info!("Session transition: {:?} -> {:?}", current, next);
                *current = next;
                true
            });
        });
        let subscription = auth.on_auth_change(handler);

        Self {
            auth,
            state,
            subscription,
        }
    }

    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn session(&self) -> Session {
        self.state.borrow().session()
    }

    /// A receiver that wakes on every state transition.
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Asks the authentication service to end the session. Failures are logged
    /// and the state stays put until the next notification.
    pub async fn sign_out(&self) {
        if let Err(e) = self.auth.sign_out().await {
            error!("Error signing out: {}", e);
        }
    }

    /// Releases the auth-change subscription.
    pub fn shutdown(self) {
        info!("Session gate shutting down.");
        self.subscription.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeAuth;
    use std::sync::atomic::Ordering;

    fn gate() -> (Arc<FakeAuth>, SessionGate) {
        let auth = Arc::new(FakeAuth::default());
        let gate = SessionGate::start(auth.clone());
        (auth, gate)
    }

    #[test]
    fn starts_initializing_until_the_first_notification() {
        let (_auth, gate) = gate();
        assert_eq!(gate.current(), SessionState::Initializing);
        assert!(gate.session().loading);
        assert!(gate.session().identity.is_none());
    }

    #[test]
    fn absence_then_identity() {
        let (auth, gate) = gate();

        auth.notify(None);
        assert_eq!(gate.current(), SessionState::Unauthenticated);
        assert!(!gate.session().loading);

        auth.notify(Some(Identity::new("u@x.com")));
        assert_eq!(
            gate.current(),
            SessionState::Authenticated(Identity::new("u@x.com"))
        );
    }

    #[test]
    fn logout_returns_to_unauthenticated() {
        let (auth, gate) = gate();
        auth.notify(Some(Identity::new("u@x.com")));
        auth.notify(None);
        assert_eq!(gate.current(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn watchers_wake_only_on_real_transitions() {
        let (auth, gate) = gate();
        let mut rx = gate.watch();

        auth.notify(Some(Identity::new("u@x.com")));
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        auth.notify(Some(Identity::new("u@x.com")));
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn shutdown_releases_the_subscription() {
        let (auth, gate) = gate();
        assert_eq!(auth.live_handlers(), 1);
        gate.shutdown();
        assert_eq!(auth.live_handlers(), 0);
        assert_eq!(auth.notify(None), 0);
    }

    #[test]
    fn dropping_the_gate_releases_the_subscription() {
        let (auth, gate) = gate();
        drop(gate);
        assert_eq!(auth.live_handlers(), 0);
    }

    #[tokio::test]
    async fn failed_sign_out_keeps_the_session() {
        let (auth, gate) = gate();
        auth.notify(Some(Identity::new("u@x.com")));
        auth.fail_sign_out.store(true, Ordering::SeqCst);

        gate.sign_out().await;

        assert_eq!(
            gate.current(),
            SessionState::Authenticated(Identity::new("u@x.com"))
        );
    }

    #[tokio::test]
    async fn sign_out_is_observed_through_the_notification() {
        let (auth, gate) = gate();
        auth.notify(Some(Identity::new("u@x.com")));
        gate.sign_out().await;
        assert_eq!(gate.current(), SessionState::Unauthenticated);
    }
}
