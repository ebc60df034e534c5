//! Hand-driven fakes of the ports, shared by the unit tests of this crate.

use crate::domain::{Identity, Message};
use crate::ports::{
    AuthHandler, AuthService, DocumentStore, Fields, OrderDirection, PortError, PortResult,
    SnapshotHandler, StoredDocument, Subscription, WriteMode,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// An auth service that only notifies when a test tells it to.
#[derive(Default)]
pub struct FakeAuth {
    handlers: Mutex<Vec<(CancellationToken, AuthHandler)>>,
    pub fail_sign_out: AtomicBool,
}

impl FakeAuth {
    /// Delivers a notification to every live handler; returns how many ran.
    pub fn notify(&self, identity: Option<Identity>) -> usize {
        let live: Vec<AuthHandler> = self
            .handlers
            .lock()
            .unwrap()
            .iter()
            .filter(|(token, _)| !token.is_cancelled())
            .map(|(_, handler)| handler.clone())
            .collect();
        for handler in &live {
            handler(identity.clone());
        }
        live.len()
    }

    pub fn live_handlers(&self) -> usize {
        self.handlers
            .lock()
            .unwrap()
            .iter()
            .filter(|(token, _)| !token.is_cancelled())
            .count()
    }
}

#[async_trait]
impl AuthService for FakeAuth {
    fn on_auth_change(&self, handler: AuthHandler) -> Subscription {
        let (subscription, token) = Subscription::new();
        self.handlers.lock().unwrap().push((token, handler));
        subscription
    }

    async fn sign_in(&self, email: &str, _password: &str) -> PortResult<Identity> {
        Ok(Identity::new(email))
    }

    async fn sign_up(&self, email: &str, _password: &str) -> PortResult<Identity> {
        Ok(Identity::new(email))
    }

    async fn sign_out(&self) -> PortResult<()> {
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("network unreachable".to_string()));
        }
        self.notify(None);
        Ok(())
    }
}

struct Listener {
    collection: String,
    token: CancellationToken,
    handler: SnapshotHandler,
}

/// A store that records writes and delivers snapshots only on demand.
#[derive(Default)]
pub struct RecordingStore {
    listeners: Mutex<Vec<Listener>>,
    pub added: Mutex<Vec<(String, Fields)>>,
    pub set: Mutex<Vec<(String, String, Fields, WriteMode)>>,
    pub fail_writes: AtomicBool,
}

impl RecordingStore {
    /// Delivers to live listeners of `collection`; returns how many ran.
    pub fn deliver(&self, collection: &str, snapshot: PortResult<Vec<StoredDocument>>) -> usize {
        let live: Vec<SnapshotHandler> = self
            .listeners
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.collection == collection && !l.token.is_cancelled())
            .map(|l| l.handler.clone())
            .collect();
        let count = live.len();
        let mut snapshot = Some(snapshot);
        for (i, handler) in live.iter().enumerate() {
            let next = if i + 1 == count {
                snapshot.take().unwrap()
            } else {
                clone_result(snapshot.as_ref().unwrap())
            };
            handler(next);
        }
        count
    }

    /// Delivers to every listener ever registered, cancelled or not, the way a
    /// late, at-least-once delivery would.
    pub fn deliver_late(&self, collection: &str, docs: Vec<StoredDocument>) -> usize {
        let all: Vec<SnapshotHandler> = self
            .listeners
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.collection == collection)
            .map(|l| l.handler.clone())
            .collect();
        for handler in &all {
            handler(Ok(docs.clone()));
        }
        all.len()
    }

    pub fn live_listeners(&self) -> usize {
        self.listeners
            .lock()
            .unwrap()
            .iter()
            .filter(|l| !l.token.is_cancelled())
            .count()
    }
}

fn clone_result(result: &PortResult<Vec<StoredDocument>>) -> PortResult<Vec<StoredDocument>> {
    match result {
        Ok(docs) => Ok(docs.clone()),
        Err(e) => Err(PortError::Unexpected(e.to_string())),
    }
}

#[async_trait]
impl DocumentStore for RecordingStore {
    fn subscribe_ordered(
        &self,
        collection: &str,
        _order_field: &str,
        _direction: OrderDirection,
        handler: SnapshotHandler,
    ) -> Subscription {
        let (subscription, token) = Subscription::new();
        self.listeners.lock().unwrap().push(Listener {
            collection: collection.to_string(),
            token,
            handler,
        });
        subscription
    }

    async fn add_document(&self, collection: &str, fields: Fields) -> PortResult<String> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("write rejected".to_string()));
        }
        let mut added = self.added.lock().unwrap();
        added.push((collection.to_string(), fields));
        Ok(format!("doc-{}", added.len()))
    }

    async fn set_document(
        &self,
        collection: &str,
        document_id: &str,
        fields: Fields,
        mode: WriteMode,
    ) -> PortResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("write rejected".to_string()));
        }
        self.set.lock().unwrap().push((
            collection.to_string(),
            document_id.to_string(),
            fields,
            mode,
        ));
        Ok(())
    }
}

/// Wraps a message the way the store hands it back in a snapshot.
pub fn stored(message: &Message) -> StoredDocument {
    let fields = match serde_json::to_value(message).unwrap() {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    };
    StoredDocument {
        id: format!("doc-{}", message.id),
        fields,
    }
}
