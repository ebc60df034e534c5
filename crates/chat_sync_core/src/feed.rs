//! crates/chat_sync_core/src/feed.rs
//!
//! The live message feed of one conversation.
//!
//! Every snapshot delivered by the store replaces the visible list wholesale.
//! Sends prepend optimistically and persist in the background; the next
//! snapshot that contains the sent message supersedes the optimistic copy.

use crate::domain::Message;
use crate::ports::{
    DocumentStore, OrderDirection, PortResult, SnapshotHandler, StoredDocument, Subscription,
    WriteMode,
};
use crate::room::ConversationKey;
use std::collections::BTreeSet;
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// The field messages are ordered by in the store.
pub const ORDER_FIELD: &str = "createdAt";

/// Client-local view of a conversation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageFeedState {
    /// Newest first.
    pub items: Vec<Message>,
    /// Ids of optimistic messages whose durable write failed.
    pub unconfirmed: BTreeSet<String>,
    /// Number of snapshots applied so far.
    pub revision: u64,
}

impl MessageFeedState {
    fn apply_snapshot(&mut self, items: Vec<Message>) {
        self.unconfirmed
            .retain(|id| !items.iter().any(|message| &message.id == id));
        self.items = items;
        self.revision += 1;
    }
}

pub struct ConversationFeed {
    key: ConversationKey,
    collection: String,
    store: Arc<dyn DocumentStore>,
    state: Arc<watch::Sender<MessageFeedState>>,
    subscription: Subscription,
}

impl ConversationFeed {
    /// Subscribes to the conversation's messages, newest first.
    pub fn subscribe(store: Arc<dyn DocumentStore>, key: ConversationKey, root: &str) -> Self {
        let collection = key.messages_collection(root);
        let (sender, _) = watch::channel(MessageFeedState::default());
        let state = Arc::new(sender);

        // Weak: a delivery after teardown finds nothing to mutate.
        let weak: Weak<watch::Sender<MessageFeedState>> = Arc::downgrade(&state);
        let handler_key = key.clone();
        let handler: SnapshotHandler = Arc::new(move |snapshot: PortResult<Vec<StoredDocument>>| {
            let Some(state) = weak.upgrade() else {
                return;
            };
            apply_delivery(&handler_key, &state, snapshot);
        });

        info!("Subscribing to conversation {}", key);
        let subscription =
            store.subscribe_ordered(&collection, ORDER_FIELD, OrderDirection::Descending, handler);

        Self {
            key,
            collection,
            store,
            state,
            subscription,
        }
    }

    pub fn key(&self) -> &ConversationKey {
        &self.key
    }

    /// The visible list, newest first.
    pub fn items(&self) -> Vec<Message> {
        self.state.borrow().items.clone()
    }

    pub fn state(&self) -> MessageFeedState {
        self.state.borrow().clone()
    }

    /// A receiver that wakes on every change of the visible list.
    pub fn watch(&self) -> watch::Receiver<MessageFeedState> {
        self.state.subscribe()
    }

    /// Shows `message` immediately and persists it in the background.
    ///
    /// The write is keyed by the message id, so resending an id overwrites the
    /// stored copy instead of adding a second one, and the list never shows an
    /// id twice.
    ///
    /// Must be called from within a tokio runtime. The returned handle
    /// completes once the durable write has been attempted; callers are not
    /// expected to wait on it.
    pub fn send(&self, message: Message) -> JoinHandle<()> {
        self.state.send_if_modified(|state| {
            if state.items.iter().any(|item| item.id == message.id) {
                return false;
            }
            state.items.insert(0, message.clone());
            true
        });

        let store = Arc::clone(&self.store);
        let collection = self.collection.clone();
        let weak = Arc::downgrade(&self.state);
        tokio::spawn(async move {
            let fields = match serde_json::to_value(&message) {
                Ok(serde_json::Value::Object(fields)) => fields,
                Ok(_) | Err(_) => {
                    error!("Message {} could not be encoded for the store.", message.id);
                    mark_unconfirmed(&weak, &message.id);
                    return;
                }
            };
            if let Err(e) = store
                .set_document(&collection, &message.id, fields, WriteMode::Replace)
                .await
            {
                error!("Failed to persist message {} to {}: {}", message.id, collection, e);
                mark_unconfirmed(&weak, &message.id);
            }
        })
    }

    /// Cancels the live subscription. No further delivery reaches this feed.
    pub fn unsubscribe(self) {
        info!("Unsubscribing from conversation {}", self.key);
        self.subscription.cancel();
    }
}

fn apply_delivery(
    key: &ConversationKey,
    state: &watch::Sender<MessageFeedState>,
    snapshot: PortResult<Vec<StoredDocument>>,
) {
    match snapshot {
        Ok(documents) => {
            let items = documents
                .into_iter()
                .filter_map(|document| decode(key, document))
                .collect();
            state.send_modify(|state| state.apply_snapshot(items));
        }
        Err(e) => {
            // Keep the last known list rather than flashing an empty conversation.
            warn!("Snapshot delivery failed for conversation {}: {}", key, e);
        }
    }
}

fn decode(key: &ConversationKey, document: StoredDocument) -> Option<Message> {
    match serde_json::from_value(serde_json::Value::Object(document.fields)) {
        Ok(message) => Some(message),
        Err(e) => {
            warn!(
                "Skipping undecodable document {} in conversation {}: {}",
                document.id, key, e
            );
            None
        }
    }
}

fn mark_unconfirmed(state: &Weak<watch::Sender<MessageFeedState>>, id: &str) {
    if let Some(state) = state.upgrade() {
        state.send_modify(|state| {
            state.unconfirmed.insert(id.to_string());
        });
    }
}
