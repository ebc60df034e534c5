//! services/chat_client/src/adapters/memory_store.rs
//!
//! An in-process real-time document store implementing the `DocumentStore` port.
//! Every write re-delivers the full ordered snapshot to each live subscriber of
//! the written collection.
//!
//! Writes and their deliveries are serialized, so subscribers see snapshots in
//! write order. Handlers must not call back into the store.

use crate::adapters::lock;
use async_trait::async_trait;
use chat_sync_core::ports::{
    DocumentStore, Fields, OrderDirection, PortResult, SnapshotHandler, StoredDocument,
    Subscription, WriteMode,
};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

struct Listener {
    collection: String,
    order_field: String,
    direction: OrderDirection,
    token: CancellationToken,
    handler: SnapshotHandler,
}

#[derive(Default)]
pub struct MemoryStore {
    /// Documents per collection, in insertion order.
    collections: Mutex<HashMap<String, Vec<StoredDocument>>>,
    listeners: Mutex<Vec<Listener>>,
    /// Held from a mutation until its snapshots have been delivered.
    delivery: Mutex<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document(&self, collection: &str, document_id: &str) -> Option<StoredDocument> {
        lock(&self.collections)
            .get(collection)?
            .iter()
            .find(|document| document.id == document_id)
            .cloned()
    }

    /// Number of subscriptions that have not been cancelled.
    pub fn live_subscriptions(&self) -> usize {
        lock(&self.listeners)
            .iter()
            .filter(|listener| !listener.token.is_cancelled())
            .count()
    }

    /// The documents of `collection` that carry `order_field`, sorted by it.
    /// Ties keep insertion order.
    fn ordered(
        &self,
        collection: &str,
        order_field: &str,
        direction: OrderDirection,
    ) -> Vec<StoredDocument> {
        let mut documents: Vec<StoredDocument> = lock(&self.collections)
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|document| document.fields.contains_key(order_field))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        documents.sort_by(|a, b| {
            let ordering = compare_values(&a.fields[order_field], &b.fields[order_field]);
            match direction {
                OrderDirection::Ascending => ordering,
                OrderDirection::Descending => ordering.reverse(),
            }
        });
        documents
    }

    fn notify(&self, collection: &str) {
        let live: Vec<(SnapshotHandler, String, OrderDirection)> = {
            let mut listeners = lock(&self.listeners);
            listeners.retain(|listener| !listener.token.is_cancelled());
            listeners
                .iter()
                .filter(|listener| listener.collection == collection)
                .map(|listener| {
                    (
                        listener.handler.clone(),
                        listener.order_field.clone(),
                        listener.direction,
                    )
                })
                .collect()
        };

        debug!("Delivering {} snapshot(s) for {}", live.len(), collection);
        for (handler, order_field, direction) in live {
            handler(Ok(self.ordered(collection, &order_field, direction)));
        }
    }
}

/// Orders values of mixed types: null, booleans, numbers, strings, then the rest.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

//=========================================================================================
// `DocumentStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl DocumentStore for MemoryStore {
    fn subscribe_ordered(
        &self,
        collection: &str,
        order_field: &str,
        direction: OrderDirection,
        handler: SnapshotHandler,
    ) -> Subscription {
        let _delivery = lock(&self.delivery);
        let (subscription, token) = Subscription::new();
        lock(&self.listeners).push(Listener {
            collection: collection.to_string(),
            order_field: order_field.to_string(),
            direction,
            token,
            handler: handler.clone(),
        });
        handler(Ok(self.ordered(collection, order_field, direction)));
        subscription
    }

    async fn add_document(&self, collection: &str, fields: Fields) -> PortResult<String> {
        let id = Uuid::new_v4().to_string();
        let _delivery = lock(&self.delivery);
        lock(&self.collections)
            .entry(collection.to_string())
            .or_default()
            .push(StoredDocument {
                id: id.clone(),
                fields,
            });
        self.notify(collection);
        Ok(id)
    }

    async fn set_document(
        &self,
        collection: &str,
        document_id: &str,
        fields: Fields,
        mode: WriteMode,
    ) -> PortResult<()> {
        let _delivery = lock(&self.delivery);
        {
            let mut collections = lock(&self.collections);
            let documents = collections.entry(collection.to_string()).or_default();
            match documents.iter_mut().find(|document| document.id == document_id) {
                Some(existing) => match mode {
                    WriteMode::Replace => existing.fields = fields,
                    WriteMode::Merge => existing.fields.extend(fields),
                },
                None => documents.push(StoredDocument {
                    id: document_id.to_string(),
                    fields,
                }),
            }
        }
        self.notify(collection);
        Ok(())
    }
}
