//! crates/chat_sync_core/src/membership.rs
//!
//! Records which conversations each participant belongs to.

use crate::ports::{DocumentStore, Fields, PortError, PortResult, WriteMode};
use tracing::info;

/// Writes `{collection}/{a} = { b: true }` and `{collection}/{b} = { a: true }`.
///
/// Merge writes keep every other conversation a participant already has, so
/// calling this repeatedly for the same pair is harmless.
pub async fn provision_membership(
    store: &dyn DocumentStore,
    collection: &str,
    a: &str,
    b: &str,
) -> PortResult<()> {
    if a.is_empty() || b.is_empty() {
        return Err(PortError::Invalid(
            "participant identifiers must not be empty".to_string(),
        ));
    }

    store
        .set_document(collection, a, membership_fields(b), WriteMode::Merge)
        .await?;
    if a != b {
        store
            .set_document(collection, b, membership_fields(a), WriteMode::Merge)
            .await?;
    }

    info!("Provisioned membership for {} and {}", a, b);
    Ok(())
}

fn membership_fields(peer: &str) -> Fields {
    let mut fields = Fields::new();
    fields.insert(peer.to_string(), serde_json::Value::Bool(true));
    fields
}
