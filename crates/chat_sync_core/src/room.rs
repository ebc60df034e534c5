//! crates/chat_sync_core/src/room.rs
//!
//! Derives the canonical key of a two-party conversation.

use std::fmt;

const KEY_PREFIX: &str = "chat_";
const KEY_DELIMITER: &str = "_";

/// Stable, order-independent identifier of a two-party conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationKey(String);

impl ConversationKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The store collection holding this conversation's messages.
    pub fn messages_collection(&self, root: &str) -> String {
        format!("{}/{}/messages", root, self.0)
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives the key for the unordered pair `{a, b}`: the lexicographically
/// smaller identifier comes first. Equal identifiers (self-chat) are allowed.
pub fn derive_key(a: &str, b: &str) -> ConversationKey {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    ConversationKey(format!("{KEY_PREFIX}{first}{KEY_DELIMITER}{second}"))
}
