pub mod domain;
pub mod feed;
pub mod membership;
pub mod ports;
pub mod room;
pub mod session_gate;

#[cfg(test)]
pub(crate) mod testing;

pub use domain::{Author, Identity, Message, Session, SessionState};
pub use feed::{ConversationFeed, MessageFeedState, ORDER_FIELD};
pub use membership::provision_membership;
pub use ports::{
    AuthHandler, AuthService, DocumentStore, Fields, OrderDirection, PortError, PortResult,
    SnapshotHandler, StoredDocument, Subscription, WriteMode,
};
pub use room::{derive_key, ConversationKey};
pub use session_gate::SessionGate;
