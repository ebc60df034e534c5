//! services/chat_client/src/screens/chat.rs
//!
//! The authenticated chat screen: one open conversation between the signed-in
//! user and a peer. Mounting subscribes the feed; unmounting (or dropping the
//! screen) cancels it.

use crate::screens::state::AppState;
use chat_sync_core::{
    domain::{Author, Identity, Message},
    feed::ConversationFeed,
    membership::provision_membership,
    ports::{PortError, PortResult},
    room::{derive_key, ConversationKey},
    session_gate::SessionGate,
};
use chrono::{SubsecRound, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

pub struct ChatScreen {
    me: Identity,
    author: Author,
    feed: ConversationFeed,
    gate: Arc<SessionGate>,
}

impl ChatScreen {
    /// Opens the conversation between `me` and `peer`.
    ///
    /// Membership records for both participants are provisioned here, when the
    /// conversation is opened. A failed provisioning write is logged and does
    /// not keep the screen from mounting.
    pub async fn mount(app_state: &AppState, me: &Identity, peer: &str) -> PortResult<Self> {
        let peer = peer.trim();
        if peer.is_empty() {
            return Err(PortError::Invalid("peer must not be empty".to_string()));
        }

        let key = derive_key(me.as_str(), peer);
        info!("{}, {} => {}", me, peer, key);

        if let Err(e) = provision_membership(
            app_state.store.as_ref(),
            &app_state.config.membership_collection,
            me.as_str(),
            peer,
        )
        .await
        {
            error!("Failed to provision membership for {}: {}", key, e);
        }

        let feed = ConversationFeed::subscribe(
            app_state.store.clone(),
            key,
            &app_state.config.chats_collection,
        );
        let author = Author::new(me.as_str()).with_avatar(&app_state.config.default_avatar_url);

        Ok(Self {
            me: me.clone(),
            author,
            feed,
            gate: app_state.gate.clone(),
        })
    }

    pub fn me(&self) -> &Identity {
        &self.me
    }

    pub fn key(&self) -> &ConversationKey {
        self.feed.key()
    }

    pub fn feed(&self) -> &ConversationFeed {
        &self.feed
    }

    /// Sends a message as built by the widget, id and timestamp included.
    ///
    /// The author is always the signed-in user; the widget only chooses the
    /// id, the timestamp and the text.
    pub fn send(&self, mut message: Message) -> JoinHandle<()> {
        if message.author.id != self.me.as_str() {
            warn!(
                "Message {} claimed author {}; sending as {}",
                message.id, message.author.id, self.me
            );
            message.author = self.author.clone();
        } else if message.author.avatar.is_none() {
            message.author.avatar = self.author.avatar.clone();
        }
        self.feed.send(message)
    }

    /// Builds a message from the signed-in user and sends it.
    pub fn send_text(&self, text: &str) -> PortResult<JoinHandle<()>> {
        if text.trim().is_empty() {
            return Err(PortError::Invalid("message text must not be empty".to_string()));
        }
        let message = Message {
            id: Uuid::new_v4().to_string(),
            // The store keeps millisecond precision.
            created_at: Utc::now().trunc_subsecs(3),
            text: text.to_string(),
            author: self.author.clone(),
        };
        Ok(self.feed.send(message))
    }

    /// Ends the session from the chat screen. The gate's next notification
    /// moves the router back to the auth screens.
    pub async fn sign_out(&self) {
        self.gate.sign_out().await;
    }

    pub fn unmount(self) {
        self.feed.unsubscribe();
    }
}
