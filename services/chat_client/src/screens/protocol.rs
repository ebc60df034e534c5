//! services/chat_client/src/screens/protocol.rs
//!
//! Defines the WebSocket message protocol between the chat widget and the client.

use crate::screens::router::ScreenSet;
use chat_sync_core::{domain::Message, feed::MessageFeedState};
use serde::{Deserialize, Serialize};

//=========================================================================================
// Messages Sent FROM the Widget TO the Client
//=========================================================================================

/// Represents the structured text messages the widget can send.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    SignIn { email: String, password: String },

    SignUp { email: String, password: String },

    SignOut,

    /// Opens the conversation with `peer`, closing any other open conversation.
    OpenConversation { peer: String },

    CloseConversation,

    /// A message fully built by the widget (`_id`, `createdAt`, `text`, `user`).
    Send { message: Message },

    /// Plain text; the client assigns id, timestamp and author.
    SendText { text: String },
}

//=========================================================================================
// Messages Sent FROM the Client TO the Widget
//=========================================================================================

/// Represents the structured text messages the client pushes to the widget.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The screen set to mount. Sent on connect and on every session change.
    Screen { screen: ScreenSet },

    ConversationOpened { key: String },

    ConversationClosed,

    /// The full visible list, newest first, after every feed change.
    Messages {
        items: Vec<Message>,
        unconfirmed: Vec<String>,
    },

    Error { message: String },
}

impl From<&MessageFeedState> for ServerMessage {
    fn from(state: &MessageFeedState) -> Self {
        ServerMessage::Messages {
            items: state.items.clone(),
            unconfirmed: state.unconfirmed.iter().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn widget_send_carries_a_complete_message() {
        let raw = json!({
            "type": "send",
            "message": {
                "_id": "m1",
                "createdAt": 1_700_000_000_000_i64,
                "text": "hi",
                "user": { "_id": "u1", "avatar": "https://i.pravatar.cc/300" }
            }
        });

        match serde_json::from_value::<ClientMessage>(raw).unwrap() {
            ClientMessage::Send { message } => {
                assert_eq!(message.id, "m1");
                assert_eq!(message.author.id, "u1");
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn unit_variants_are_tagged_by_type() {
        let parsed: ClientMessage = serde_json::from_str(r#"{"type":"sign_out"}"#).unwrap();
        assert!(matches!(parsed, ClientMessage::SignOut));

        let screen = serde_json::to_value(ServerMessage::Screen {
            screen: ScreenSet::Splash,
        })
        .unwrap();
        assert_eq!(screen, json!({"type": "screen", "screen": "splash"}));
    }

    #[test]
    fn feed_state_becomes_a_messages_push() {
        let mut state = MessageFeedState::default();
        state.unconfirmed.insert("m1".to_string());

        let value = serde_json::to_value(ServerMessage::from(&state)).unwrap();
        assert_eq!(
            value,
            json!({"type": "messages", "items": [], "unconfirmed": ["m1"]})
        );
    }
}
