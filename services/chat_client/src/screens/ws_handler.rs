//! services/chat_client/src/screens/ws_handler.rs
//!
//! The control loop of one widget connection. It follows the session gate to
//! tell the widget which screen set to show, mounts the chat screen on demand
//! and pushes every change of the open conversation's feed.

use crate::screens::{
    chat::ChatScreen,
    protocol::{ClientMessage, ServerMessage},
    router::select_screen,
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use chat_sync_core::{domain::SessionState, feed::MessageFeedState};
use futures::{stream::StreamExt, Sink, SinkExt};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// The chat screen mounted on this connection plus its change feed.
struct MountedChat {
    screen: ChatScreen,
    updates: watch::Receiver<MessageFeedState>,
}

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("Widget connected.");

    let (mut sender, mut receiver) = socket.split();
    let mut session_rx = app_state.gate.watch();
    let mut mounted: Option<MountedChat> = None;

    // --- 1. Tell the widget what to show right away ---
    let initial = session_rx.borrow_and_update().clone();
    let screen = ServerMessage::Screen {
        screen: select_screen(&initial),
    };
    if send_json(&mut sender, &screen).await.is_err() {
        error!("Failed to send the initial screen.");
        return;
    }

    // --- 2. Main Event Loop ---
    loop {
        tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    handle_text_message(text.to_string(), &app_state, &mut mounted, &mut sender).await;
                }
                Some(Ok(Message::Close(_))) => {
                    info!("Widget sent close message.");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("WebSocket error: {}", e);
                    break;
                }
                None => {
                    info!("Widget disconnected.");
                    break;
                }
            },
            changed = session_rx.changed() => {
                if changed.is_err() {
                    info!("Session gate is gone.");
                    break;
                }
                let state = session_rx.borrow_and_update().clone();
                if on_session_change(&state, &mut mounted, &mut sender).await.is_err() {
                    error!("Failed to push session change. Closing connection.");
                    break;
                }
            },
            Some(feed_state) = next_feed_state(&mut mounted) => {
                if send_json(&mut sender, &ServerMessage::from(&feed_state)).await.is_err() {
                    error!("Failed to push messages. Closing connection.");
                    break;
                }
            },
        }
    }

    // --- 3. Cleanup ---
    if let Some(chat) = mounted.take() {
        chat.screen.unmount();
    }
    info!("Widget connection closed.");
}

/// Resolves with the next feed state of the mounted chat, or never when none is mounted.
async fn next_feed_state(mounted: &mut Option<MountedChat>) -> Option<MessageFeedState> {
    match mounted {
        Some(chat) => {
            chat.updates.changed().await.ok()?;
            let state = chat.updates.borrow_and_update().clone();
            Some(state)
        }
        None => futures::future::pending().await,
    }
}

/// Unmounts the chat screen when its user is no longer the signed-in one,
/// then tells the widget which screen set to show.
async fn on_session_change<S>(
    state: &SessionState,
    mounted: &mut Option<MountedChat>,
    sender: &mut S,
) -> Result<(), axum::Error>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    let still_owner = matches!(
        (&*mounted, state.identity()),
        (Some(chat), Some(identity)) if chat.screen.me() == identity
    );
    if !still_owner {
        if let Some(chat) = mounted.take() {
            chat.screen.unmount();
            send_json(sender, &ServerMessage::ConversationClosed).await?;
        }
    }

    send_json(
        sender,
        &ServerMessage::Screen {
            screen: select_screen(state),
        },
    )
    .await
}

/// Helper function to handle the logic for different `ClientMessage` variants.
async fn handle_text_message<S>(
    text: String,
    app_state: &Arc<AppState>,
    mounted: &mut Option<MountedChat>,
    sender: &mut S,
) where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    let client_msg = match serde_json::from_str::<ClientMessage>(&text) {
        Ok(client_msg) => client_msg,
        Err(e) => {
            warn!("Failed to deserialize widget message: {}", e);
            report(sender, "Unrecognized message.").await;
            return;
        }
    };

    match client_msg {
        ClientMessage::SignIn { email, password } => {
            if let Err(e) = app_state.auth.sign_in(&email, &password).await {
                warn!("Sign in failed for {}: {}", email, e);
                report(sender, "Invalid email or password").await;
            }
        }
        ClientMessage::SignUp { email, password } => {
            if let Err(e) = app_state.auth.sign_up(&email, &password).await {
                warn!("Sign up failed for {}: {}", email, e);
                report(sender, &e.to_string()).await;
            }
        }
        ClientMessage::SignOut => match mounted {
            Some(chat) => chat.screen.sign_out().await,
            None => app_state.gate.sign_out().await,
        },
        ClientMessage::OpenConversation { peer } => {
            let SessionState::Authenticated(me) = app_state.gate.current() else {
                report(sender, "Sign in before opening a conversation.").await;
                return;
            };
            if let Some(chat) = mounted.take() {
                chat.screen.unmount();
            }
            match ChatScreen::mount(app_state, &me, &peer).await {
                Ok(screen) => {
                    let mut updates = screen.feed().watch();
                    let current = updates.borrow_and_update().clone();
                    let key = screen.key().to_string();
                    *mounted = Some(MountedChat { screen, updates });

                    let opened = ServerMessage::ConversationOpened { key };
                    if send_json(sender, &opened).await.is_err()
                        || send_json(sender, &ServerMessage::from(&current)).await.is_err()
                    {
                        error!("Failed to push the opened conversation.");
                    }
                }
                Err(e) => {
                    warn!("Failed to open conversation with {}: {}", peer, e);
                    report(sender, &e.to_string()).await;
                }
            }
        }
        ClientMessage::CloseConversation => {
            if let Some(chat) = mounted.take() {
                chat.screen.unmount();
                if send_json(sender, &ServerMessage::ConversationClosed).await.is_err() {
                    error!("Failed to send ConversationClosed message.");
                }
            }
        }
        ClientMessage::Send { message } => match mounted {
            // The durable write runs in the background; the feed watch pushes the result.
            Some(chat) => drop(chat.screen.send(message)),
            None => report(sender, "No conversation is open.").await,
        },
        ClientMessage::SendText { text } => match mounted {
            Some(chat) => {
                if let Err(e) = chat.screen.send_text(&text) {
                    report(sender, &e.to_string()).await;
                }
            }
            None => report(sender, "No conversation is open.").await,
        },
    }
}

async fn send_json<S>(sender: &mut S, message: &ServerMessage) -> Result<(), axum::Error>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    let json = serde_json::to_string(message).map_err(axum::Error::new)?;
    sender.send(Message::Text(json.into())).await
}

async fn report<S>(sender: &mut S, message: &str)
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    let err_msg = ServerMessage::Error {
        message: message.to_string(),
    };
    if send_json(sender, &err_msg).await.is_err() {
        error!("Failed to send error message to widget.");
    }
}
