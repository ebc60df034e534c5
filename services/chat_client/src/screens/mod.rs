pub mod chat;
pub mod protocol;
pub mod router;
pub mod state;
pub mod ws_handler;

// Re-export the WebSocket handler so the binary can mount it directly.
pub use ws_handler::ws_handler;
