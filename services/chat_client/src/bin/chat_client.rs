//! services/chat_client/src/bin/chat_client.rs

use axum::{
    http::{header::CONTENT_TYPE, Method},
    routing::get,
    Router,
};
use chat_client_lib::{
    adapters::{MemoryAuth, MemoryStore},
    config::Config,
    error::ClientError,
    screens::{state::AppState, ws_handler},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting chat client...");

    // --- 2. Initialize Service Adapters ---
    let auth = Arc::new(MemoryAuth::new());
    let store = Arc::new(MemoryStore::new());

    // --- 3. Build the Shared AppState (starts the session gate) ---
    let app_state = Arc::new(AppState::new(auth, store, config.clone()));
    let gate = app_state.gate.clone();
    info!("Session gate started: {:?}", gate.current());

    // --- 4. Create the Widget Router ---
    let cors = CorsLayer::new()
        .allow_origin(config.widget_origin.clone())
        .allow_methods([Method::GET])
        .allow_headers([CONTENT_TYPE]);

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(app_state);

    // --- 5. Serve Until Interrupted ---
    info!("Widget bridge listening on ws://{}/ws", config.bind_address);
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // --- 6. Release the auth-change subscription ---
    match Arc::try_unwrap(gate) {
        Ok(gate) => gate.shutdown(),
        Err(_) => info!("Session gate still referenced; it is released when the last connection ends."),
    }
    info!("Chat client stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for the shutdown signal: {}", e);
        futures::future::pending::<()>().await;
    }
}
