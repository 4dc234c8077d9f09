// Public API for integration tests and potential library usage

pub mod api;
pub mod config;
pub mod error;
pub mod gc;
pub mod protocol;
pub mod questions;
pub mod state;
pub mod types;
pub mod ws;

use axum::{
    routing::{get, post},
    Router,
};
use std::path::Path;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use state::LobbyRegistry;

/// Assemble the HTTP surface: lobby creation, the game socket, and static files
pub fn build_router(registry: LobbyRegistry, static_dir: impl AsRef<Path>) -> Router {
    Router::new()
        .route("/lobbies", post(api::create_lobby))
        .route("/ws", get(ws::ws_handler))
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(registry)
}
