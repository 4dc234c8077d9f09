use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use schaetzrunde::{
    build_router, config::ServerConfig, gc, questions::QuestionSource, state::LobbyRegistry,
};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "schaetzrunde=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Schätzrunde...");

    let config = ServerConfig::from_env();

    // Without questions there is no game; refuse to start
    let questions = match QuestionSource::load(&config.questions_path) {
        Ok(source) => Arc::new(source),
        Err(e) => {
            tracing::error!(
                "Failed to load questions from {}: {}",
                config.questions_path.display(),
                e
            );
            std::process::exit(1);
        }
    };

    let registry = LobbyRegistry::new(questions, config.max_players);
    gc::spawn_idle_lobby_reaper(registry.clone(), config.lobby_idle);

    let app = build_router(registry, &config.static_dir);

    let addr = config.socket_addr();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    tracing::info!("Listening on http://{}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}
