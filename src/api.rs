//! HTTP API endpoints.
//!
//! Only lobby creation happens over plain HTTP; everything else runs over the
//! websocket.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::state::LobbyRegistry;
use crate::types::{GameMode, LobbyCode, LobbySettings};

/// Body of `POST /lobbies`. Both fields are optional; an empty body creates a
/// fixed game with the default round count.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateLobbyRequest {
    #[serde(default)]
    pub mode: GameMode,
    pub question_count: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLobbyResponse {
    pub code: LobbyCode,
    pub settings: LobbySettings,
}

/// Create a lobby.
///
/// POST /lobbies
pub async fn create_lobby(State(registry): State<LobbyRegistry>, body: Bytes) -> Response {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        CreateLobbyRequest::default()
    } else {
        match serde_json::from_slice::<CreateLobbyRequest>(&body) {
            Ok(req) => req,
            Err(e) => {
                tracing::warn!("Rejected lobby creation request: {}", e);
                return (StatusCode::BAD_REQUEST, format!("Invalid request: {}", e))
                    .into_response();
            }
        }
    };

    let settings = LobbySettings::new(request.mode, request.question_count);
    let code = registry.create_lobby(settings).await;

    Json(CreateLobbyResponse { code, settings }).into_response()
}
