use axum::body::Body;
use axum::http::{Request, StatusCode};
use schaetzrunde::api::CreateLobbyResponse;
use schaetzrunde::protocol::{ClientMessage, LobbySnapshot, ServerMessage};
use schaetzrunde::questions::QuestionSource;
use schaetzrunde::state::LobbyRegistry;
use schaetzrunde::types::{
    CorrectAnswer, FinishReason, GameMode, LobbySettings, LobbyStatus, Question, QuestionType,
    RawAnswer,
};
use schaetzrunde::ws::handlers::{handle_disconnect, handle_message};
use schaetzrunde::ws::Session;
use std::sync::Arc;
use tower::ServiceExt;

/// Every question has the answer 100, so deviations are predictable
fn registry() -> LobbyRegistry {
    let questions = (1..=6)
        .map(|i| Question {
            id: i.to_string(),
            text: format!("Schätzfrage {}", i),
            kind: QuestionType::Number,
            correct_answer: Some(CorrectAnswer::Number(100.0)),
        })
        .collect();
    LobbyRegistry::new(Arc::new(QuestionSource::new(questions).unwrap()), 8)
}

async fn snapshot(registry: &LobbyRegistry, code: &str) -> LobbySnapshot {
    let lobby = registry.get(code).await.unwrap();
    let snapshot = lobby.lock().await.snapshot();
    snapshot
}

async fn join(registry: &LobbyRegistry, code: &str, name: &str) -> Session {
    let mut session = Session::new();
    let reply = handle_message(
        ClientMessage::JoinLobby {
            code: code.to_string(),
            name: Some(name.to_string()),
        },
        &mut session,
        registry,
    )
    .await;

    match reply {
        Some(ServerMessage::JoinResult {
            success: true,
            player_id: Some(player_id),
            lobby: Some(lobby),
            ..
        }) => {
            assert_eq!(player_id, session.connection_id);
            assert!(lobby.players.iter().any(|p| p.id == player_id));
        }
        other => panic!("Expected successful JoinResult, got {:?}", other),
    }
    session
}

async fn submit(session: &mut Session, registry: &LobbyRegistry, answer: &str) {
    let reply = handle_message(
        ClientMessage::SubmitAnswer {
            answer: RawAnswer::Text(answer.to_string()),
        },
        session,
        registry,
    )
    .await;
    assert!(reply.is_none(), "Answers get no direct reply");
}

async fn send(session: &mut Session, registry: &LobbyRegistry, msg: ClientMessage) {
    let reply = handle_message(msg, session, registry).await;
    assert!(reply.is_none());
}

fn drain(session: &mut Session) -> Vec<ServerMessage> {
    let mut out = Vec::new();
    if let Some(rx) = session.events.as_mut() {
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
    }
    out
}

fn join_error_code(reply: Option<ServerMessage>) -> String {
    match reply {
        Some(ServerMessage::JoinResult {
            success: false,
            error: Some(error),
            lobby: None,
            player_id: None,
        }) => error.code,
        other => panic!("Expected failed JoinResult, got {:?}", other),
    }
}

fn vote_result(reply: Option<ServerMessage>) -> Result<(), String> {
    match reply {
        Some(ServerMessage::VoteResult { success: true, .. }) => Ok(()),
        Some(ServerMessage::VoteResult {
            success: false,
            error: Some(error),
        }) => Err(error.code),
        other => panic!("Expected VoteResult, got {:?}", other),
    }
}

/// End-to-end flow of a fixed game with two rounds
#[tokio::test]
async fn test_full_fixed_game_flow() {
    let registry = registry();
    let code = registry
        .create_lobby(LobbySettings::new(GameMode::Fixed, Some(2)))
        .await;

    let mut anna = join(&registry, &code, "Anna").await;
    let mut ben = join(&registry, &code.to_lowercase(), "  Ben  ").await;

    let lobby = snapshot(&registry, &code).await;
    assert_eq!(lobby.status, LobbyStatus::Waiting);
    assert_eq!(lobby.players.len(), 2);
    assert_eq!(lobby.players[1].name, "Ben");

    // Round 1: explicit start
    send(&mut anna, &registry, ClientMessage::StartRound).await;
    let lobby = snapshot(&registry, &code).await;
    assert_eq!(lobby.status, LobbyStatus::Collecting);
    assert!(lobby.current_question.is_some());

    let events = drain(&mut ben);
    assert!(events
        .iter()
        .any(|m| matches!(m, ServerMessage::RoundStarted { kind: QuestionType::Number, .. })));

    submit(&mut anna, &registry, "90").await;
    assert_eq!(
        snapshot(&registry, &code).await.status,
        LobbyStatus::Collecting
    );
    submit(&mut ben, &registry, "130").await;

    let lobby = snapshot(&registry, &code).await;
    assert_eq!(lobby.status, LobbyStatus::Results);
    assert_eq!(lobby.rounds_played, 1);
    let result = lobby.last_results.unwrap();
    assert_eq!(result.entries.len(), 2);
    assert_eq!(result.entries[0].deviation, Some(10.0));
    assert!(result.entries[0].is_closest);
    assert_eq!(result.entries[1].deviation, Some(30.0));
    assert!(result.entries[1].is_farthest);

    let events = drain(&mut anna);
    assert!(events
        .iter()
        .any(|m| matches!(m, ServerMessage::AnswerReceived { name, .. } if name == "Ben")));
    assert!(events
        .iter()
        .any(|m| matches!(m, ServerMessage::RoundResults { .. })));

    // Round 2 starts once everybody is ready
    send(&mut anna, &registry, ClientMessage::PlayerReady).await;
    assert_eq!(snapshot(&registry, &code).await.status, LobbyStatus::Results);
    send(&mut ben, &registry, ClientMessage::PlayerReady).await;

    let lobby = snapshot(&registry, &code).await;
    assert_eq!(lobby.status, LobbyStatus::Collecting);
    assert!(lobby.last_results.is_none());
    assert!(lobby.players.iter().all(|p| !p.ready && !p.has_submitted));

    submit(&mut anna, &registry, "100").await;
    submit(&mut ben, &registry, "100,5").await;

    // Limit reached: the game ends right after the second evaluation
    let lobby = snapshot(&registry, &code).await;
    assert_eq!(lobby.status, LobbyStatus::Finished);
    assert_eq!(lobby.rounds_played, 2);

    let summary = lobby.final_summary.unwrap();
    assert_eq!(summary.reason, FinishReason::Limit);
    assert_eq!(summary.rounds_played, 2);
    assert_eq!(summary.highscore.len(), 2);
    assert_eq!(summary.highscore[0].stats.display_name, "Anna");
    assert_eq!(summary.highscore[0].stats.points, 4);
    assert_eq!(summary.highscore[0].average_deviation, Some(5.0));
    assert_eq!(summary.highscore[1].stats.points, 2);
    assert_eq!(summary.highscore[1].average_deviation, Some(15.25));

    let events = drain(&mut ben);
    assert!(events
        .iter()
        .any(|m| matches!(m, ServerMessage::GameSummary { summary } if summary.reason == FinishReason::Limit)));

    // Nothing moves a finished game
    send(&mut anna, &registry, ClientMessage::PlayerReady).await;
    send(&mut ben, &registry, ClientMessage::StartRound).await;
    assert_eq!(
        snapshot(&registry, &code).await.status,
        LobbyStatus::Finished
    );
}

#[tokio::test]
async fn test_join_errors() {
    let registry = registry();
    let mut session = Session::new();

    let reply = handle_message(
        ClientMessage::JoinLobby {
            code: "ZZZZ".into(),
            name: None,
        },
        &mut session,
        &registry,
    )
    .await;
    assert_eq!(join_error_code(reply), "LOBBY_NOT_FOUND");

    let reply = handle_message(
        ClientMessage::JoinLobby {
            code: "AB".into(),
            name: None,
        },
        &mut session,
        &registry,
    )
    .await;
    assert_eq!(join_error_code(reply), "INVALID_CODE");
    assert!(session.lobby.is_none());
    assert!(session.events.is_none());
}

#[tokio::test]
async fn test_ninth_player_is_rejected() {
    let registry = registry();
    let code = registry.create_lobby(LobbySettings::default()).await;

    let mut sessions = Vec::new();
    for i in 0..8 {
        sessions.push(join(&registry, &code, &format!("Spieler {}", i)).await);
    }

    let mut late = Session::new();
    let reply = handle_message(
        ClientMessage::JoinLobby {
            code: code.clone(),
            name: Some("Zu spät".into()),
        },
        &mut late,
        &registry,
    )
    .await;
    assert_eq!(join_error_code(reply), "LOBBY_FULL");

    // A free seat can be taken again
    handle_disconnect(&mut sessions[0], &registry).await;
    let _late = join(&registry, &code, "Zu spät").await;
    assert_eq!(snapshot(&registry, &code).await.players.len(), 8);
}

#[tokio::test]
async fn test_default_name_when_blank() {
    let registry = registry();
    let code = registry.create_lobby(LobbySettings::default()).await;

    let mut session = Session::new();
    let reply = handle_message(
        ClientMessage::JoinLobby {
            code: code.clone(),
            name: Some("   ".into()),
        },
        &mut session,
        &registry,
    )
    .await;
    assert!(matches!(
        reply,
        Some(ServerMessage::JoinResult { success: true, .. })
    ));
    assert_eq!(snapshot(&registry, &code).await.players[0].name, "Spieler");
}

#[tokio::test]
async fn test_unlimited_game_ends_by_vote() {
    let registry = registry();
    let code = registry
        .create_lobby(LobbySettings::new(GameMode::Unlimited, Some(3)))
        .await;

    let mut anna = join(&registry, &code, "Anna").await;
    let mut ben = join(&registry, &code, "Ben").await;

    let lobby = snapshot(&registry, &code).await;
    assert_eq!(lobby.settings.question_limit, None);
    let vote = lobby.end_vote.unwrap();
    assert_eq!((vote.count, vote.required), (0, 2));

    send(&mut anna, &registry, ClientMessage::StartRound).await;
    submit(&mut anna, &registry, "100").await;
    submit(&mut ben, &registry, "50").await;
    assert_eq!(snapshot(&registry, &code).await.status, LobbyStatus::Results);

    let reply = handle_message(ClientMessage::VoteEndGame, &mut anna, &registry).await;
    assert_eq!(vote_result(reply), Ok(()));

    let reply = handle_message(ClientMessage::VoteEndGame, &mut anna, &registry).await;
    assert_eq!(vote_result(reply), Err("ALREADY_VOTED".to_string()));

    let vote = snapshot(&registry, &code).await.end_vote.unwrap();
    assert_eq!(vote.count, 1);
    assert_eq!(vote.voters[0].name, "Anna");

    let reply = handle_message(ClientMessage::VoteEndGame, &mut ben, &registry).await;
    assert_eq!(vote_result(reply), Ok(()));

    let lobby = snapshot(&registry, &code).await;
    assert_eq!(lobby.status, LobbyStatus::Finished);
    assert!(lobby.end_vote.is_none());
    let summary = lobby.final_summary.unwrap();
    assert_eq!(summary.reason, FinishReason::Vote);
    assert_eq!(summary.rounds_played, 1);
    assert_eq!(summary.highscore[0].stats.display_name, "Anna");

    // Voting after the end is refused
    let reply = handle_message(ClientMessage::VoteEndGame, &mut ben, &registry).await;
    assert_eq!(vote_result(reply), Err("VOTE_UNAVAILABLE".to_string()));
}

#[tokio::test]
async fn test_vote_refused_outside_unlimited_lobby() {
    let registry = registry();
    let code = registry.create_lobby(LobbySettings::default()).await;

    let mut outsider = Session::new();
    let reply = handle_message(ClientMessage::VoteEndGame, &mut outsider, &registry).await;
    assert_eq!(vote_result(reply), Err("NOT_IN_LOBBY".to_string()));

    let mut anna = join(&registry, &code, "Anna").await;
    let reply = handle_message(ClientMessage::VoteEndGame, &mut anna, &registry).await;
    assert_eq!(vote_result(reply), Err("VOTE_UNAVAILABLE".to_string()));
}

#[tokio::test]
async fn test_departure_completes_round() {
    let registry = registry();
    let code = registry.create_lobby(LobbySettings::default()).await;

    let mut anna = join(&registry, &code, "Anna").await;
    let mut ben = join(&registry, &code, "Ben").await;
    let mut carla = join(&registry, &code, "Carla").await;

    send(&mut anna, &registry, ClientMessage::StartRound).await;
    submit(&mut anna, &registry, "99").await;
    submit(&mut ben, &registry, "kein Plan").await;
    assert_eq!(
        snapshot(&registry, &code).await.status,
        LobbyStatus::Collecting
    );

    handle_disconnect(&mut carla, &registry).await;
    assert!(carla.lobby.is_none());

    let lobby = snapshot(&registry, &code).await;
    assert_eq!(lobby.status, LobbyStatus::Results);
    assert_eq!(lobby.players.len(), 2);

    let result = lobby.last_results.unwrap();
    assert_eq!(result.entries.len(), 2);
    assert_eq!(result.entries[0].deviation, Some(1.0));
    assert!(result.entries[0].is_closest && result.entries[0].is_farthest);
    assert_eq!(result.entries[1].deviation, None);
    assert!(!result.entries[1].is_closest);
}

#[tokio::test]
async fn test_departure_completes_end_vote() {
    let registry = registry();
    let code = registry
        .create_lobby(LobbySettings::new(GameMode::Unlimited, None))
        .await;

    let mut anna = join(&registry, &code, "Anna").await;
    let mut ben = join(&registry, &code, "Ben").await;

    send(&mut anna, &registry, ClientMessage::StartRound).await;
    submit(&mut anna, &registry, "80").await;

    let reply = handle_message(ClientMessage::VoteEndGame, &mut anna, &registry).await;
    assert_eq!(vote_result(reply), Ok(()));

    // Ben leaves without answering: Anna's vote is now unanimous and the
    // open round is scored before the game ends
    handle_disconnect(&mut ben, &registry).await;

    let lobby = snapshot(&registry, &code).await;
    assert_eq!(lobby.status, LobbyStatus::Finished);
    let summary = lobby.final_summary.unwrap();
    assert_eq!(summary.reason, FinishReason::Vote);
    assert_eq!(summary.rounds_played, 1);
    assert_eq!(summary.highscore.len(), 1);
    assert_eq!(summary.highscore[0].average_deviation, Some(20.0));
}

#[tokio::test]
async fn test_answers_outside_round_are_ignored() {
    let registry = registry();
    let code = registry.create_lobby(LobbySettings::default()).await;
    let mut anna = join(&registry, &code, "Anna").await;
    let mut ben = join(&registry, &code, "Ben").await;

    submit(&mut anna, &registry, "42").await;
    let lobby = snapshot(&registry, &code).await;
    assert_eq!(lobby.status, LobbyStatus::Waiting);
    assert!(lobby.players.iter().all(|p| !p.has_submitted));

    // Second answer in the same round does not replace the first
    send(&mut anna, &registry, ClientMessage::StartRound).await;
    submit(&mut anna, &registry, "100").await;
    submit(&mut anna, &registry, "5").await;
    submit(&mut ben, &registry, "110").await;

    let result = snapshot(&registry, &code).await.last_results.unwrap();
    assert_eq!(result.entries[0].deviation, Some(0.0));
}

#[tokio::test]
async fn test_joining_another_lobby_leaves_the_first() {
    let registry = registry();
    let first = registry.create_lobby(LobbySettings::default()).await;
    let second = registry.create_lobby(LobbySettings::default()).await;

    let _anna = join(&registry, &first, "Anna").await;
    let mut ben = join(&registry, &first, "Ben").await;

    let reply = handle_message(
        ClientMessage::JoinLobby {
            code: second.clone(),
            name: Some("Ben".into()),
        },
        &mut ben,
        &registry,
    )
    .await;
    assert!(matches!(
        reply,
        Some(ServerMessage::JoinResult { success: true, .. })
    ));
    assert_eq!(ben.lobby.as_deref(), Some(second.as_str()));

    assert_eq!(snapshot(&registry, &first).await.players.len(), 1);
    assert_eq!(snapshot(&registry, &second).await.players.len(), 1);
}

#[tokio::test]
async fn test_last_disconnect_disposes_lobby() {
    let registry = registry();
    let code = registry.create_lobby(LobbySettings::default()).await;

    let mut anna = join(&registry, &code, "Anna").await;
    let mut ben = join(&registry, &code, "Ben").await;

    handle_disconnect(&mut anna, &registry).await;
    assert_eq!(registry.len().await, 1);

    handle_disconnect(&mut ben, &registry).await;
    assert!(registry.is_empty().await);

    // Disconnecting twice is harmless
    handle_disconnect(&mut ben, &registry).await;

    let mut late = Session::new();
    let reply = handle_message(
        ClientMessage::JoinLobby {
            code,
            name: None,
        },
        &mut late,
        &registry,
    )
    .await;
    assert_eq!(join_error_code(reply), "LOBBY_NOT_FOUND");
}

#[tokio::test]
async fn test_create_lobby_over_http() {
    let registry = registry();
    let static_dir = tempfile::tempdir().unwrap();
    let app = schaetzrunde::build_router(registry.clone(), static_dir.path());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/lobbies")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"mode": "fixed", "question_count": 250}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let created: CreateLobbyResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(created.settings.question_limit, Some(99));
    assert!(registry.get(&created.code).await.is_ok());

    // Empty body means defaults
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/lobbies")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let created: CreateLobbyResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(created.settings, LobbySettings::default());
    assert_eq!(registry.len().await, 2);
}

#[tokio::test]
async fn test_create_lobby_rejects_bad_json() {
    let registry = registry();
    let static_dir = tempfile::tempdir().unwrap();
    let app = schaetzrunde::build_router(registry.clone(), static_dir.path());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/lobbies")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn test_static_files_are_served() {
    let static_dir = tempfile::tempdir().unwrap();
    std::fs::write(static_dir.path().join("index.html"), "<h1>Schätzrunde</h1>").unwrap();
    let app = schaetzrunde::build_router(registry(), static_dir.path());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/index.html")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
