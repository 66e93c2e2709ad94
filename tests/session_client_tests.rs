mod common;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use common::serve;
use mock_interview::{
    create_router, AnswerSubmission, AppState, ClientConfig, ClientError, InterviewBackend, Session, SessionClient,
};
use serde_json::json;
use std::time::Duration;

fn client(base_url: &str, timeout: Duration) -> SessionClient {
    SessionClient::new(&ClientConfig {
        base_url: base_url.to_string(),
        request_timeout: timeout,
    })
    .unwrap()
}

fn answer(transcript: &str) -> AnswerSubmission {
    AnswerSubmission {
        audio: b"not really webm".to_vec(),
        mime_type: "audio/webm".to_string(),
        file_name: "answer.webm".to_string(),
        transcript: transcript.to_string(),
    }
}

fn orphan_session() -> Session {
    Session {
        session_id: "session_missing".to_string(),
        display_name: "Nobody".to_string(),
    }
}

#[tokio::test]
async fn test_login_and_first_question() {
    let base_url = serve(create_router(AppState::default())).await;
    let client = client(&base_url, Duration::from_secs(5));

    let session = client.login("Ada").await.unwrap();
    assert_eq!(session.display_name, "Ada");
    assert!(session.session_id.starts_with("session_"));

    let question = client.fetch_next_question(&session).await.unwrap().unwrap();
    assert_eq!(question.id, 1);
}

#[tokio::test]
async fn test_submit_uploads_audio_and_transcript() {
    let state = AppState::default();
    let base_url = serve(create_router(state.clone())).await;
    let client = client(&base_url, Duration::from_secs(5));
    let session = client.login("Ada").await.unwrap();

    let response = client.submit_answer(&session, answer("Hello there")).await.unwrap();

    assert!(response.is_ok());
    assert_eq!(response.message.as_deref(), Some("Answer recorded successfully"));
    assert!(response.scores.is_empty());

    {
        let sessions = state.sessions.read().await;
        let record = &sessions[&session.session_id];
        assert_eq!(record.answers[0].transcript, "Hello there");
        assert_eq!(record.answers[0].audio_bytes, b"not really webm".len());
    }

    let question = client.fetch_next_question(&session).await.unwrap();
    assert_eq!(question.map(|q| q.id), Some(2));
}

#[tokio::test]
async fn test_long_uncompressed_answer_is_uploaded() {
    let state = AppState::default();
    let base_url = serve(create_router(state.clone())).await;
    let client = client(&base_url, Duration::from_secs(30));
    let session = client.login("Ada").await.unwrap();

    // 15 s of 44.1 kHz stereo 16-bit PCM
    let audio = vec![0u8; 15 * 44_100 * 2 * 2];
    let response = client
        .submit_answer(
            &session,
            AnswerSubmission {
                audio: audio.clone(),
                mime_type: "audio/wav".to_string(),
                file_name: "answer.wav".to_string(),
                transcript: String::new(),
            },
        )
        .await
        .unwrap();

    assert!(response.is_ok());
    let sessions = state.sessions.read().await;
    assert_eq!(sessions[&session.session_id].answers[0].audio_bytes, audio.len());
}

#[tokio::test]
async fn test_skipping_through_to_completion() {
    let base_url = serve(create_router(AppState::default())).await;
    let client = client(&base_url, Duration::from_secs(5));
    let session = client.login("Ada").await.unwrap();

    while client.fetch_next_question(&session).await.unwrap().is_some() {
        client.skip_question(&session).await.unwrap();
    }

    assert_eq!(client.fetch_next_question(&session).await, Ok(None));
    assert_eq!(
        client.skip_question(&session).await,
        Err(ClientError::ServerError("Interview already completed".to_string()))
    );
}

#[tokio::test]
async fn test_unknown_session_surfaces_server_detail() {
    let base_url = serve(create_router(AppState::default())).await;
    let client = client(&base_url, Duration::from_secs(5));

    assert_eq!(
        client.fetch_next_question(&orphan_session()).await,
        Err(ClientError::ServerError("Invalid session".to_string()))
    );
}

#[tokio::test]
async fn test_detail_field_is_preferred() {
    let router = Router::new().route(
        "/login",
        post(|| async {
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "detail": "Name is too long" })),
            )
        }),
    );
    let base_url = serve(router).await;

    let result = client(&base_url, Duration::from_secs(5)).login("Ada").await;
    assert_eq!(result, Err(ClientError::ServerError("Name is too long".to_string())));
}

#[tokio::test]
async fn test_error_without_body_reports_status() {
    let router = Router::new().route(
        "/skip/:session_id",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let base_url = serve(router).await;

    let result = client(&base_url, Duration::from_secs(5))
        .skip_question(&orphan_session())
        .await;
    assert_eq!(
        result,
        Err(ClientError::ServerError("HTTP 500 Internal Server Error".to_string()))
    );
}

#[tokio::test]
async fn test_malformed_responses() {
    let router = Router::new()
        .route("/questions/:session_id", get(|| async { "<html>surprise</html>" }))
        .route("/login", post(|| async { Json(json!({ "session": "x" })) }));
    let base_url = serve(router).await;
    let client = client(&base_url, Duration::from_secs(5));

    assert!(matches!(
        client.fetch_next_question(&orphan_session()).await,
        Err(ClientError::Malformed(_))
    ));
    assert!(matches!(client.login("Ada").await, Err(ClientError::Malformed(_))));
}

#[tokio::test]
async fn test_completed_false_is_malformed() {
    let router = Router::new().route(
        "/questions/:session_id",
        get(|| async { Json(json!({ "completed": false })) }),
    );
    let base_url = serve(router).await;

    let result = client(&base_url, Duration::from_secs(5))
        .fetch_next_question(&orphan_session())
        .await;
    assert!(matches!(result, Err(ClientError::Malformed(_))));
}

#[tokio::test]
async fn test_unreachable_server() {
    // Grab a free port, then close it again
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client(&format!("http://{}", addr), Duration::from_secs(5));
    assert_eq!(client.login("Ada").await, Err(ClientError::Unreachable));
}

#[tokio::test]
async fn test_silent_server_times_out() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    // Accept connections and never answer
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let client = client(&format!("http://{}", addr), Duration::from_millis(200));
    assert_eq!(
        client.fetch_next_question(&orphan_session()).await,
        Err(ClientError::Timeout)
    );
}
