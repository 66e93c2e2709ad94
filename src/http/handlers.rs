use super::state::{AnswerRecord, AppState, InterviewRecord};
use crate::client::messages::{ErrorBody, LoginRequest, LoginResponse, QuestionResponse, StatusResponse};
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct LoginAccepted {
    pub status: String,
    #[serde(flatten)]
    pub login: LoginResponse,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            detail: None,
            error: Some(message.into()),
        }),
    )
        .into_response()
}

fn ok_response(message: &str) -> Response {
    (
        StatusCode::OK,
        Json(StatusResponse {
            status: "ok".to_string(),
            message: Some(message.to_string()),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /login
/// Start a new interview
pub async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> impl IntoResponse {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Name is required");
    }

    let session_id = format!("session_{}", uuid::Uuid::new_v4().simple());

    {
        let mut sessions = state.sessions.write().await;
        sessions.insert(
            session_id.clone(),
            InterviewRecord {
                name: name.clone(),
                current_question: 0,
                answers: Vec::new(),
            },
        );
    }

    info!("Interview started for {} ({})", name, session_id);

    (
        StatusCode::OK,
        Json(LoginAccepted {
            status: "ok".to_string(),
            login: LoginResponse { session_id, name },
        }),
    )
        .into_response()
}

/// GET /questions/:session_id
/// Next unanswered question, or the completion marker
pub async fn get_question(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let sessions = state.sessions.read().await;

    let Some(record) = sessions.get(&session_id) else {
        return error_response(StatusCode::NOT_FOUND, "Invalid session");
    };

    match state.questions.get(record.current_question) {
        Some(question) => (
            StatusCode::OK,
            Json(QuestionResponse::Question(question.clone())),
        )
            .into_response(),
        None => (
            StatusCode::OK,
            Json(QuestionResponse::Completed { completed: true }),
        )
            .into_response(),
    }
}

/// POST /submit/:session_id
/// Record an answer: multipart `answer` (audio file) and `transcript`
pub async fn submit_answer(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    if !state.sessions.read().await.contains_key(&session_id) {
        return error_response(StatusCode::NOT_FOUND, "Invalid session");
    }

    let mut audio: Option<(String, Vec<u8>)> = None;
    let mut transcript = String::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!("Malformed multipart body: {}", e);
                return error_response(StatusCode::BAD_REQUEST, format!("Malformed form data: {}", e));
            }
        };

        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("answer") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                match field.bytes().await {
                    Ok(bytes) => audio = Some((file_name, bytes.to_vec())),
                    Err(e) => {
                        return error_response(StatusCode::BAD_REQUEST, format!("Failed to read audio: {}", e))
                    }
                }
            }
            Some("transcript") => match field.text().await {
                Ok(text) => transcript = text,
                Err(e) => {
                    return error_response(StatusCode::BAD_REQUEST, format!("Failed to read transcript: {}", e))
                }
            },
            _ => {}
        }
    }

    let Some((file_name, bytes)) = audio else {
        return error_response(StatusCode::BAD_REQUEST, "No audio file provided");
    };
    if file_name.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No selected file");
    }

    let index = {
        let sessions = state.sessions.read().await;
        let Some(record) = sessions.get(&session_id) else {
            return error_response(StatusCode::NOT_FOUND, "Invalid session");
        };
        record.current_question
    };
    let Some(question) = state.questions.get(index) else {
        return error_response(StatusCode::CONFLICT, "Interview already completed");
    };

    // Saved without holding the session lock
    let audio_path = match &state.upload_dir {
        Some(dir) => {
            let extension = std::path::Path::new(&file_name)
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("webm");
            let path = dir.join(format!("{}_q{}.{}", session_id, index, extension));
            if let Err(e) = tokio::fs::write(&path, &bytes).await {
                error!("Failed to save answer to {}: {}", path.display(), e);
                return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save answer");
            }
            Some(path)
        }
        None => None,
    };

    let mut sessions = state.sessions.write().await;
    let Some(record) = sessions.get_mut(&session_id) else {
        return error_response(StatusCode::NOT_FOUND, "Invalid session");
    };
    if record.current_question != index {
        warn!("Question {} for {} was answered while uploading", question.id, session_id);
        return error_response(StatusCode::CONFLICT, "Question was already answered");
    }

    info!(
        "Answer to question {} recorded for {} ({} bytes)",
        question.id,
        session_id,
        bytes.len()
    );

    record.answers.push(AnswerRecord {
        question_id: question.id,
        transcript,
        audio_bytes: bytes.len(),
        audio_path,
        skipped: false,
        recorded_at: Utc::now(),
    });
    record.current_question += 1;

    ok_response("Answer recorded successfully")
}

/// POST /skip/:session_id
/// Skip the current question
pub async fn skip_question(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let mut sessions = state.sessions.write().await;

    let Some(record) = sessions.get_mut(&session_id) else {
        return error_response(StatusCode::NOT_FOUND, "Invalid session");
    };
    let Some(question) = state.questions.get(record.current_question) else {
        return error_response(StatusCode::CONFLICT, "Interview already completed");
    };

    info!("Question {} skipped for {}", question.id, session_id);

    record.answers.push(AnswerRecord {
        question_id: question.id,
        transcript: "Question skipped".to_string(),
        audio_bytes: 0,
        audio_path: None,
        skipped: true,
        recorded_at: Utc::now(),
    });
    record.current_question += 1;

    ok_response("Question skipped")
}

/// GET /
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(StatusResponse {
            status: "ok".to_string(),
            message: None,
        }),
    )
}
