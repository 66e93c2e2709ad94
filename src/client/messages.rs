//! Wire types for the interview backend's JSON API

use serde::{Deserialize, Serialize};

use crate::session::{Question, Scores};

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub session_id: String,
    pub name: String,
}

/// `GET /questions/{session_id}` returns either the next question or a
/// completion marker
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuestionResponse {
    Question(Question),
    Completed { completed: bool },
}

/// Response to `POST /submit/{session_id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Scores are optional; the reference backend does not grade answers
    #[serde(default, skip_serializing_if = "Scores::is_empty")]
    pub scores: Scores,
}

impl SubmitResponse {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Generic `{status, message}` acknowledgement
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Error body; FastAPI-style backends send `detail`, the reference backend `error`
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn into_detail(self) -> Option<String> {
        self.detail.or(self.error)
    }
}
