use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An authenticated participant, as issued by the backend on login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque token identifying the interview on the backend
    pub session_id: String,

    /// Name the participant logged in with
    pub display_name: String,
}

/// One interview prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub text: String,
}

/// Metric name → score (1–10), exactly as the backend sent it
pub type Scores = BTreeMap<String, u8>;

/// Result of a submitted answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub message: String,

    /// What was submitted as the transcript
    pub transcript: String,

    pub scores: Scores,
}
