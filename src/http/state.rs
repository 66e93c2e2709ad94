use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::session::Question;

/// The questions every interview goes through, in order
pub fn default_questions() -> Vec<Question> {
    [
        "Tell me about yourself and your background.",
        "What are your greatest strengths and weaknesses?",
        "Where do you see yourself in five years?",
        "Why do you want to work for our company?",
        "Tell me about a challenging situation at work and how you handled it.",
    ]
    .into_iter()
    .enumerate()
    .map(|(i, text)| Question {
        id: i as i64 + 1,
        text: text.to_string(),
    })
    .collect()
}

/// What happened to one question
#[derive(Debug, Clone)]
pub struct AnswerRecord {
    pub question_id: i64,
    pub transcript: String,
    pub audio_bytes: usize,
    /// Where the audio was written, if uploads are kept
    pub audio_path: Option<PathBuf>,
    pub skipped: bool,
    pub recorded_at: DateTime<Utc>,
}

/// One participant's progress
#[derive(Debug, Clone)]
pub struct InterviewRecord {
    pub name: String,
    /// Index into the question list
    pub current_question: usize,
    pub answers: Vec<AnswerRecord>,
}

/// Largest accepted request body, enough for several minutes of raw PCM
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Interviews in progress (session_id → record)
    pub sessions: Arc<RwLock<HashMap<String, InterviewRecord>>>,

    pub questions: Arc<Vec<Question>>,

    /// Directory for uploaded answers; `None` keeps them in memory only
    pub upload_dir: Option<PathBuf>,

    /// Request body limit applied to every route
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(questions: Vec<Question>, upload_dir: Option<PathBuf>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            questions: Arc::new(questions),
            upload_dir,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(default_questions(), None)
    }
}
