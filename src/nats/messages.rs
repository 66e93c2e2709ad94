use serde::{Deserialize, Serialize};

/// Subject prefix for recognition results (`stt.text.partial`, `stt.text.final`)
pub const TRANSCRIPT_SUBJECT_PREFIX: &str = "stt.text.";

/// Subject prefix for recognizer failures
pub const ERROR_SUBJECT_PREFIX: &str = "stt.error.";

/// Transcript message received from STT service
#[derive(Debug, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub session_id: String,
    pub text: String,
    pub partial: bool,
    pub timestamp: String,
    #[serde(default)]
    pub confidence: Option<f32>,
}

/// Error reported by the STT service while recognising a session
#[derive(Debug, Serialize, Deserialize)]
pub struct RecognitionErrorMessage {
    pub session_id: String,
    pub error: String,
}
