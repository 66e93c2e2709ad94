use serde::Serialize;

use super::model::{Feedback, Question};

/// Where the interview is, as seen by the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Loading,
    AwaitingAnswer,
    AwaitingPermission,
    Recording,
    Stopping,
    Submitting,
    ShowingFeedback,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::AwaitingAnswer => "awaiting answer",
            Self::AwaitingPermission => "awaiting microphone permission",
            Self::Recording => "recording",
            Self::Stopping => "stopping",
            Self::Submitting => "submitting",
            Self::ShowingFeedback => "showing feedback",
            Self::Completed => "completed",
        }
    }
}

/// Capture status of the current answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingStatus {
    Idle,
    AwaitingPermission,
    Recording,
    Stopping,
}

/// The one thing the main panel shows
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisplayState {
    Loading,
    Question { question: Question },
    Feedback { question_id: i64, feedback: Feedback },
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordingView {
    pub status: RecordingStatus,
    pub elapsed_seconds: u64,
    /// `m:ss`
    pub elapsed_label: String,
    pub chunk_count: usize,
    pub live_transcript: String,
    /// Unstable hypothesis, shown after the live transcript
    pub interim_transcript: String,
}

impl RecordingView {
    pub fn idle() -> Self {
        Self {
            status: RecordingStatus::Idle,
            elapsed_seconds: 0,
            elapsed_label: format_elapsed(0),
            chunk_count: 0,
            live_transcript: String::new(),
            interim_transcript: String::new(),
        }
    }
}

/// Which intents the machine would accept right now
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Actions {
    pub start: bool,
    pub stop: bool,
    pub skip: bool,
    pub next: bool,
    pub retry: bool,
    pub cancel: bool,
}

/// Read-only projection of the state machine
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewModel {
    pub status: SessionStatus,
    pub participant: String,
    pub display: DisplayState,
    pub recording: RecordingView,
    pub error: Option<String>,
    pub actions: Actions,
}

/// Format seconds as `m:ss`
pub fn format_elapsed(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(0), "0:00");
        assert_eq!(format_elapsed(9), "0:09");
        assert_eq!(format_elapsed(75), "1:15");
        assert_eq!(format_elapsed(600), "10:00");
    }

    #[test]
    fn test_display_serializes_with_kind_tag() {
        let display = DisplayState::Question {
            question: Question {
                id: 1,
                text: "Tell me about yourself".to_string(),
            },
        };
        let json = serde_json::to_value(&display).unwrap();
        assert_eq!(json["kind"], "question");
        assert_eq!(json["question"]["id"], 1);
    }
}
