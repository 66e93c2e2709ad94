use thiserror::Error;

use crate::audio::CaptureError;
use crate::client::ClientError;
use crate::transcription::TranscriptionError;

/// User-facing failure of an interview step.
///
/// Adapter and client errors are folded into this taxonomy at the state
/// machine boundary; the `Display` text is what the presentation layer shows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterviewError {
    #[error("Please allow microphone access to record your answer.")]
    PermissionDenied,

    #[error("No microphone is available: {0}")]
    DeviceUnavailable(String),

    #[error("Live transcription is not supported here; your audio is still being recorded.")]
    TranscriptionUnsupported,

    #[error("Error with speech recognition: {0}")]
    TranscriptionRuntimeError(String),

    #[error("The request timed out. Is the server running?")]
    NetworkTimeout,

    #[error("Could not connect to the interview server.")]
    NetworkUnreachable,

    #[error("The server rejected the request: {0}")]
    ServerRejected(String),

    #[error("The server sent a response that could not be understood.")]
    MalformedResponse,

    #[error("'{intent}' is not available while {state}")]
    InvalidIntent { intent: String, state: String },
}

impl From<ClientError> for InterviewError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Timeout => Self::NetworkTimeout,
            ClientError::Unreachable => Self::NetworkUnreachable,
            ClientError::ServerError(detail) => Self::ServerRejected(detail),
            ClientError::InvalidRequest(reason) => Self::ServerRejected(reason),
            ClientError::Malformed(_) => Self::MalformedResponse,
        }
    }
}

impl From<CaptureError> for InterviewError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::PermissionDenied => Self::PermissionDenied,
            CaptureError::DeviceUnavailable(reason) => Self::DeviceUnavailable(reason),
        }
    }
}

impl From<TranscriptionError> for InterviewError {
    fn from(err: TranscriptionError) -> Self {
        match err {
            TranscriptionError::Unsupported => Self::TranscriptionUnsupported,
            TranscriptionError::Runtime(reason) => Self::TranscriptionRuntimeError(reason),
        }
    }
}
