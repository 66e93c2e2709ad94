use thiserror::Error;
use tokio::sync::mpsc;

/// Failures reported by a speech recognition backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranscriptionError {
    /// The host has no speech recognition capability
    #[error("speech recognition is not supported on this host")]
    Unsupported,

    /// The recognizer failed while running
    #[error("speech recognition failed: {0}")]
    Runtime(String),
}

/// A single recognition hypothesis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechSegment {
    pub text: String,
    /// Final segments will not be revised by the recognizer
    pub is_final: bool,
}

impl SpeechSegment {
    pub fn interim(text: impl Into<String>) -> Self {
        Self { text: text.into(), is_final: false }
    }

    pub fn finalized(text: impl Into<String>) -> Self {
        Self { text: text.into(), is_final: true }
    }
}

/// Something the recognizer reported while running
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEvent {
    /// New segments, in the order the recognizer produced them
    Results(Vec<SpeechSegment>),
    /// Non-fatal runtime error; the stream stays open
    Error(String),
}

/// Live speech recognition backend trait
///
/// Implementations:
/// - `NatsTranscriber`: results published by an STT service over NATS
/// - `UnsupportedTranscriber`: hosts without speech recognition
#[async_trait::async_trait]
pub trait Transcriber: Send + Sync {
    /// Start recognising
    ///
    /// Returns a channel receiver of recognizer events
    async fn start(&self) -> Result<mpsc::Receiver<TranscriptEvent>, TranscriptionError>;

    /// Stop recognising. Nothing is sent on the event channel once this resolves.
    async fn stop(&self) -> Result<(), TranscriptionError>;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Stand-in for hosts that have no speech recognition at all
#[derive(Debug, Default)]
pub struct UnsupportedTranscriber;

#[async_trait::async_trait]
impl Transcriber for UnsupportedTranscriber {
    async fn start(&self) -> Result<mpsc::Receiver<TranscriptEvent>, TranscriptionError> {
        Err(TranscriptionError::Unsupported)
    }

    async fn stop(&self) -> Result<(), TranscriptionError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "unsupported"
    }
}
