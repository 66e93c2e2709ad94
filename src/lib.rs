pub mod audio;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod nats;
pub mod session;
pub mod transcription;

pub use audio::{AudioChunk, AudioFile, CaptureError, ChunkCollector, DeviceHandle, FileRecorder, Recorder, RecorderConfig};
pub use client::{AnswerSubmission, ClientConfig, ClientError, InterviewBackend, SessionClient, SubmitResponse};
pub use config::Config;
pub use error::InterviewError;
pub use http::{create_router, AppState};
pub use nats::{NatsClient, TranscriptMessage};
pub use session::{
    Feedback, Intent, InterviewMachine, MachineConfig, Question, Session, SessionStatus, ViewModel,
};
pub use transcription::{
    NatsTranscriber, SpeechSegment, TranscriptEvent, Transcriber, TranscriptionError, UnsupportedTranscriber,
};
