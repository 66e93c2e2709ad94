//! Live speech recognition adapters
//!
//! A `Transcriber` streams `TranscriptEvent`s while the candidate speaks;
//! `TranscriptAccumulator` turns those into the live transcript.

mod accumulator;
mod backend;
mod nats;

pub use accumulator::TranscriptAccumulator;
pub use backend::{SpeechSegment, TranscriptEvent, Transcriber, TranscriptionError, UnsupportedTranscriber};
pub use nats::NatsTranscriber;
