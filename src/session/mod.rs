//! Interview session state machine
//!
//! This module provides the `InterviewMachine` that drives one candidate
//! through the interview:
//! - Question retrieval, skipping and completion
//! - Microphone permission and capture lifecycle
//! - Live transcript accumulation and the recording timer
//! - Answer submission and feedback
//! - Error overlay and recovery to a state the user can retry from

mod config;
mod machine;
mod model;
mod view;

pub use config::MachineConfig;
pub use machine::{Intent, InterviewMachine};
pub use model::{Feedback, Question, Scores, Session};
pub use view::{format_elapsed, Actions, DisplayState, RecordingStatus, RecordingView, SessionStatus, ViewModel};
