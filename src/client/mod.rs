//! Typed boundary to the interview backend
//!
//! - POST /login - Start an interview
//! - GET /questions/:session_id - Next question, or completion
//! - POST /submit/:session_id - Upload an answer (multipart)
//! - POST /skip/:session_id - Skip the current question

mod client;
pub mod messages;

pub use client::{AnswerSubmission, ClientConfig, ClientError, InterviewBackend, SessionClient};
pub use messages::SubmitResponse;
