//! Reference interview backend
//!
//! An in-memory implementation of the API the session client talks to:
//! - POST /login - Start an interview
//! - GET /questions/:session_id - Next question, or `{completed: true}`
//! - POST /submit/:session_id - Record an answer (multipart `answer` + `transcript`)
//! - POST /skip/:session_id - Skip the current question
//! - GET / - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::{default_questions, AnswerRecord, AppState, InterviewRecord, DEFAULT_MAX_UPLOAD_BYTES};
