use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::{Response, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::messages::{ErrorBody, LoginRequest, LoginResponse, QuestionResponse, StatusResponse, SubmitResponse};
use crate::session::{Question, Session};

/// Classified failure of a backend call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("request timed out")]
    Timeout,

    #[error("server rejected the request: {0}")]
    ServerError(String),

    #[error("server unreachable")]
    Unreachable,

    #[error("malformed response: {0}")]
    Malformed(String),

    /// Rejected locally, nothing was sent
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Malformed(err.to_string())
        } else if err.is_builder() {
            Self::InvalidRequest(err.to_string())
        } else {
            // Connection refused, DNS failures, resets mid-request
            Self::Unreachable
        }
    }
}

/// An answer ready to be uploaded
#[derive(Debug, Clone)]
pub struct AnswerSubmission {
    /// Concatenated audio fragments
    pub audio: Vec<u8>,
    pub mime_type: String,
    pub file_name: String,
    pub transcript: String,
}

/// Connection settings for the session client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            request_timeout: Duration::from_secs(5),
        }
    }
}

/// The backend operations the interview depends on
#[async_trait::async_trait]
pub trait InterviewBackend: Send + Sync {
    async fn login(&self, name: &str) -> Result<Session, ClientError>;

    /// `Ok(None)` once every question has been answered or skipped
    async fn fetch_next_question(&self, session: &Session) -> Result<Option<Question>, ClientError>;

    async fn submit_answer(
        &self,
        session: &Session,
        answer: AnswerSubmission,
    ) -> Result<SubmitResponse, ClientError>;

    async fn skip_question(&self, session: &Session) -> Result<(), ClientError>;
}

/// HTTP client for the interview backend
#[derive(Debug, Clone)]
pub struct SessionClient {
    http: reqwest::Client,
    base_url: Url,
}

impl SessionClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .with_context(|| format!("Invalid backend URL: {}", config.base_url))?;

        if base_url.cannot_be_a_base() {
            anyhow::bail!("Backend URL cannot have paths: {}", config.base_url);
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        info!("Session client targeting {}", base_url);

        Ok(Self { http, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ClientError::InvalidRequest(format!("cannot extend {}", self.base_url)))?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    fn session_endpoint(&self, action: &str, session: &Session) -> Result<Url, ClientError> {
        if session.session_id.trim().is_empty() {
            return Err(ClientError::InvalidRequest("session id is empty".to_string()));
        }
        self.endpoint(&[action, &session.session_id])
    }

    /// Turn a response into a typed payload, classifying failures
    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let detail = serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .and_then(ErrorBody::into_detail)
                .unwrap_or_else(|| format!("HTTP {}", status));
            warn!("Backend returned {}: {}", status, detail);
            return Err(ClientError::ServerError(detail));
        }

        serde_json::from_slice(&body).map_err(|e| ClientError::Malformed(e.to_string()))
    }
}

#[async_trait::async_trait]
impl InterviewBackend for SessionClient {
    async fn login(&self, name: &str) -> Result<Session, ClientError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ClientError::InvalidRequest("name is required".to_string()));
        }

        let url = self.endpoint(&["login"])?;
        debug!("POST {}", url);

        let response = self
            .http
            .post(url)
            .json(&LoginRequest { name: name.to_string() })
            .send()
            .await?;

        let login: LoginResponse = Self::read_json(response).await?;
        if login.session_id.is_empty() {
            return Err(ClientError::Malformed("empty session_id".to_string()));
        }

        info!("Logged in as {} ({})", login.name, login.session_id);

        Ok(Session {
            session_id: login.session_id,
            display_name: login.name,
        })
    }

    async fn fetch_next_question(&self, session: &Session) -> Result<Option<Question>, ClientError> {
        let url = self.session_endpoint("questions", session)?;
        debug!("GET {}", url);

        let response = self.http.get(url).send().await?;

        match Self::read_json::<QuestionResponse>(response).await? {
            QuestionResponse::Question(question) => Ok(Some(question)),
            QuestionResponse::Completed { completed: true } => Ok(None),
            QuestionResponse::Completed { completed: false } => Err(ClientError::Malformed(
                "completed=false without a question".to_string(),
            )),
        }
    }

    async fn submit_answer(
        &self,
        session: &Session,
        answer: AnswerSubmission,
    ) -> Result<SubmitResponse, ClientError> {
        let url = self.session_endpoint("submit", session)?;
        debug!(
            "POST {} ({} audio bytes, {} transcript chars)",
            url,
            answer.audio.len(),
            answer.transcript.len()
        );

        let audio = Part::bytes(answer.audio)
            .file_name(answer.file_name)
            .mime_str(&answer.mime_type)
            .map_err(|e| ClientError::InvalidRequest(e.to_string()))?;

        let form = Form::new()
            .part("answer", audio)
            .text("transcript", answer.transcript);

        let response = self.http.post(url).multipart(form).send().await?;

        Self::read_json(response).await
    }

    async fn skip_question(&self, session: &Session) -> Result<(), ClientError> {
        let url = self.session_endpoint("skip", session)?;
        debug!("POST {}", url);

        let response = self.http.post(url).send().await?;

        let ack: StatusResponse = Self::read_json(response).await?;
        if ack.status != "ok" {
            return Err(ClientError::ServerError(
                ack.message.unwrap_or_else(|| "Failed to skip question".to_string()),
            ));
        }

        Ok(())
    }
}
