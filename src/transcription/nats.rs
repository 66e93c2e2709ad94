use futures::stream::StreamExt;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::backend::{SpeechSegment, TranscriptEvent, Transcriber, TranscriptionError};
use crate::nats::messages::{ERROR_SUBJECT_PREFIX, TRANSCRIPT_SUBJECT_PREFIX};
use crate::nats::{NatsClient, RecognitionErrorMessage, TranscriptMessage};

/// Receives recognition results that an STT service publishes over NATS
pub struct NatsTranscriber {
    nats_client: Arc<NatsClient>,
    channel_capacity: usize,
    forward_task: Mutex<Option<JoinHandle<()>>>,
}

impl NatsTranscriber {
    pub fn new(nats_client: Arc<NatsClient>, channel_capacity: usize) -> Self {
        Self {
            nats_client,
            channel_capacity,
            forward_task: Mutex::new(None),
        }
    }

    /// Translate one NATS message into an event for `session_id`.
    ///
    /// Messages for other sessions, unknown subjects and unparseable payloads
    /// yield `None`.
    pub fn route_message(subject: &str, payload: &[u8], session_id: &str) -> Option<TranscriptEvent> {
        if subject.starts_with(TRANSCRIPT_SUBJECT_PREFIX) {
            match serde_json::from_slice::<TranscriptMessage>(payload) {
                Ok(msg) if msg.session_id == session_id => Some(TranscriptEvent::Results(vec![SpeechSegment {
                    text: msg.text,
                    is_final: !msg.partial,
                }])),
                Ok(_) => None,
                Err(e) => {
                    warn!("Failed to parse transcript message: {}", e);
                    None
                }
            }
        } else if subject.starts_with(ERROR_SUBJECT_PREFIX) {
            match serde_json::from_slice::<RecognitionErrorMessage>(payload) {
                Ok(msg) if msg.session_id == session_id => Some(TranscriptEvent::Error(msg.error)),
                Ok(_) => None,
                Err(e) => {
                    warn!("Failed to parse recognition error message: {}", e);
                    None
                }
            }
        } else {
            debug!("Ignoring message on {}", subject);
            None
        }
    }
}

#[async_trait::async_trait]
impl Transcriber for NatsTranscriber {
    async fn start(&self) -> Result<mpsc::Receiver<TranscriptEvent>, TranscriptionError> {
        let mut task = self.forward_task.lock().await;
        if task.is_some() {
            return Err(TranscriptionError::Runtime("recognition already running".to_string()));
        }

        let mut subscriber = self
            .nats_client
            .subscribe_recognition()
            .await
            .map_err(|e| TranscriptionError::Runtime(format!("{:#}", e)))?;

        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let session_id = self.nats_client.session_id().to_string();

        *task = Some(tokio::spawn(async move {
            info!("Recognition forwarding task started");

            while let Some(msg) = subscriber.next().await {
                let subject = msg.subject.to_string();
                if let Some(event) = NatsTranscriber::route_message(&subject, &msg.payload, &session_id) {
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
            }

            info!("Recognition forwarding task stopped");
        }));

        Ok(rx)
    }

    async fn stop(&self) -> Result<(), TranscriptionError> {
        let Some(task) = self.forward_task.lock().await.take() else {
            return Ok(());
        };

        // The subscription never ends on its own, so cancel the task outright.
        // Awaiting it guarantees the sender has been dropped.
        task.abort();
        match task.await {
            Ok(()) => Ok(()),
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => Err(TranscriptionError::Runtime(e.to_string())),
        }
    }

    fn name(&self) -> &str {
        "NATS speech recognition"
    }
}
