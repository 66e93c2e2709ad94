use anyhow::{Context, Result};
use async_nats::Client;
use tracing::info;

pub struct NatsClient {
    client: Client,
    session_id: String,
}

impl NatsClient {
    /// Connect to NATS server
    pub async fn connect(url: &str, session_id: String) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self { client, session_id })
    }

    /// Interview session whose recognition results we care about
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Subscribe to recognition results and recognizer errors
    pub async fn subscribe_recognition(&self) -> Result<async_nats::Subscriber> {
        // The STT service publishes to stt.text.{partial,final} and stt.error.*
        // We filter by session_id in the message payload
        let subject = "stt.>";

        info!("Subscribing to recognition results on {}", subject);

        let subscriber = self.client.subscribe(subject)
            .await
            .context("Failed to subscribe to recognition results")?;

        info!("Subscribed to {}", subject);

        Ok(subscriber)
    }
}
