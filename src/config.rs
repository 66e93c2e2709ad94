use anyhow::{ensure, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::audio::RecorderConfig;
use crate::client::ClientConfig;
use crate::http::DEFAULT_MAX_UPLOAD_BYTES;
use crate::session::MachineConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub backend: BackendConfig,
    pub audio: AudioConfig,
    pub transcription: TranscriptionConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    pub fragment_interval_ms: u64,
    /// Uploaded file name without extension; the recorder supplies that
    pub answer_file_stem: String,
    /// WAV file replayed as the microphone
    #[serde(default)]
    pub replay_file: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionProvider {
    Nats,
    None,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptionConfig {
    pub provider: TranscriptionProvider,
    pub nats_url: String,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    #[serde(default)]
    pub upload_dir: Option<String>,
    pub max_upload_bytes: usize,
}

impl Config {
    /// Load `path` (any format the `config` crate knows, extension optional)
    /// over built-in defaults, then apply `MOCK_INTERVIEW__SECTION__KEY`
    /// environment overrides.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("service.name", "mock-interview")?
            .set_default("backend.base_url", "http://localhost:8080")?
            .set_default("backend.request_timeout_ms", 5000_i64)?
            .set_default("audio.fragment_interval_ms", 200_i64)?
            .set_default("audio.answer_file_stem", "answer")?
            .set_default("transcription.provider", "none")?
            .set_default("transcription.nats_url", "nats://localhost:4222")?
            .set_default("server.bind", "127.0.0.1")?
            .set_default("server.port", 8080_i64)?
            .set_default("server.max_upload_bytes", DEFAULT_MAX_UPLOAD_BYTES as i64)?
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("MOCK_INTERVIEW").separator("__"))
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        ensure!(
            cfg.audio.fragment_interval_ms > 0,
            "audio.fragment_interval_ms must be greater than zero"
        );
        ensure!(
            cfg.server.max_upload_bytes > 0,
            "server.max_upload_bytes must be greater than zero"
        );

        Ok(cfg)
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.backend.base_url.clone(),
            request_timeout: Duration::from_millis(self.backend.request_timeout_ms),
        }
    }

    pub fn recorder_config(&self) -> RecorderConfig {
        RecorderConfig {
            fragment_interval: Duration::from_millis(self.audio.fragment_interval_ms),
            ..RecorderConfig::default()
        }
    }

    pub fn machine_config(&self) -> MachineConfig {
        MachineConfig {
            answer_file_stem: self.audio.answer_file_stem.clone(),
            ..MachineConfig::default()
        }
    }
}
