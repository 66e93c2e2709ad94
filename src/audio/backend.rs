use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Failures reported by a recording backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// The user (or the host) refused microphone access
    #[error("microphone permission denied")]
    PermissionDenied,

    /// No usable capture device, or the device went away
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),
}

/// One fragment of captured audio, as emitted by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    /// Position of this fragment within its recording (0-indexed)
    pub sequence: u64,
    /// Opaque encoded audio bytes
    pub data: Vec<u8>,
    /// Milliseconds since the recording started
    pub timestamp_ms: u64,
}

/// Proof that microphone access was granted.
///
/// The state machine keeps this for the whole session and hands it back on
/// every `start`, so permission is only requested once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceHandle {
    /// Human-readable device name for logging
    pub label: String,
}

/// Configuration for recording backends
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// How often a fragment is emitted while capturing
    pub fragment_interval: Duration,
    /// Capacity of the fragment channel
    pub channel_capacity: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            fragment_interval: Duration::from_millis(200),
            channel_capacity: 64,
        }
    }
}

/// Microphone capture backend trait
///
/// Implementations:
/// - `FileRecorder`: replays a WAV file in real time (headless runs, demos)
/// - test fakes driven by channels
#[async_trait::async_trait]
pub trait Recorder: Send + Sync {
    /// Request access to the capture device.
    ///
    /// Calling this again after a grant must not prompt again.
    async fn arm(&self) -> Result<DeviceHandle, CaptureError>;

    /// Start capturing
    ///
    /// Returns a channel receiver that yields fragments in capture order.
    /// The sender side is dropped once `stop` has flushed the last fragment.
    async fn start(&self, device: &DeviceHandle) -> Result<mpsc::Receiver<AudioChunk>, CaptureError>;

    /// Stop capturing and wait until the last fragment has been emitted
    async fn stop(&self, device: &DeviceHandle) -> Result<(), CaptureError>;

    /// Assemble the concatenated fragments of one recording into the file
    /// that gets uploaded. Container formats whose fragments already form a
    /// complete file pass them through.
    async fn finish(&self, data: Vec<u8>) -> Result<Vec<u8>, CaptureError> {
        Ok(data)
    }

    /// MIME type of the finished file
    fn mime_type(&self) -> &str;

    /// File extension matching `mime_type`
    fn file_extension(&self) -> &str;

    /// Get backend name for logging
    fn name(&self) -> &str;
}
