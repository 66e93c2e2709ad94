use anyhow::{Context, Result};
use hound::{WavReader, WavWriter};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{error, info, warn};

use super::backend::{AudioChunk, CaptureError, DeviceHandle, Recorder, RecorderConfig};

#[derive(Debug)]
pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path)
            .context("Failed to open WAV file")?;

        let spec = reader.spec();
        if spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
            anyhow::bail!(
                "Expected 16-bit PCM, got {}-bit {:?}",
                spec.bits_per_sample,
                spec.sample_format
            );
        }

        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let duration_seconds = samples.len() as f64 /
            (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    /// Number of interleaved samples covering `millis` of audio
    pub fn samples_for_millis(&self, millis: u64) -> usize {
        (self.sample_rate as u64 * self.channels as u64 * millis / 1000) as usize
    }

    /// Wrap little-endian PCM captured from this file in a WAV header
    pub fn encode_wav(&self, pcm: &[u8]) -> Result<Vec<u8>> {
        let spec = hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::with_capacity(pcm.len() + 44));
        let mut writer = WavWriter::new(&mut cursor, spec).context("Failed to start WAV stream")?;
        for sample in pcm.chunks_exact(2) {
            writer
                .write_sample(i16::from_le_bytes([sample[0], sample[1]]))
                .context("Failed to write sample")?;
        }
        writer.finalize().context("Failed to finalize WAV stream")?;

        Ok(cursor.into_inner())
    }
}

/// Recorder that plays a WAV file back in real time as if it were a microphone.
///
/// The file is loaded once, on the first successful `arm`. Every recording
/// replays it from the beginning; once the file runs out the recorder keeps
/// the stream open but emits nothing until stopped.
pub struct FileRecorder {
    path: PathBuf,
    config: RecorderConfig,
    audio: Mutex<Option<Arc<AudioFile>>>,
    capture: Mutex<Option<ActiveCapture>>,
}

struct ActiveCapture {
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl FileRecorder {
    pub fn new(path: impl Into<PathBuf>, config: RecorderConfig) -> Self {
        Self {
            path: path.into(),
            config,
            audio: Mutex::new(None),
            capture: Mutex::new(None),
        }
    }

    fn label(&self) -> String {
        format!("wav:{}", self.path.display())
    }

    async fn replay(
        audio: Arc<AudioFile>,
        interval: std::time::Duration,
        tx: mpsc::Sender<AudioChunk>,
        mut stop_rx: oneshot::Receiver<()>,
    ) {
        let started = Instant::now();
        let mut ticker = interval_at(started + interval, interval);
        let mut last_emit = started;
        let mut offset = 0usize;
        let mut sequence = 0u64;

        loop {
            tokio::select! {
                _ = &mut stop_rx => break,
                _ = ticker.tick() => {
                    let now = Instant::now();
                    let wanted = audio.samples_for_millis(now.duration_since(last_emit).as_millis() as u64);
                    last_emit = now;

                    if let Some(chunk) = Self::take(&audio, &mut offset, wanted, &mut sequence, started, now) {
                        if tx.send(chunk).await.is_err() {
                            warn!("Fragment receiver dropped, ending replay");
                            return;
                        }
                    }
                }
            }
        }

        // Flush whatever was "heard" between the last tick and the stop request
        let now = Instant::now();
        let wanted = audio.samples_for_millis(now.duration_since(last_emit).as_millis() as u64);
        if let Some(chunk) = Self::take(&audio, &mut offset, wanted, &mut sequence, started, now) {
            if tx.send(chunk).await.is_err() {
                warn!("Fragment receiver dropped before final flush");
            }
        }

        info!("File replay stopped after {} fragments", sequence);
    }

    fn take(
        audio: &AudioFile,
        offset: &mut usize,
        wanted: usize,
        sequence: &mut u64,
        started: Instant,
        now: Instant,
    ) -> Option<AudioChunk> {
        let end = (*offset + wanted).min(audio.samples.len());
        if end <= *offset {
            return None;
        }

        // Convert to PCM bytes
        let data: Vec<u8> = audio.samples[*offset..end]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();
        *offset = end;

        let chunk = AudioChunk {
            sequence: *sequence,
            data,
            timestamp_ms: now.duration_since(started).as_millis() as u64,
        };
        *sequence += 1;
        Some(chunk)
    }
}

#[async_trait::async_trait]
impl Recorder for FileRecorder {
    async fn arm(&self) -> Result<DeviceHandle, CaptureError> {
        let mut audio = self.audio.lock().await;
        if audio.is_none() {
            let path = self.path.clone();
            let loaded = tokio::task::spawn_blocking(move || AudioFile::open(path))
                .await
                .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?
                .map_err(|e| CaptureError::DeviceUnavailable(format!("{:#}", e)))?;
            *audio = Some(Arc::new(loaded));
        }

        Ok(DeviceHandle { label: self.label() })
    }

    async fn start(&self, device: &DeviceHandle) -> Result<mpsc::Receiver<AudioChunk>, CaptureError> {
        let audio = self
            .audio
            .lock()
            .await
            .clone()
            .ok_or_else(|| CaptureError::DeviceUnavailable("recorder was never armed".to_string()))?;

        let mut capture = self.capture.lock().await;
        if capture.is_some() {
            return Err(CaptureError::DeviceUnavailable(format!("{} is already capturing", device.label)));
        }

        info!("Starting file replay from {}", device.label);

        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(Self::replay(audio, self.config.fragment_interval, tx, stop_rx));

        *capture = Some(ActiveCapture { stop_tx, task });

        Ok(rx)
    }

    async fn stop(&self, device: &DeviceHandle) -> Result<(), CaptureError> {
        let active = self.capture.lock().await.take();

        let Some(active) = active else {
            return Ok(());
        };

        info!("Stopping file replay from {}", device.label);

        // The task may already have exited if its receiver was dropped
        let _ = active.stop_tx.send(());
        if let Err(e) = active.task.await {
            error!("File replay task panicked: {}", e);
            return Err(CaptureError::DeviceUnavailable(e.to_string()));
        }

        Ok(())
    }

    async fn finish(&self, data: Vec<u8>) -> Result<Vec<u8>, CaptureError> {
        let audio = self
            .audio
            .lock()
            .await
            .clone()
            .ok_or_else(|| CaptureError::DeviceUnavailable("recorder was never armed".to_string()))?;

        audio
            .encode_wav(&data)
            .map_err(|e| CaptureError::DeviceUnavailable(format!("{:#}", e)))
    }

    fn mime_type(&self) -> &str {
        "audio/wav"
    }

    fn file_extension(&self) -> &str {
        "wav"
    }

    fn name(&self) -> &str {
        "WAV file replay"
    }
}
