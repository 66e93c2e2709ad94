pub mod backend;
pub mod chunk;
pub mod file;

pub use backend::{AudioChunk, CaptureError, DeviceHandle, Recorder, RecorderConfig};
pub use chunk::ChunkCollector;
pub use file::{AudioFile, FileRecorder};
