use std::time::Duration;

/// Configuration for an interview state machine
#[derive(Debug, Clone)]
pub struct MachineConfig {
    /// Period of the recording timer (one second in production)
    pub tick_interval: Duration,

    /// Uploaded file name without extension; the recorder supplies that
    pub answer_file_stem: String,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            answer_file_stem: "answer".to_string(),
        }
    }
}
