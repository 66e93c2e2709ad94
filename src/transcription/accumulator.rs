use super::backend::SpeechSegment;

/// Builds the live transcript of one recording from streamed result batches.
///
/// Finalized segments are kept in the order they were finalized; interim
/// segments only live until the next batch replaces them.
#[derive(Debug, Default, Clone)]
pub struct TranscriptAccumulator {
    finalized: Vec<String>,
    interim: String,
}

impl TranscriptAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one batch in. Returns whether the finalized transcript changed.
    pub fn apply(&mut self, batch: &[SpeechSegment]) -> bool {
        let before = self.finalized.len();
        let mut interim = Vec::new();

        for segment in batch {
            let text = segment.text.trim();
            if text.is_empty() {
                continue;
            }
            if segment.is_final {
                self.finalized.push(text.to_string());
            } else {
                interim.push(text);
            }
        }

        self.interim = interim.join(" ");
        self.finalized.len() != before
    }

    /// Finalized utterance so far
    pub fn live_transcript(&self) -> String {
        self.finalized.join(" ")
    }

    /// Latest unstable hypothesis, for display only
    pub fn interim(&self) -> &str {
        &self.interim
    }

    pub fn finalized_count(&self) -> usize {
        self.finalized.len()
    }
}
