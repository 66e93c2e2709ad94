use tracing::{debug, warn};

use super::backend::AudioChunk;

/// Ordered, append-only buffer of the fragments of one recording.
///
/// Fragments must arrive with strictly increasing sequence numbers; anything
/// else is a duplicate or a late straggler and is dropped. Once frozen the
/// collector accepts nothing more.
#[derive(Debug, Default)]
pub struct ChunkCollector {
    chunks: Vec<AudioChunk>,
    next_sequence: u64,
    frozen: bool,
}

impl ChunkCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment. Returns whether it was accepted.
    pub fn push(&mut self, chunk: AudioChunk) -> bool {
        if self.frozen {
            debug!("Dropping fragment {} received after freeze", chunk.sequence);
            return false;
        }

        if chunk.sequence < self.next_sequence {
            warn!(
                "Dropping out-of-order fragment {} (expected >= {})",
                chunk.sequence, self.next_sequence
            );
            return false;
        }

        self.next_sequence = chunk.sequence + 1;
        self.chunks.push(chunk);
        true
    }

    /// Stop accepting fragments. Calling this twice is harmless.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.chunks.iter().map(|c| c.data.len()).sum()
    }

    pub fn chunks(&self) -> &[AudioChunk] {
        &self.chunks
    }

    /// Freeze and hand over the fragments in capture order
    pub fn into_chunks(mut self) -> Vec<AudioChunk> {
        self.freeze();
        self.chunks
    }
}
