//! Parallel fan-out of chunk transcription calls.

use super::chunker::ChunkSet;
use super::models::ChunkResult;
use super::Transcriber;
use crate::error::{KlippError, Result};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, instrument};

/// Dispatches one remote transcription call per chunk, all at once.
///
/// Chunk counts are small (typically under ten), so concurrency is bounded
/// only by the number of chunks. Each call carries its own network timeout
/// from the underlying client.
pub struct TranscriptionExecutor {
    transcriber: Arc<dyn Transcriber>,
}

impl TranscriptionExecutor {
    pub fn new(transcriber: Arc<dyn Transcriber>) -> Self {
        Self { transcriber }
    }

    /// Transcribe every chunk concurrently and return results in ascending
    /// chunk-index order.
    ///
    /// If any call fails, the whole batch fails with one aggregate error
    /// naming every failed chunk index. A transcript with silent timeline
    /// gaps is worse than an explicit failure, so no partial success is
    /// ever returned.
    #[instrument(skip_all, fields(chunks = chunk_set.len()))]
    pub async fn run(&self, chunk_set: &ChunkSet) -> Result<Vec<ChunkResult>> {
        info!("Dispatching {} chunk transcription calls", chunk_set.len());

        let futures = chunk_set.chunks().iter().map(|chunk| {
            let transcriber = self.transcriber.clone();
            async move {
                let result = transcriber.transcribe(&chunk.path).await;
                (chunk, result)
            }
        });

        let outcomes = join_all(futures).await;

        let mut results = Vec::with_capacity(outcomes.len());
        let mut errors = Vec::new();

        for (chunk, outcome) in outcomes {
            match outcome {
                Ok(transcription) => results.push(ChunkResult {
                    chunk_index: chunk.index,
                    start_offset_seconds: chunk.start_offset_seconds,
                    end_offset_seconds: chunk.end_offset_seconds,
                    overlap_start_seconds: chunk.overlap_start_seconds,
                    transcription,
                }),
                Err(e) => errors.push(format!("chunk {}: {}", chunk.index, e)),
            }
        }

        if !errors.is_empty() {
            return Err(KlippError::Transcription(format!(
                "Transcription failed for {} chunk(s): {}",
                errors.len(),
                errors.join("; ")
            )));
        }

        // Dispatch order must not be assumed to equal completion order.
        results.sort_by_key(|r| r.chunk_index);

        Ok(results)
    }
}
