//! Chunking decision for oversized transcription inputs.

use super::models::ChunkPlan;
use crate::config::ChunkingSettings;
use crate::error::Result;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Bytes per minute of audio produced by the extraction step
/// (128 kbps mono MP3). Used to estimate total duration from file size
/// without probing the codec.
pub const EXTRACTED_AUDIO_BYTES_PER_MINUTE: u64 = 960_000;

/// Decides whether an audio file must be split and computes chunk geometry.
#[derive(Debug, Clone)]
pub struct ChunkPlanner {
    max_single_call_bytes: u64,
    chunk_duration_seconds: f64,
    overlap_seconds: f64,
}

impl ChunkPlanner {
    /// Create a planner from chunking settings.
    pub fn new(settings: &ChunkingSettings) -> Self {
        Self {
            max_single_call_bytes: settings.max_single_call_bytes,
            chunk_duration_seconds: settings.chunk_duration_seconds,
            overlap_seconds: settings.overlap_seconds,
        }
    }

    /// Compute the chunk plan for an audio file.
    ///
    /// Reads only the file's byte size. A file at or under the single-call
    /// limit yields `needs_chunking = false`, which is a normal outcome,
    /// not an error.
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    pub async fn plan(&self, audio_path: &Path) -> Result<ChunkPlan> {
        let file_size_bytes = tokio::fs::metadata(audio_path).await?.len();

        if file_size_bytes <= self.max_single_call_bytes {
            debug!(
                "File is {} bytes, under the {} byte limit; no chunking",
                file_size_bytes, self.max_single_call_bytes
            );
            return Ok(ChunkPlan {
                needs_chunking: false,
                file_size_bytes,
                chunk_count: 0,
                chunk_duration_seconds: self.chunk_duration_seconds,
                overlap_seconds: self.overlap_seconds,
                estimated_total_duration: None,
            });
        }

        let estimated_minutes = file_size_bytes as f64 / EXTRACTED_AUDIO_BYTES_PER_MINUTE as f64;
        let chunk_minutes = self.chunk_duration_seconds / 60.0;
        let chunk_count = ((estimated_minutes / chunk_minutes).ceil() as usize).max(2);

        info!(
            "File is {} bytes (~{:.1} min); splitting into {} chunks of {:.0}s with {:.0}s overlap",
            file_size_bytes,
            estimated_minutes,
            chunk_count,
            self.chunk_duration_seconds,
            self.overlap_seconds
        );

        Ok(ChunkPlan {
            needs_chunking: true,
            file_size_bytes,
            chunk_count,
            chunk_duration_seconds: self.chunk_duration_seconds,
            overlap_seconds: self.overlap_seconds,
            estimated_total_duration: Some(estimated_minutes * 60.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn planner() -> ChunkPlanner {
        ChunkPlanner::new(&ChunkingSettings::default())
    }

    fn file_of_size(bytes: usize) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&vec![0u8; bytes]).unwrap();
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn test_small_file_needs_no_chunking() {
        let file = file_of_size(1024);
        let plan = planner().plan(file.path()).await.unwrap();

        assert!(!plan.needs_chunking);
        assert_eq!(plan.file_size_bytes, 1024);
        assert!(plan.estimated_total_duration.is_none());
    }

    #[tokio::test]
    async fn test_file_at_threshold_needs_no_chunking() {
        let settings = ChunkingSettings {
            max_single_call_bytes: 4096,
            ..Default::default()
        };
        let file = file_of_size(4096);
        let plan = ChunkPlanner::new(&settings).plan(file.path()).await.unwrap();

        assert!(!plan.needs_chunking);
    }

    #[tokio::test]
    async fn test_oversized_file_gets_at_least_two_chunks() {
        let settings = ChunkingSettings {
            max_single_call_bytes: 1024,
            ..Default::default()
        };
        // Tiny file over a tiny threshold: the estimate rounds to one
        // chunk, but the floor of two must hold.
        let file = file_of_size(2048);
        let plan = ChunkPlanner::new(&settings).plan(file.path()).await.unwrap();

        assert!(plan.needs_chunking);
        assert!(plan.chunk_count >= 2);
        assert!(plan.estimated_total_duration.is_some());
    }

    #[tokio::test]
    async fn test_thirty_mib_file_chunk_count() {
        // 30 MiB over the default 25 MiB threshold: ~32.8 estimated
        // minutes at 960 kB/min, so four 10-minute chunks.
        let file = file_of_size(30 * 1024 * 1024);
        let plan = planner().plan(file.path()).await.unwrap();

        assert!(plan.needs_chunking);
        assert_eq!(plan.chunk_count, 4);
        assert_eq!(plan.chunk_duration_seconds, 600.0);
        assert_eq!(plan.overlap_seconds, 30.0);
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let result = planner().plan(Path::new("/nonexistent/audio.mp3")).await;
        assert!(result.is_err());
    }
}
