//! Physical chunk extraction with scoped cleanup.

use super::models::ChunkPlan;
use crate::error::{KlippError, Result};
use crate::media::MediaTool;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, info, instrument};

/// One extracted chunk file, positioned on the global timeline.
#[derive(Debug, Clone)]
pub struct ExtractedChunk {
    /// Zero-based chunk index.
    pub index: usize,
    /// Path to the chunk audio file.
    pub path: PathBuf,
    /// Global time at which this chunk's audio begins.
    pub start_offset_seconds: f64,
    /// Global time at which this chunk's audio ends.
    pub end_offset_seconds: f64,
    /// Global time at which this chunk's leading overlap begins.
    pub overlap_start_seconds: f64,
}

/// A set of extracted chunk files whose backing directory is removed when
/// the set is dropped, on success and failure paths alike.
pub struct ChunkSet {
    chunks: Vec<ExtractedChunk>,
    _temp_dir: TempDir,
}

impl ChunkSet {
    /// The extracted chunks in ascending index order.
    pub fn chunks(&self) -> &[ExtractedChunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Materializes the chunk files described by a [`ChunkPlan`].
pub struct ChunkExtractor {
    media_tool: Arc<dyn MediaTool>,
}

impl ChunkExtractor {
    pub fn new(media_tool: Arc<dyn MediaTool>) -> Self {
        Self { media_tool }
    }

    /// Extract every chunk in the plan into a scoped temporary directory.
    ///
    /// Failure of any single extraction aborts the whole attempt; chunks
    /// already produced are cleaned up when the partially built `ChunkSet`'s
    /// directory is dropped. No partial result is ever returned.
    #[instrument(skip(self, plan), fields(source = %source.display(), chunks = plan.chunk_count))]
    pub async fn extract(&self, source: &Path, plan: &ChunkPlan) -> Result<ChunkSet> {
        if !plan.needs_chunking {
            return Err(KlippError::InvalidInput(
                "Chunk extraction called for a file that does not need chunking".to_string(),
            ));
        }

        let temp_dir = tempfile::tempdir()?;
        let mut chunks = Vec::with_capacity(plan.chunk_count);

        for index in 0..plan.chunk_count {
            let start_offset_seconds = chunk_start_seconds(index, plan);
            let end_offset_seconds = start_offset_seconds + plan.chunk_duration_seconds;

            let chunk_path = temp_dir.path().join(chunk_file_name(source, index, start_offset_seconds));

            // The last chunk may extract past end-of-file; ffmpeg clamps.
            self.media_tool
                .extract_audio_chunk(
                    source,
                    start_offset_seconds,
                    plan.chunk_duration_seconds,
                    &chunk_path,
                )
                .await?;

            debug!("Extracted chunk {} at offset {:.1}s", index, start_offset_seconds);

            chunks.push(ExtractedChunk {
                index,
                path: chunk_path,
                start_offset_seconds,
                end_offset_seconds,
                overlap_start_seconds: if index == 0 { 0.0 } else { start_offset_seconds },
            });
        }

        info!("Extracted {} audio chunks", chunks.len());

        Ok(ChunkSet {
            chunks,
            _temp_dir: temp_dir,
        })
    }
}

/// Global start time for chunk `index`: each chunk after the first begins
/// `overlap_seconds` before its nominal boundary so boundary speech is
/// recorded on both sides.
fn chunk_start_seconds(index: usize, plan: &ChunkPlan) -> f64 {
    if index == 0 {
        0.0
    } else {
        index as f64 * plan.chunk_duration_seconds - plan.overlap_seconds
    }
}

/// Content-addressed chunk file name, unique across concurrent jobs that
/// may chunk the same source simultaneously.
fn chunk_file_name(source: &Path, index: usize, start_seconds: f64) -> String {
    let digest = md5::compute(format!("{}|{}|{:.3}", source.display(), index, start_seconds));
    format!("{:x}_{:03}.mp3", digest, index)
}
