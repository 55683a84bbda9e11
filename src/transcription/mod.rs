//! Transcription module for Klipp.
//!
//! Splits oversized audio into overlapping chunks, transcribes each chunk
//! independently against the remote speech API, and merges the results
//! into one word-accurate transcript on the global timeline.

mod chunker;
mod executor;
mod format;
mod merge;
mod models;
mod pipeline;
mod planner;
mod whisper;

pub use chunker::{ChunkExtractor, ChunkSet, ExtractedChunk};
pub use executor::TranscriptionExecutor;
pub use format::{format_transcript, OutputFormat, SegmentExport, TranscriptExport};
pub use merge::merge_chunk_results;
pub use models::{AudioProcessingResult, ChunkPlan, ChunkResult, TranscriptSegment, Word};
pub use pipeline::TranscriptionPipeline;
pub use planner::{ChunkPlanner, EXTRACTED_AUDIO_BYTES_PER_MINUTE};
pub use whisper::WhisperTranscriber;

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Trait for remote transcription services.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe an audio file and return the result with word-level
    /// timestamps.
    async fn transcribe(&self, audio_path: &Path) -> Result<AudioProcessingResult>;
}
