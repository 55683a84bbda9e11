//! Data models for transcription.

use serde::{Deserialize, Serialize};

/// A single word with precise timing from word-level timestamps.
///
/// Immutable once produced by a transcription call. Within one chunk,
/// word start times are non-decreasing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Word {
    /// The word text.
    pub text: String,
    /// Start time in seconds.
    pub start_seconds: f64,
    /// End time in seconds.
    pub end_seconds: f64,
}

/// A larger transcribed span with its nested words.
///
/// Follows the same timestamp-adjustment rules as [`Word`] during merging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Segment ID within the source response.
    pub id: u32,
    /// Start time in seconds.
    pub start_seconds: f64,
    /// End time in seconds.
    pub end_seconds: f64,
    /// Transcribed text content.
    pub text: String,
    /// Words contained in this segment.
    pub words: Vec<Word>,
}

/// A complete transcription result.
///
/// This is both the per-chunk unit and the final merged unit: merging is a
/// fold over many instances producing one instance of the same shape, and
/// for a single chunk it is the identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioProcessingResult {
    /// Full transcript text.
    pub transcript: String,
    /// Total duration in seconds.
    pub duration_seconds: f64,
    /// Detected (or hinted) language.
    pub language: String,
    /// All words with timestamps.
    pub words: Vec<Word>,
    /// Segments with timestamps and nested words.
    pub segments: Vec<TranscriptSegment>,
}

impl AudioProcessingResult {
    /// Create a result from words and segments, deriving the transcript
    /// text and duration.
    pub fn from_parts(language: String, words: Vec<Word>, segments: Vec<TranscriptSegment>) -> Self {
        let transcript = words
            .iter()
            .map(|w| w.text.trim())
            .collect::<Vec<_>>()
            .join(" ");

        let duration_seconds = words.last().map(|w| w.end_seconds).unwrap_or(0.0);

        Self {
            transcript,
            duration_seconds,
            language,
            words,
            segments,
        }
    }
}

/// Chunking decision and geometry for one audio file.
///
/// Computed once per file and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkPlan {
    /// Whether the file exceeds the single-call size limit.
    pub needs_chunking: bool,
    /// Size of the audio file in bytes.
    pub file_size_bytes: u64,
    /// Number of chunks to extract (meaningless when `needs_chunking` is false).
    pub chunk_count: usize,
    /// Duration of each chunk in seconds.
    pub chunk_duration_seconds: f64,
    /// Overlap recorded at chunk boundaries in seconds.
    pub overlap_seconds: f64,
    /// Heuristic estimate of the total audio duration, present only when
    /// chunking applies.
    pub estimated_total_duration: Option<f64>,
}

/// Transcription of one physical chunk, positioned on the global timeline.
///
/// Produced by the executor, consumed and discarded by the merge step.
#[derive(Debug, Clone)]
pub struct ChunkResult {
    /// Zero-based chunk index.
    pub chunk_index: usize,
    /// Global time at which this chunk's audio begins.
    pub start_offset_seconds: f64,
    /// Global time at which this chunk's audio ends.
    pub end_offset_seconds: f64,
    /// Global time at which this chunk's leading overlap begins.
    pub overlap_start_seconds: f64,
    /// The chunk-local transcription.
    pub transcription: AudioProcessingResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_from_parts() {
        let words = vec![
            Word {
                text: "hello".to_string(),
                start_seconds: 0.0,
                end_seconds: 0.5,
            },
            Word {
                text: " world".to_string(),
                start_seconds: 0.5,
                end_seconds: 1.0,
            },
        ];

        let result = AudioProcessingResult::from_parts("en".to_string(), words, vec![]);

        assert_eq!(result.transcript, "hello world");
        assert_eq!(result.duration_seconds, 1.0);
        assert_eq!(result.language, "en");
    }

    #[test]
    fn test_result_from_empty_parts() {
        let result = AudioProcessingResult::from_parts("en".to_string(), vec![], vec![]);
        assert_eq!(result.transcript, "");
        assert_eq!(result.duration_seconds, 0.0);
    }
}
