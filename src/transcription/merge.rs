//! Stitches per-chunk transcripts into one global transcript.
//!
//! Chunks after the first begin inside the previous chunk's tail, so the
//! merge drops each chunk's leading duplicate content using the overlap
//! window before splicing the timelines together.

use super::models::{AudioProcessingResult, ChunkResult, TranscriptSegment, Word};
use tracing::{debug, instrument};

/// Merge chunk transcriptions into a single timestamp-correct result.
///
/// For a single chunk this is the identity. For multiple chunks, every
/// word and segment is shifted from chunk-local to global time, and words
/// whose adjusted start falls inside the previous chunk's overlap window
/// are dropped as duplicates.
#[instrument(skip(results), fields(chunks = results.len()))]
pub fn merge_chunk_results(
    mut results: Vec<ChunkResult>,
    overlap_seconds: f64,
) -> AudioProcessingResult {
    results.sort_by_key(|r| r.chunk_index);

    if results.len() == 1 {
        return results.pop().expect("one chunk result").transcription;
    }

    let mut all_words: Vec<Word> = Vec::new();
    let mut all_segments: Vec<TranscriptSegment> = Vec::new();
    let mut transcript_parts: Vec<String> = Vec::new();
    let mut language = String::new();
    let mut previous_end_offset = 0.0;

    for (position, result) in results.iter().enumerate() {
        let adjusted = adjust_to_global(&result.transcription, result.start_offset_seconds);

        if position == 0 {
            language = adjusted.language.clone();
            // Nothing was removed from the first chunk; its transcript
            // text is used verbatim.
            transcript_parts.push(adjusted.transcript.trim().to_string());
            all_words.extend(adjusted.words);
            all_segments.extend(adjusted.segments);
        } else {
            // Content in this window was already captured by the previous
            // chunk, which by construction extends further into the
            // overlap than this chunk's beginning.
            let window_end = previous_end_offset;
            let window_start = window_end - overlap_seconds;

            let words: Vec<Word> = adjusted
                .words
                .into_iter()
                .filter(|w| !in_window(w.start_seconds, window_start, window_end))
                .collect();

            let segments: Vec<TranscriptSegment> = adjusted
                .segments
                .into_iter()
                .filter_map(|s| dedup_segment(s, window_start, window_end))
                .collect();

            debug!(
                "Chunk {}: kept {} words after overlap dedup",
                result.chunk_index,
                words.len()
            );

            // Rebuilding from the deduplicated words avoids repeating the
            // overlap text that the raw transcript string still contains.
            let rebuilt: String = words
                .iter()
                .map(|w| clean_word(&w.text))
                .collect::<Vec<_>>()
                .join(" ");
            if !rebuilt.is_empty() {
                transcript_parts.push(rebuilt);
            }

            all_words.extend(words);
            all_segments.extend(segments);
        }

        previous_end_offset = result.end_offset_seconds;
    }

    all_words.sort_by(|a, b| {
        a.start_seconds
            .partial_cmp(&b.start_seconds)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    all_segments.sort_by(|a, b| {
        a.start_seconds
            .partial_cmp(&b.start_seconds)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let duration_seconds = all_words
        .iter()
        .map(|w| w.end_seconds)
        .fold(0.0, f64::max);

    AudioProcessingResult {
        transcript: transcript_parts.join(" "),
        duration_seconds,
        language,
        words: all_words,
        segments: all_segments,
    }
}

/// Shift a chunk-local transcription onto the global timeline.
fn adjust_to_global(result: &AudioProcessingResult, offset_seconds: f64) -> AudioProcessingResult {
    let words = result
        .words
        .iter()
        .map(|w| shift_word(w, offset_seconds))
        .collect();

    let segments = result
        .segments
        .iter()
        .map(|s| TranscriptSegment {
            id: s.id,
            start_seconds: s.start_seconds + offset_seconds,
            end_seconds: s.end_seconds + offset_seconds,
            text: s.text.clone(),
            words: s.words.iter().map(|w| shift_word(w, offset_seconds)).collect(),
        })
        .collect();

    AudioProcessingResult {
        transcript: result.transcript.clone(),
        duration_seconds: result.duration_seconds + offset_seconds,
        language: result.language.clone(),
        words,
        segments,
    }
}

fn shift_word(word: &Word, offset_seconds: f64) -> Word {
    Word {
        text: word.text.clone(),
        start_seconds: word.start_seconds + offset_seconds,
        end_seconds: word.end_seconds + offset_seconds,
    }
}

/// Strict half-open window test on the adjusted start time. A word whose
/// span straddles the window edge is kept or dropped on its start alone;
/// this is a known heuristic, not silence-aware.
fn in_window(start_seconds: f64, window_start: f64, window_end: f64) -> bool {
    start_seconds >= window_start && start_seconds < window_end
}

/// Apply overlap dedup to one segment.
///
/// A segment lying entirely inside the window duplicates previous-chunk
/// content and is dropped. A segment that only partially overlaps is
/// retained with its word list filtered — segments are coarse units and
/// dropping one outright would lose legitimate content.
fn dedup_segment(
    segment: TranscriptSegment,
    window_start: f64,
    window_end: f64,
) -> Option<TranscriptSegment> {
    let fully_inside =
        in_window(segment.start_seconds, window_start, window_end) && segment.end_seconds <= window_end;
    if fully_inside {
        return None;
    }

    let overlaps = segment.start_seconds < window_end && segment.end_seconds > window_start;
    if !overlaps {
        return Some(segment);
    }

    let words = segment
        .words
        .into_iter()
        .filter(|w| !in_window(w.start_seconds, window_start, window_end))
        .collect();

    Some(TranscriptSegment { words, ..segment })
}

/// Normalize a word for transcript text reconstruction.
fn clean_word(text: &str) -> &str {
    text.trim()
}
