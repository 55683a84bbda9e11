//! OpenAI Whisper transcription implementation.

use super::models::{AudioProcessingResult, TranscriptSegment, Word};
use super::Transcriber;
use crate::error::{KlippError, Result};
use crate::openai::create_transcription_client;
use async_openai::types::{
    AudioResponseFormat, CreateTranscriptionRequestArgs, TimestampGranularity,
};
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, instrument, warn};

/// OpenAI Whisper-based transcriber.
///
/// Requests verbose JSON with both word- and segment-level timestamp
/// granularities. One instance transcribes one file (or chunk) per call;
/// the 120 second request timeout lives in the underlying HTTP client and
/// is surfaced as a terminal failure, never retried.
pub struct WhisperTranscriber {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    language: Option<String>,
}

impl WhisperTranscriber {
    /// Create a transcriber with the default model.
    pub fn new() -> Self {
        Self::with_config("whisper-1", None)
    }

    /// Create a transcriber with a custom model and language hint.
    pub fn with_config(model: &str, language: Option<String>) -> Self {
        Self {
            client: create_transcription_client(),
            model: model.to_string(),
            language,
        }
    }
}

impl Default for WhisperTranscriber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe(&self, audio_path: &Path) -> Result<AudioProcessingResult> {
        debug!("Transcribing audio file");

        let file_bytes = tokio::fs::read(audio_path).await?;

        let mut request_builder = CreateTranscriptionRequestArgs::default();
        request_builder
            .file(async_openai::types::AudioInput::from_vec_u8(
                audio_path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("audio.mp3")
                    .to_string(),
                file_bytes,
            ))
            .model(&self.model)
            .response_format(AudioResponseFormat::VerboseJson)
            .timestamp_granularities(vec![
                TimestampGranularity::Word,
                TimestampGranularity::Segment,
            ]);

        if let Some(lang) = &self.language {
            request_builder.language(lang);
        }

        let request = request_builder
            .build()
            .map_err(|e| KlippError::Transcription(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .audio()
            .transcribe_verbose_json(request)
            .await
            .map_err(|e| KlippError::OpenAI(format!("Whisper API error: {}", e)))?;

        let words: Vec<Word> = response
            .words
            .as_ref()
            .map(|ws| {
                ws.iter()
                    .map(|w| Word {
                        text: w.word.clone(),
                        start_seconds: w.start as f64,
                        end_seconds: w.end as f64,
                    })
                    .collect()
            })
            .unwrap_or_else(|| {
                warn!("No word-level timestamps returned, approximating from segments");
                approximate_words_from_segments(&response)
            });

        let segments: Vec<TranscriptSegment> = response
            .segments
            .map(|segs| {
                segs.iter()
                    .map(|s| {
                        let start = s.start as f64;
                        let end = s.end as f64;
                        TranscriptSegment {
                            id: s.id as u32,
                            start_seconds: start,
                            end_seconds: end,
                            text: s.text.trim().to_string(),
                            words: words
                                .iter()
                                .filter(|w| w.start_seconds >= start && w.start_seconds < end)
                                .cloned()
                                .collect(),
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        debug!(
            "Transcribed {} words across {} segments",
            words.len(),
            segments.len()
        );

        Ok(AudioProcessingResult {
            transcript: response.text.trim().to_string(),
            duration_seconds: response.duration as f64,
            language: response.language,
            words,
            segments,
        })
    }
}

/// Approximate per-word timestamps by dividing each segment's span evenly
/// across its whitespace-separated words.
fn approximate_words_from_segments(
    response: &async_openai::types::CreateTranscriptionResponseVerboseJson,
) -> Vec<Word> {
    response
        .segments
        .as_ref()
        .map(|segs| {
            segs.iter()
                .flat_map(|s| {
                    let words: Vec<&str> = s.text.split_whitespace().collect();
                    if words.is_empty() {
                        return vec![];
                    }
                    let duration = (s.end - s.start) as f64;
                    let word_duration = duration / words.len() as f64;
                    words
                        .into_iter()
                        .enumerate()
                        .map(|(i, word)| Word {
                            text: word.to_string(),
                            start_seconds: s.start as f64 + i as f64 * word_duration,
                            end_seconds: s.start as f64 + (i + 1) as f64 * word_duration,
                        })
                        .collect::<Vec<_>>()
                })
                .collect()
        })
        .unwrap_or_default()
}
