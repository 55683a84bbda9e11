//! End-to-end chunked transcription pipeline.
//!
//! Composes the planner, chunk extractor, parallel executor, and merge
//! step into a single entry point. Small files skip chunking entirely and
//! go through one remote call.

use super::chunker::ChunkExtractor;
use super::executor::TranscriptionExecutor;
use super::merge::merge_chunk_results;
use super::models::AudioProcessingResult;
use super::planner::ChunkPlanner;
use super::Transcriber;
use crate::config::Settings;
use crate::error::Result;
use crate::media::MediaTool;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};

/// The chunked-transcription pipeline.
pub struct TranscriptionPipeline {
    planner: ChunkPlanner,
    extractor: ChunkExtractor,
    executor: TranscriptionExecutor,
    transcriber: Arc<dyn Transcriber>,
    media_tool: Arc<dyn MediaTool>,
    overlap_seconds: f64,
}

impl TranscriptionPipeline {
    /// Create a pipeline from settings and component seams.
    pub fn new(
        settings: &Settings,
        media_tool: Arc<dyn MediaTool>,
        transcriber: Arc<dyn Transcriber>,
    ) -> Self {
        Self {
            planner: ChunkPlanner::new(&settings.chunking),
            extractor: ChunkExtractor::new(media_tool.clone()),
            executor: TranscriptionExecutor::new(transcriber.clone()),
            transcriber,
            media_tool,
            overlap_seconds: settings.chunking.overlap_seconds,
        }
    }

    /// Transcribe an audio file, chunking it first when it exceeds the
    /// single-call size limit.
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    pub async fn transcribe_file(&self, audio_path: &Path) -> Result<AudioProcessingResult> {
        let plan = self.planner.plan(audio_path).await?;

        if !plan.needs_chunking {
            info!("Transcribing in a single call");
            return self.transcriber.transcribe(audio_path).await;
        }

        info!("Transcribing in {} chunks", plan.chunk_count);

        let chunk_set = self.extractor.extract(audio_path, &plan).await?;
        let results = self.executor.run(&chunk_set).await?;
        let merged = merge_chunk_results(results, plan.overlap_seconds);

        // Chunk files are removed when the set goes out of scope.
        drop(chunk_set);

        info!(
            "Merged transcript: {:.1}s of audio, {} words",
            merged.duration_seconds,
            merged.words.len()
        );

        Ok(merged)
    }

    /// Transcribe the audio track of a video file.
    ///
    /// The track is extracted to a temporary MP3 first, which is also what
    /// the planner's size heuristic is calibrated against.
    #[instrument(skip(self), fields(video_path = %video_path.display()))]
    pub async fn transcribe_video(&self, video_path: &Path) -> Result<AudioProcessingResult> {
        let temp_dir = tempfile::tempdir()?;
        let stem = video_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("audio");
        let audio_path = temp_dir.path().join(format!("{}.mp3", stem));

        self.media_tool
            .extract_audio_track(video_path, &audio_path)
            .await?;

        let result = self.transcribe_file(&audio_path).await;

        drop(temp_dir);
        result
    }

    /// Overlap window length used by the merge step, in seconds.
    pub fn overlap_seconds(&self) -> f64 {
        self.overlap_seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChunkingSettings;
    use crate::error::KlippError;
    use crate::transcription::models::Word;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct StubTool {
        chunk_calls: AtomicUsize,
    }

    #[async_trait]
    impl MediaTool for StubTool {
        async fn extract_audio_chunk(
            &self,
            _source: &Path,
            _start: f64,
            _duration: f64,
            dest: &Path,
        ) -> Result<()> {
            self.chunk_calls.fetch_add(1, Ordering::SeqCst);
            std::fs::write(dest, b"")?;
            Ok(())
        }

        async fn extract_video_segment(
            &self,
            _source: &Path,
            _start: f64,
            _end: f64,
            _dest: &Path,
        ) -> Result<()> {
            unimplemented!()
        }

        async fn concat_segments(&self, _segments: &[PathBuf], _dest: &Path) -> Result<()> {
            unimplemented!()
        }

        async fn extract_audio_track(&self, _video: &Path, _dest: &Path) -> Result<()> {
            unimplemented!()
        }

        async fn probe_duration(&self, _path: &Path) -> Result<f64> {
            unimplemented!()
        }
    }

    /// Returns one word per call so tests can count remote calls.
    #[derive(Default)]
    struct CountingTranscriber {
        paths: Mutex<Vec<PathBuf>>,
    }

    #[async_trait]
    impl Transcriber for CountingTranscriber {
        async fn transcribe(&self, audio_path: &Path) -> Result<AudioProcessingResult> {
            self.paths.lock().unwrap().push(audio_path.to_path_buf());
            Ok(AudioProcessingResult::from_parts(
                "en".to_string(),
                vec![Word {
                    text: "hi".to_string(),
                    start_seconds: 0.0,
                    end_seconds: 1.0,
                }],
                vec![],
            ))
        }
    }

    fn settings_with_threshold(max_bytes: u64) -> Settings {
        Settings {
            chunking: ChunkingSettings {
                max_single_call_bytes: max_bytes,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_small_file_single_call_no_chunk_extraction() {
        let tool = Arc::new(StubTool::default());
        let transcriber = Arc::new(CountingTranscriber::default());
        let pipeline = TranscriptionPipeline::new(
            &settings_with_threshold(1024 * 1024),
            tool.clone(),
            transcriber.clone(),
        );

        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"small").unwrap();

        let result = pipeline.transcribe_file(file.path()).await.unwrap();

        assert_eq!(result.transcript, "hi");
        assert_eq!(tool.chunk_calls.load(Ordering::SeqCst), 0);
        // The original path was transcribed directly.
        assert_eq!(transcriber.paths.lock().unwrap().len(), 1);
        assert_eq!(transcriber.paths.lock().unwrap()[0], file.path());
    }

    #[tokio::test]
    async fn test_oversized_file_fans_out_one_call_per_chunk() {
        let tool = Arc::new(StubTool::default());
        let transcriber = Arc::new(CountingTranscriber::default());
        let pipeline = TranscriptionPipeline::new(
            &settings_with_threshold(16),
            tool.clone(),
            transcriber.clone(),
        );

        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), vec![0u8; 64]).unwrap();

        let result = pipeline.transcribe_file(file.path()).await.unwrap();

        // 64 bytes over a 16 byte threshold floors at two chunks.
        assert_eq!(tool.chunk_calls.load(Ordering::SeqCst), 2);
        assert_eq!(transcriber.paths.lock().unwrap().len(), 2);
        assert!(!result.words.is_empty());
    }

    #[tokio::test]
    async fn test_chunk_transcription_failure_propagates() {
        struct FailingTranscriber;

        #[async_trait]
        impl Transcriber for FailingTranscriber {
            async fn transcribe(&self, _audio_path: &Path) -> Result<AudioProcessingResult> {
                Err(KlippError::OpenAI("boom".to_string()))
            }
        }

        let pipeline = TranscriptionPipeline::new(
            &settings_with_threshold(16),
            Arc::new(StubTool::default()),
            Arc::new(FailingTranscriber),
        );

        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), vec![0u8; 64]).unwrap();

        let err = pipeline.transcribe_file(file.path()).await.unwrap_err();
        assert!(err.to_string().contains("chunk"));
    }
}
