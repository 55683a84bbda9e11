//! Transcribe command - local audio/video file to transcript.

use crate::cli::output::format_duration;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::media::FfmpegTool;
use crate::transcription::{
    format_transcript, OutputFormat, TranscriptionPipeline, WhisperTranscriber,
};
use std::path::Path;
use std::sync::Arc;

/// File extensions treated as video containers needing audio extraction.
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "webm", "m4v"];

pub async fn run_transcribe(
    input: &str,
    output: Option<String>,
    format: &str,
    settings: Settings,
) -> anyhow::Result<()> {
    preflight::check(Operation::Transcribe)?;

    let format: OutputFormat = format.parse().map_err(|e: String| anyhow::anyhow!(e))?;

    let input_path = Settings::expand_path(input);
    if !input_path.exists() {
        anyhow::bail!("Input file not found: {}", input_path.display());
    }

    let media_tool = Arc::new(FfmpegTool::new());
    let transcriber = Arc::new(WhisperTranscriber::with_config(
        &settings.transcription.model,
        settings.transcription.language.clone(),
    ));
    let pipeline = TranscriptionPipeline::new(&settings, media_tool, transcriber);

    let spinner = Output::spinner(&format!("Transcribing {}...", input_path.display()));

    let result = if is_video(&input_path) {
        pipeline.transcribe_video(&input_path).await?
    } else {
        pipeline.transcribe_file(&input_path).await?
    };

    spinner.finish_and_clear();

    Output::success(&format!(
        "Transcribed {} of audio ({} words, language: {})",
        format_duration(result.duration_seconds),
        result.words.len(),
        result.language
    ));

    let formatted = format_transcript(&result, format);
    match output {
        Some(path) => {
            std::fs::write(&path, formatted)?;
            Output::info(&format!("Transcript written to {}", path));
        }
        None => println!("{}", formatted),
    }

    Ok(())
}

fn is_video(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}
