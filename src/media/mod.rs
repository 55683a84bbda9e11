//! Media tool adapter wrapping ffmpeg and ffprobe.
//!
//! All codec work is delegated to the external tools as black boxes. The
//! adapter's only contract is "produce a valid file at the destination or
//! return a descriptive error" — chunk geometry and merge logic live in
//! the transcription and export modules, never here.

use crate::error::{KlippError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

/// Boundary for external media operations.
///
/// Implemented by [`FfmpegTool`] in production and by in-process mocks in
/// tests, so the export and transcription engines never spawn processes
/// during unit testing.
#[async_trait]
pub trait MediaTool: Send + Sync {
    /// Extract a time-bounded audio chunk from an audio file.
    ///
    /// A `start + duration` range past end-of-file is clamped by the tool,
    /// not treated as an error.
    async fn extract_audio_chunk(
        &self,
        source: &Path,
        start_seconds: f64,
        duration_seconds: f64,
        dest: &Path,
    ) -> Result<()>;

    /// Extract a video segment between two timestamps.
    async fn extract_video_segment(
        &self,
        source: &Path,
        start_seconds: f64,
        end_seconds: f64,
        dest: &Path,
    ) -> Result<()>;

    /// Concatenate video segments into a single output file.
    async fn concat_segments(&self, segments: &[PathBuf], dest: &Path) -> Result<()>;

    /// Extract the full audio track of a video as 128 kbps mono MP3,
    /// the format the transcription pipeline expects.
    async fn extract_audio_track(&self, video: &Path, dest: &Path) -> Result<()>;

    /// Query the duration of a media file in seconds.
    async fn probe_duration(&self, path: &Path) -> Result<f64>;
}

/// ffmpeg/ffprobe-backed implementation of [`MediaTool`].
#[derive(Debug, Clone, Default)]
pub struct FfmpegTool;

impl FfmpegTool {
    pub fn new() -> Self {
        Self
    }

    /// Run an ffmpeg invocation, mapping a missing binary and non-zero
    /// exit codes to descriptive errors.
    async fn run_ffmpeg(args: &[&str], context: &str) -> Result<()> {
        let result = Command::new("ffmpeg")
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        match result {
            Ok(out) if out.status.success() => Ok(()),
            Ok(out) => {
                let err = String::from_utf8_lossy(&out.stderr);
                Err(KlippError::MediaTool(format!(
                    "{}: {}",
                    context,
                    err.trim()
                )))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(KlippError::ToolNotFound("ffmpeg".into()))
            }
            Err(e) => Err(KlippError::MediaTool(format!("{}: {}", context, e))),
        }
    }
}

#[async_trait]
impl MediaTool for FfmpegTool {
    #[instrument(skip(self), fields(source = %source.display()))]
    async fn extract_audio_chunk(
        &self,
        source: &Path,
        start_seconds: f64,
        duration_seconds: f64,
        dest: &Path,
    ) -> Result<()> {
        let start = format!("{:.3}", start_seconds);
        let duration = format!("{:.3}", duration_seconds);
        let source_str = source.to_string_lossy();
        let dest_str = dest.to_string_lossy();

        // First attempt: stream copy (fast, no quality loss)
        let copy_result = Command::new("ffmpeg")
            .arg("-ss").arg(&start)
            .arg("-i").arg(source)
            .arg("-t").arg(&duration)
            .arg("-c").arg("copy")
            .arg("-y")
            .arg("-loglevel").arg("warning")
            .arg(dest)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        if let Ok(status) = copy_result {
            if status.success() && dest.exists() {
                debug!("Extracted audio chunk at {:.1}s", start_seconds);
                return Ok(());
            }
        }

        // Fallback: re-encode to MP3
        warn!("Stream copy failed, re-encoding chunk at {:.1}s", start_seconds);

        Self::run_ffmpeg(
            &[
                "-ss", &start,
                "-i", &source_str,
                "-t", &duration,
                "-codec:a", "libmp3lame",
                "-b:a", "128k",
                "-ac", "1",
                "-y",
                "-loglevel", "error",
                &dest_str,
            ],
            "Audio chunk extraction failed",
        )
        .await
    }

    #[instrument(skip(self), fields(source = %source.display()))]
    async fn extract_video_segment(
        &self,
        source: &Path,
        start_seconds: f64,
        end_seconds: f64,
        dest: &Path,
    ) -> Result<()> {
        if !source.exists() {
            return Err(KlippError::MediaTool(format!(
                "Source file does not exist: {}",
                source.display()
            )));
        }

        let start = format!("{:.3}", start_seconds);
        let duration = format!("{:.3}", end_seconds - start_seconds);
        let source_str = source.to_string_lossy();
        let dest_str = dest.to_string_lossy();

        Self::run_ffmpeg(
            &[
                "-ss", &start,
                "-i", &source_str,
                "-t", &duration,
                "-c", "copy",
                "-avoid_negative_ts", "make_zero",
                "-y",
                "-loglevel", "error",
                &dest_str,
            ],
            "Failed to extract segment",
        )
        .await?;

        debug!(
            "Extracted segment {:.1}s-{:.1}s to {}",
            start_seconds,
            end_seconds,
            dest.display()
        );
        Ok(())
    }

    #[instrument(skip(self, segments), fields(count = segments.len()))]
    async fn concat_segments(&self, segments: &[PathBuf], dest: &Path) -> Result<()> {
        if segments.is_empty() {
            return Err(KlippError::MediaTool(
                "No segments to concatenate".to_string(),
            ));
        }

        // The concat demuxer reads segment paths from a list file.
        let mut list = String::new();
        for segment in segments {
            list.push_str(&format!("file '{}'\n", segment.display()));
        }

        let list_path = dest.with_extension("concat.txt");
        tokio::fs::write(&list_path, list).await?;

        let list_str = list_path.to_string_lossy();
        let dest_str = dest.to_string_lossy();

        let result = Self::run_ffmpeg(
            &[
                "-f", "concat",
                "-safe", "0",
                "-i", &list_str,
                "-c", "copy",
                "-y",
                "-loglevel", "error",
                &dest_str,
            ],
            "Failed to concatenate segments",
        )
        .await;

        if let Err(e) = tokio::fs::remove_file(&list_path).await {
            warn!("Failed to remove concat list file: {}", e);
        }

        result
    }

    #[instrument(skip(self), fields(video = %video.display()))]
    async fn extract_audio_track(&self, video: &Path, dest: &Path) -> Result<()> {
        let video_str = video.to_string_lossy();
        let dest_str = dest.to_string_lossy();

        Self::run_ffmpeg(
            &[
                "-i", &video_str,
                "-vn",
                "-codec:a", "libmp3lame",
                "-b:a", "128k",
                "-ac", "1",
                "-y",
                "-loglevel", "error",
                &dest_str,
            ],
            "Audio track extraction failed",
        )
        .await
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    async fn probe_duration(&self, path: &Path) -> Result<f64> {
        let result = Command::new("ffprobe")
            .arg("-v").arg("quiet")
            .arg("-print_format").arg("json")
            .arg("-show_format")
            .arg(path)
            .output()
            .await;

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(KlippError::ToolNotFound("ffprobe".into()));
            }
            Err(e) => {
                return Err(KlippError::MediaTool(format!("ffprobe failed: {}", e)));
            }
        };

        if !output.status.success() {
            return Err(KlippError::MediaTool(format!(
                "ffprobe returned error for {}",
                path.display()
            )));
        }

        let json_str = String::from_utf8_lossy(&output.stdout);
        let parsed: serde_json::Value = serde_json::from_str(&json_str)
            .map_err(|_| KlippError::MediaTool("Invalid ffprobe output".into()))?;

        parsed["format"]["duration"]
            .as_str()
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or_else(|| KlippError::MediaTool("Could not determine media duration".into()))
    }
}
