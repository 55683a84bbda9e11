//! Klipp - Highlight Export and Transcription
//!
//! A local-first tool for transcribing long-form spoken-word video and
//! exporting user-selected highlight ranges as new video files.
//!
//! The name "Klipp" comes from the Norwegian/Scandinavian word for "cut."
//!
//! # Overview
//!
//! Klipp allows you to:
//! - Transcribe local audio/video files through a size-limited remote
//!   speech API, transparently chunking oversized inputs
//! - Track projects of video clips and their highlight ranges
//! - Export highlights as background jobs, stitched into one file or as
//!   individual clips, with cooperative cancellation and crash recovery
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `media` - ffmpeg/ffprobe adapter for extraction and concatenation
//! - `transcription` - Chunked speech-to-text pipeline and merging
//! - `project` - Projects, clips, and highlights
//! - `store` - SQLite persistence for projects and export jobs
//! - `export` - Background export job engine
//!
//! # Example
//!
//! ```rust,no_run
//! use klipp::config::Settings;
//! use klipp::export::ExportOrchestrator;
//! use klipp::media::FfmpegTool;
//! use klipp::store::SqliteStore;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let store = Arc::new(SqliteStore::new(&settings.sqlite_path())?);
//!     let orchestrator =
//!         ExportOrchestrator::new(store.clone(), store.clone(), Arc::new(FfmpegTool::new()));
//!
//!     // Close out jobs orphaned by a previous crash, then start an export.
//!     orchestrator.recover_interrupted_jobs().await?;
//!     let job_id = orchestrator
//!         .export_stitched("project-id", Path::new("/tmp/exports"))
//!         .await?;
//!     println!("Started job {}", job_id);
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod media;
pub mod openai;
pub mod project;
pub mod store;
pub mod transcription;

pub use error::{KlippError, Result};
