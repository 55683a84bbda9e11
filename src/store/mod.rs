//! Persistent storage for projects, highlights, and export jobs.
//!
//! The job store is the durable source of truth for export state: the
//! in-memory job registry only routes cancellations and never survives a
//! restart, so pollers and crash recovery read from here.

mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::export::{ExportJob, ExportStage};
use crate::project::{Highlight, Project, VideoClip};
use async_trait::async_trait;

/// Durable record of export job identity, stage, progress, and outcome.
///
/// Progress writes come synchronously from each job's single background
/// task, so readers always see a consistent (if possibly stale) snapshot;
/// no cross-job transactional consistency is required.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new job row (stage `pending`).
    async fn create_job(&self, job: &ExportJob) -> Result<()>;

    /// Fetch a job by ID.
    async fn get_job(&self, job_id: &str) -> Result<Option<ExportJob>>;

    /// List all jobs for a project, newest first.
    async fn list_jobs(&self, project_id: &str) -> Result<Vec<ExportJob>>;

    /// Advance a job's stage. A no-op for rows already in a terminal stage.
    async fn set_stage(&self, job_id: &str, stage: ExportStage) -> Result<()>;

    /// Record the number of work units the job will process.
    async fn set_total_files(&self, job_id: &str, total_files: usize) -> Result<()>;

    /// Record per-unit progress after a unit of work completes.
    async fn update_progress(
        &self,
        job_id: &str,
        progress: f64,
        processed_files: usize,
        current_file: &str,
    ) -> Result<()>;

    /// Terminate the job as completed, recording the output path.
    async fn complete_job(&self, job_id: &str, output_path: &str) -> Result<()>;

    /// Terminate the job as failed with a human-readable cause.
    async fn fail_job(&self, job_id: &str, error_message: &str) -> Result<()>;

    /// Terminate the job as cancelled.
    async fn cancel_job(&self, job_id: &str) -> Result<()>;

    /// Jobs still in a non-terminal stage (used by crash recovery).
    async fn non_terminal_jobs(&self) -> Result<Vec<ExportJob>>;
}

/// Read/write access to projects, clips, and highlights.
///
/// The export engine only reads; writes exist for the CLI import path and
/// for test fixtures.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn insert_project(&self, project: &Project) -> Result<()>;

    async fn get_project(&self, project_id: &str) -> Result<Option<Project>>;

    async fn insert_clip(&self, clip: &VideoClip) -> Result<()>;

    async fn insert_highlight(&self, highlight: &Highlight) -> Result<()>;

    /// All highlights across the project's clips, in clip order then
    /// highlight order, paired with their owning clip.
    async fn project_highlights(&self, project_id: &str) -> Result<Vec<(VideoClip, Highlight)>>;
}
