//! SQLite-backed store implementation.
//!
//! Uses a single connection behind a mutex with WAL mode enabled. Job rows
//! are written by exactly one background task each, so last-writer-wins is
//! acceptable and no row-level locking exists.

use super::{JobStore, ProjectStore};
use crate::error::{KlippError, Result};
use crate::export::{ExportJob, ExportStage, ExportType};
use crate::project::{Highlight, Project, VideoClip};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS video_clips (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    path TEXT NOT NULL,
    duration_seconds REAL NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_clips_project_id ON video_clips(project_id);

CREATE TABLE IF NOT EXISTS highlights (
    id TEXT PRIMARY KEY,
    clip_id TEXT NOT NULL,
    start_seconds REAL NOT NULL,
    end_seconds REAL NOT NULL,
    color_id INTEGER NOT NULL DEFAULT 0,
    text TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_highlights_clip_id ON highlights(clip_id);

CREATE TABLE IF NOT EXISTS export_jobs (
    job_id TEXT PRIMARY KEY,
    export_type TEXT NOT NULL,
    project_id TEXT NOT NULL,
    output_path TEXT NOT NULL,
    stage TEXT NOT NULL,
    progress REAL NOT NULL DEFAULT 0,
    current_file TEXT,
    total_files INTEGER NOT NULL DEFAULT 0,
    processed_files INTEGER NOT NULL DEFAULT 0,
    error_message TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_jobs_project_id ON export_jobs(project_id);
"#;

/// Terminal-stage guard shared by every job mutation: once a row reaches a
/// terminal stage it is immutable except for queries.
const NON_TERMINAL: &str = "stage NOT IN ('completed', 'failed', 'cancelled')";

/// SQLite-backed [`JobStore`] and [`ProjectStore`].
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the store at the given path.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| KlippError::Store(format!("Failed to acquire lock: {}", e)))
    }

    fn job_from_row(row: &Row<'_>) -> rusqlite::Result<ExportJob> {
        let export_type_str: String = row.get(1)?;
        let stage_str: String = row.get(4)?;
        let created_at_str: String = row.get(10)?;
        let total_files: i64 = row.get(7)?;
        let processed_files: i64 = row.get(8)?;

        let export_type: ExportType = export_type_str.parse().map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, e.into())
        })?;
        let stage: ExportStage = stage_str.parse().map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, e.into())
        })?;

        Ok(ExportJob {
            job_id: row.get(0)?,
            export_type,
            project_id: row.get(2)?,
            output_path: row.get(3)?,
            stage,
            progress: row.get(5)?,
            current_file: row.get(6)?,
            total_files: total_files as usize,
            processed_files: processed_files as usize,
            error_message: row.get(9)?,
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}

const JOB_COLUMNS: &str = "job_id, export_type, project_id, output_path, stage, progress, \
                           current_file, total_files, processed_files, error_message, created_at";

#[async_trait]
impl JobStore for SqliteStore {
    #[instrument(skip(self, job), fields(job_id = %job.job_id))]
    async fn create_job(&self, job: &ExportJob) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            &format!("INSERT INTO export_jobs ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)", JOB_COLUMNS),
            params![
                job.job_id,
                job.export_type.to_string(),
                job.project_id,
                job.output_path,
                job.stage.to_string(),
                job.progress,
                job.current_file,
                job.total_files as i64,
                job.processed_files as i64,
                job.error_message,
                job.created_at.to_rfc3339(),
            ],
        )?;

        debug!("Created export job row");
        Ok(())
    }

    async fn get_job(&self, job_id: &str) -> Result<Option<ExportJob>> {
        let conn = self.lock()?;

        let result = conn.query_row(
            &format!("SELECT {} FROM export_jobs WHERE job_id = ?1", JOB_COLUMNS),
            params![job_id],
            Self::job_from_row,
        );

        match result {
            Ok(job) => Ok(Some(job)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_jobs(&self, project_id: &str) -> Result<Vec<ExportJob>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM export_jobs WHERE project_id = ?1 ORDER BY created_at DESC",
            JOB_COLUMNS
        ))?;

        let jobs = stmt.query_map(params![project_id], Self::job_from_row)?;
        Ok(jobs.filter_map(|j| j.ok()).collect())
    }

    async fn set_stage(&self, job_id: &str, stage: ExportStage) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            &format!(
                "UPDATE export_jobs SET stage = ?1 WHERE job_id = ?2 AND {}",
                NON_TERMINAL
            ),
            params![stage.to_string(), job_id],
        )?;

        Ok(())
    }

    async fn set_total_files(&self, job_id: &str, total_files: usize) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            &format!(
                "UPDATE export_jobs SET total_files = ?1 WHERE job_id = ?2 AND {}",
                NON_TERMINAL
            ),
            params![total_files as i64, job_id],
        )?;

        Ok(())
    }

    async fn update_progress(
        &self,
        job_id: &str,
        progress: f64,
        processed_files: usize,
        current_file: &str,
    ) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            &format!(
                "UPDATE export_jobs SET progress = ?1, processed_files = ?2, current_file = ?3 \
                 WHERE job_id = ?4 AND {}",
                NON_TERMINAL
            ),
            params![progress, processed_files as i64, current_file, job_id],
        )?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn complete_job(&self, job_id: &str, output_path: &str) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            &format!(
                "UPDATE export_jobs SET stage = 'completed', progress = 1.0, output_path = ?1 \
                 WHERE job_id = ?2 AND {}",
                NON_TERMINAL
            ),
            params![output_path, job_id],
        )?;

        info!("Job {} completed", job_id);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn fail_job(&self, job_id: &str, error_message: &str) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            &format!(
                "UPDATE export_jobs SET stage = 'failed', error_message = ?1 \
                 WHERE job_id = ?2 AND {}",
                NON_TERMINAL
            ),
            params![error_message, job_id],
        )?;

        info!("Job {} failed: {}", job_id, error_message);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn cancel_job(&self, job_id: &str) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            &format!(
                "UPDATE export_jobs SET stage = 'cancelled' WHERE job_id = ?1 AND {}",
                NON_TERMINAL
            ),
            params![job_id],
        )?;

        info!("Job {} cancelled", job_id);
        Ok(())
    }

    async fn non_terminal_jobs(&self) -> Result<Vec<ExportJob>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM export_jobs WHERE {} ORDER BY created_at",
            JOB_COLUMNS, NON_TERMINAL
        ))?;

        let jobs = stmt.query_map([], Self::job_from_row)?;
        Ok(jobs.filter_map(|j| j.ok()).collect())
    }
}

#[async_trait]
impl ProjectStore for SqliteStore {
    async fn insert_project(&self, project: &Project) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT OR REPLACE INTO projects (id, name, created_at) VALUES (?1, ?2, ?3)",
            params![project.id, project.name, project.created_at.to_rfc3339()],
        )?;

        Ok(())
    }

    async fn get_project(&self, project_id: &str) -> Result<Option<Project>> {
        let conn = self.lock()?;

        let result = conn.query_row(
            "SELECT id, name, created_at FROM projects WHERE id = ?1",
            params![project_id],
            |row| {
                let created_at_str: String = row.get(2)?;
                Ok(Project {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: DateTime::parse_from_rfc3339(&created_at_str)
                        .map(|dt| dt.with_timezone(&Utc))
                        .unwrap_or_else(|_| Utc::now()),
                })
            },
        );

        match result {
            Ok(project) => Ok(Some(project)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn insert_clip(&self, clip: &VideoClip) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT OR REPLACE INTO video_clips (id, project_id, path, duration_seconds) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                clip.id,
                clip.project_id,
                clip.path.to_string_lossy(),
                clip.duration_seconds,
            ],
        )?;

        Ok(())
    }

    async fn insert_highlight(&self, highlight: &Highlight) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT OR REPLACE INTO highlights (id, clip_id, start_seconds, end_seconds, color_id, text) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                highlight.id,
                highlight.clip_id,
                highlight.start_seconds,
                highlight.end_seconds,
                highlight.color_id,
                highlight.text,
            ],
        )?;

        Ok(())
    }

    async fn project_highlights(&self, project_id: &str) -> Result<Vec<(VideoClip, Highlight)>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT c.id, c.project_id, c.path, c.duration_seconds, \
                    h.id, h.clip_id, h.start_seconds, h.end_seconds, h.color_id, h.text \
             FROM video_clips c \
             JOIN highlights h ON h.clip_id = c.id \
             WHERE c.project_id = ?1 \
             ORDER BY c.rowid, h.rowid",
        )?;

        let rows = stmt.query_map(params![project_id], |row| {
            let path: String = row.get(2)?;
            Ok((
                VideoClip {
                    id: row.get(0)?,
                    project_id: row.get(1)?,
                    path: PathBuf::from(path),
                    duration_seconds: row.get(3)?,
                },
                Highlight {
                    id: row.get(4)?,
                    clip_id: row.get(5)?,
                    start_seconds: row.get(6)?,
                    end_seconds: row.get(7)?,
                    color_id: row.get(8)?,
                    text: row.get(9)?,
                },
            ))
        })?;

        let result: Vec<(VideoClip, Highlight)> = rows.filter_map(|r| r.ok()).collect();
        debug!(
            "Found {} highlights for project {}",
            result.len(),
            project_id
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded_project(store: &SqliteStore) -> Project {
        let project = Project::new("Test Project");
        store.insert_project(&project).await.unwrap();

        let clip = VideoClip {
            id: "clip1".to_string(),
            project_id: project.id.clone(),
            path: PathBuf::from("/videos/raw.mp4"),
            duration_seconds: 120.0,
        };
        store.insert_clip(&clip).await.unwrap();

        for (i, (start, end)) in [(10.0, 20.0), (30.0, 40.0)].iter().enumerate() {
            store
                .insert_highlight(&Highlight {
                    id: format!("h{}", i + 1),
                    clip_id: clip.id.clone(),
                    start_seconds: *start,
                    end_seconds: *end,
                    color_id: 0,
                    text: format!("highlight {}", i + 1),
                })
                .await
                .unwrap();
        }

        project
    }

    #[tokio::test]
    async fn test_job_round_trip() {
        let store = SqliteStore::in_memory().unwrap();
        let job = ExportJob::new(ExportType::Individual, "p1", "/out");

        store.create_job(&job).await.unwrap();

        let loaded = store.get_job(&job.job_id).await.unwrap().unwrap();
        assert_eq!(loaded.job_id, job.job_id);
        assert_eq!(loaded.export_type, ExportType::Individual);
        assert_eq!(loaded.stage, ExportStage::Pending);
        assert_eq!(loaded.progress, 0.0);
        assert!(loaded.current_file.is_none());
    }

    #[tokio::test]
    async fn test_unknown_job_is_none() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.get_job("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_progress_and_completion() {
        let store = SqliteStore::in_memory().unwrap();
        let job = ExportJob::new(ExportType::Stitched, "p1", "/out");
        store.create_job(&job).await.unwrap();

        store.set_stage(&job.job_id, ExportStage::Extracting).await.unwrap();
        store.set_total_files(&job.job_id, 3).await.unwrap();
        store
            .update_progress(&job.job_id, 1.0 / 3.0, 1, "segment_0.mp4")
            .await
            .unwrap();

        let loaded = store.get_job(&job.job_id).await.unwrap().unwrap();
        assert_eq!(loaded.stage, ExportStage::Extracting);
        assert_eq!(loaded.total_files, 3);
        assert_eq!(loaded.processed_files, 1);
        assert_eq!(loaded.current_file.as_deref(), Some("segment_0.mp4"));

        store.complete_job(&job.job_id, "/out/final.mp4").await.unwrap();

        let loaded = store.get_job(&job.job_id).await.unwrap().unwrap();
        assert_eq!(loaded.stage, ExportStage::Completed);
        assert_eq!(loaded.progress, 1.0);
        assert_eq!(loaded.output_path, "/out/final.mp4");
    }

    #[tokio::test]
    async fn test_terminal_rows_are_immutable() {
        let store = SqliteStore::in_memory().unwrap();
        let job = ExportJob::new(ExportType::Stitched, "p1", "/out");
        store.create_job(&job).await.unwrap();

        store.fail_job(&job.job_id, "No highlights found").await.unwrap();

        // Later writes must not resurrect or alter a terminal row.
        store.set_stage(&job.job_id, ExportStage::Processing).await.unwrap();
        store.cancel_job(&job.job_id).await.unwrap();
        store.complete_job(&job.job_id, "/elsewhere").await.unwrap();
        store.update_progress(&job.job_id, 0.5, 1, "x").await.unwrap();

        let loaded = store.get_job(&job.job_id).await.unwrap().unwrap();
        assert_eq!(loaded.stage, ExportStage::Failed);
        assert_eq!(loaded.error_message.as_deref(), Some("No highlights found"));
        assert_eq!(loaded.processed_files, 0);
        assert_eq!(loaded.output_path, "/out");
    }

    #[tokio::test]
    async fn test_non_terminal_scan() {
        let store = SqliteStore::in_memory().unwrap();

        let running = ExportJob::new(ExportType::Individual, "p1", "/out");
        let done = ExportJob::new(ExportType::Individual, "p1", "/out");
        store.create_job(&running).await.unwrap();
        store.create_job(&done).await.unwrap();

        store.set_stage(&running.job_id, ExportStage::Processing).await.unwrap();
        store.complete_job(&done.job_id, "/out/1.mp4").await.unwrap();

        let open = store.non_terminal_jobs().await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].job_id, running.job_id);
    }

    #[tokio::test]
    async fn test_list_jobs_by_project() {
        let store = SqliteStore::in_memory().unwrap();

        let a = ExportJob::new(ExportType::Individual, "project-a", "/out");
        let b = ExportJob::new(ExportType::Stitched, "project-b", "/out");
        store.create_job(&a).await.unwrap();
        store.create_job(&b).await.unwrap();

        let jobs = store.list_jobs("project-a").await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].job_id, a.job_id);
    }

    #[tokio::test]
    async fn test_project_highlights_ordering() {
        let store = SqliteStore::in_memory().unwrap();
        let project = seeded_project(&store).await;

        let highlights = store.project_highlights(&project.id).await.unwrap();
        assert_eq!(highlights.len(), 2);
        assert_eq!(highlights[0].1.start_seconds, 10.0);
        assert_eq!(highlights[1].1.start_seconds, 30.0);
        assert_eq!(highlights[0].0.path, PathBuf::from("/videos/raw.mp4"));
    }

    #[tokio::test]
    async fn test_project_without_highlights_is_empty() {
        let store = SqliteStore::in_memory().unwrap();
        let project = Project::new("Empty");
        store.insert_project(&project).await.unwrap();

        let highlights = store.project_highlights(&project.id).await.unwrap();
        assert!(highlights.is_empty());
    }
}
