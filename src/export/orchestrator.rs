//! Export job orchestration.
//!
//! Drives the stitched and individual export workflows as background
//! tasks. The caller gets a job ID synchronously and polls the job store;
//! cancellation is cooperative, observed between units of work.

use super::job::{ExportJob, ExportStage, ExportType};
use super::registry::JobRegistry;
use crate::error::{KlippError, Result};
use crate::media::MediaTool;
use crate::project::{sanitize_project_name, Highlight, Project, VideoClip};
use crate::store::{JobStore, ProjectStore};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, instrument, warn};

/// How a background export task ended. Failures are reported as errors
/// and marked on the job row by the task wrapper.
enum JobOutcome {
    Completed,
    Cancelled,
}

/// Orchestrates background export jobs over the media tool and job store.
#[derive(Clone)]
pub struct ExportOrchestrator {
    jobs: Arc<dyn JobStore>,
    projects: Arc<dyn ProjectStore>,
    media_tool: Arc<dyn MediaTool>,
    registry: Arc<JobRegistry>,
}

impl ExportOrchestrator {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        projects: Arc<dyn ProjectStore>,
        media_tool: Arc<dyn MediaTool>,
    ) -> Self {
        Self {
            jobs,
            projects,
            media_tool,
            registry: Arc::new(JobRegistry::new()),
        }
    }

    /// Start a stitched export: all highlights concatenated into one file.
    ///
    /// Returns the job ID immediately; the work continues in the background.
    pub async fn export_stitched(&self, project_id: &str, output_folder: &Path) -> Result<String> {
        self.start_export(ExportType::Stitched, project_id, output_folder)
            .await
    }

    /// Start an individual export: one file per highlight.
    pub async fn export_individual(
        &self,
        project_id: &str,
        output_folder: &Path,
    ) -> Result<String> {
        self.start_export(ExportType::Individual, project_id, output_folder)
            .await
    }

    /// Signal cancellation to a running job.
    ///
    /// The job observes the signal at its next checkpoint between units of
    /// work, never mid-extraction.
    pub async fn cancel(&self, job_id: &str) -> Result<()> {
        if self.registry.request_cancel(job_id) {
            info!("Cancellation requested for job {}", job_id);
            Ok(())
        } else {
            Err(KlippError::InvalidInput(format!(
                "No active job with id {}",
                job_id
            )))
        }
    }

    /// Mark every non-terminal job left over from a previous process as
    /// failed.
    ///
    /// Resuming a partially written export safely would require idempotent,
    /// resumable extraction, which this design deliberately avoids.
    #[instrument(skip(self))]
    pub async fn recover_interrupted_jobs(&self) -> Result<usize> {
        let interrupted = self.jobs.non_terminal_jobs().await?;
        let count = interrupted.len();

        for job in &interrupted {
            warn!(
                "Marking interrupted job {} (stage {}) as failed",
                job.job_id, job.stage
            );
            self.jobs
                .fail_job(&job.job_id, "Job interrupted by restart before completion")
                .await?;
        }

        if count > 0 {
            info!("Recovered {} interrupted job(s)", count);
        }
        Ok(count)
    }

    /// Validate, persist, and launch a new export job.
    ///
    /// Project existence is the only synchronous failure mode besides an
    /// empty output path; everything else surfaces through the job row.
    #[instrument(skip(self), fields(project_id = %project_id))]
    async fn start_export(
        &self,
        export_type: ExportType,
        project_id: &str,
        output_folder: &Path,
    ) -> Result<String> {
        if output_folder.as_os_str().is_empty() {
            return Err(KlippError::InvalidInput(
                "Output path must not be empty".to_string(),
            ));
        }

        let project = self
            .projects
            .get_project(project_id)
            .await?
            .ok_or_else(|| KlippError::ProjectNotFound(project_id.to_string()))?;

        let job = ExportJob::new(export_type, project_id, &output_folder.to_string_lossy());
        self.jobs.create_job(&job).await?;

        let cancel_rx = self.registry.register(&job.job_id);

        info!("Starting {} export job {}", export_type, job.job_id);

        let worker = self.clone();
        let job_id = job.job_id.clone();
        let task_job_id = job_id.clone();
        let output_folder = output_folder.to_path_buf();
        tokio::spawn(async move {
            worker
                .run_job(task_job_id, export_type, project, output_folder, cancel_rx)
                .await;
        });

        Ok(job_id)
    }

    /// Background task wrapper: marks the row failed on error and always
    /// drops the in-memory handle at the end.
    async fn run_job(
        &self,
        job_id: String,
        export_type: ExportType,
        project: Project,
        output_folder: PathBuf,
        mut cancel_rx: mpsc::Receiver<()>,
    ) {
        let outcome = self
            .process_job(&job_id, export_type, &project, &output_folder, &mut cancel_rx)
            .await;

        match outcome {
            Ok(JobOutcome::Completed) => info!("Export job {} completed", job_id),
            Ok(JobOutcome::Cancelled) => info!("Export job {} cancelled", job_id),
            Err(e) => {
                let message = e.to_string();
                error!("Export job {} failed: {}", job_id, message);
                if let Err(store_err) = self.jobs.fail_job(&job_id, &message).await {
                    error!("Failed to record job failure: {}", store_err);
                }
            }
        }

        self.registry.deregister(&job_id);
    }

    async fn process_job(
        &self,
        job_id: &str,
        export_type: ExportType,
        project: &Project,
        output_folder: &Path,
        cancel_rx: &mut mpsc::Receiver<()>,
    ) -> Result<JobOutcome> {
        self.jobs.set_stage(job_id, ExportStage::Preparing).await?;

        let highlights = self.projects.project_highlights(&project.id).await?;
        if highlights.is_empty() {
            // Expected terminal outcome for empty projects, not a bug.
            return Err(KlippError::Export("No highlights found".to_string()));
        }

        let total = highlights.len();
        self.jobs.set_total_files(job_id, total).await?;

        match export_type {
            ExportType::Individual => {
                self.run_individual(job_id, project, output_folder, &highlights, cancel_rx)
                    .await
            }
            ExportType::Stitched => {
                self.run_stitched(job_id, project, output_folder, &highlights, cancel_rx)
                    .await
            }
        }
    }

    /// One output file per highlight, numbered by ordinal position inside
    /// a project-named subdirectory.
    async fn run_individual(
        &self,
        job_id: &str,
        project: &Project,
        output_folder: &Path,
        highlights: &[(VideoClip, Highlight)],
        cancel_rx: &mut mpsc::Receiver<()>,
    ) -> Result<JobOutcome> {
        self.jobs.set_stage(job_id, ExportStage::Processing).await?;

        let project_dir = output_folder.join(sanitize_project_name(&project.name));
        tokio::fs::create_dir_all(&project_dir)
            .await
            .map_err(|e| {
                KlippError::Export(format!("Failed to create project directory: {}", e))
            })?;

        let total = highlights.len();

        for (index, (clip, highlight)) in highlights.iter().enumerate() {
            if cancel_rx.try_recv().is_ok() {
                self.jobs.cancel_job(job_id).await?;
                return Ok(JobOutcome::Cancelled);
            }

            highlight.validate()?;

            let dest = project_dir.join(format!("{}.mp4", index + 1));
            self.media_tool
                .extract_video_segment(
                    &clip.path,
                    highlight.start_seconds,
                    highlight.end_seconds,
                    &dest,
                )
                .await?;

            let processed = index + 1;
            self.jobs
                .update_progress(
                    job_id,
                    processed as f64 / total as f64,
                    processed,
                    &dest.to_string_lossy(),
                )
                .await?;
        }

        self.jobs
            .complete_job(job_id, &project_dir.to_string_lossy())
            .await?;
        Ok(JobOutcome::Completed)
    }

    /// Extract every highlight into a scoped temp dir, then concatenate
    /// into a single timestamped output file.
    async fn run_stitched(
        &self,
        job_id: &str,
        project: &Project,
        output_folder: &Path,
        highlights: &[(VideoClip, Highlight)],
        cancel_rx: &mut mpsc::Receiver<()>,
    ) -> Result<JobOutcome> {
        self.jobs.set_stage(job_id, ExportStage::Extracting).await?;

        tokio::fs::create_dir_all(output_folder).await.map_err(|e| {
            KlippError::Export(format!("Failed to create output directory: {}", e))
        })?;

        // Segment files live here until the concat step; dropping the
        // guard removes them on every exit path.
        let segment_dir = tempfile::tempdir()?;
        let total = highlights.len();
        let mut segment_paths = Vec::with_capacity(total);

        for (index, (clip, highlight)) in highlights.iter().enumerate() {
            if cancel_rx.try_recv().is_ok() {
                self.jobs.cancel_job(job_id).await?;
                return Ok(JobOutcome::Cancelled);
            }

            highlight.validate()?;

            let dest = segment_dir.path().join(format!("segment_{:03}.mp4", index));
            self.media_tool
                .extract_video_segment(
                    &clip.path,
                    highlight.start_seconds,
                    highlight.end_seconds,
                    &dest,
                )
                .await?;

            segment_paths.push(dest.clone());

            let processed = index + 1;
            self.jobs
                .update_progress(
                    job_id,
                    processed as f64 / total as f64,
                    processed,
                    &dest.to_string_lossy(),
                )
                .await?;
        }

        // Last checkpoint before the concat; the mux itself is not
        // interruptible.
        if cancel_rx.try_recv().is_ok() {
            self.jobs.cancel_job(job_id).await?;
            return Ok(JobOutcome::Cancelled);
        }

        self.jobs.set_stage(job_id, ExportStage::Processing).await?;

        let file_name = format!(
            "{}_stitched_{}.mp4",
            sanitize_project_name(&project.name),
            Utc::now().format("%Y%m%d_%H%M%S")
        );
        let output_path = output_folder.join(file_name);

        self.media_tool
            .concat_segments(&segment_paths, &output_path)
            .await?;

        self.jobs
            .complete_job(job_id, &output_path.to_string_lossy())
            .await?;
        Ok(JobOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Semaphore;

    /// Media tool that writes empty output files, with an optional gate
    /// that blocks extractions until the test releases permits.
    struct MockMediaTool {
        extract_calls: AtomicUsize,
        extract_gate: Option<Arc<Semaphore>>,
        started_tx: Option<mpsc::UnboundedSender<()>>,
        fail_extraction: bool,
    }

    impl Default for MockMediaTool {
        fn default() -> Self {
            Self {
                extract_calls: AtomicUsize::new(0),
                extract_gate: None,
                started_tx: None,
                fail_extraction: false,
            }
        }
    }

    #[async_trait]
    impl MediaTool for MockMediaTool {
        async fn extract_audio_chunk(
            &self,
            _source: &Path,
            _start: f64,
            _duration: f64,
            _dest: &Path,
        ) -> Result<()> {
            unimplemented!()
        }

        async fn extract_video_segment(
            &self,
            _source: &Path,
            _start: f64,
            _end: f64,
            dest: &Path,
        ) -> Result<()> {
            self.extract_calls.fetch_add(1, Ordering::SeqCst);

            if let Some(tx) = &self.started_tx {
                let _ = tx.send(());
            }
            if let Some(gate) = &self.extract_gate {
                gate.acquire().await.expect("gate closed").forget();
            }
            if self.fail_extraction {
                return Err(KlippError::MediaTool(
                    "Failed to extract segment: simulated".to_string(),
                ));
            }

            std::fs::write(dest, b"segment")?;
            Ok(())
        }

        async fn concat_segments(&self, segments: &[PathBuf], dest: &Path) -> Result<()> {
            assert!(!segments.is_empty());
            std::fs::write(dest, b"stitched")?;
            Ok(())
        }

        async fn extract_audio_track(&self, _video: &Path, _dest: &Path) -> Result<()> {
            unimplemented!()
        }

        async fn probe_duration(&self, _path: &Path) -> Result<f64> {
            unimplemented!()
        }
    }

    fn orchestrator_with(tool: MockMediaTool) -> (ExportOrchestrator, Arc<SqliteStore>, Arc<MockMediaTool>) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let tool = Arc::new(tool);
        let orchestrator =
            ExportOrchestrator::new(store.clone(), store.clone(), tool.clone());
        (orchestrator, store, tool)
    }

    async fn seed_project(
        store: &SqliteStore,
        name: &str,
        highlight_ranges: &[(f64, f64)],
    ) -> Project {
        let project = Project::new(name);
        store.insert_project(&project).await.unwrap();

        let clip = VideoClip {
            id: format!("{}-clip", project.id),
            project_id: project.id.clone(),
            path: PathBuf::from("/videos/source.mp4"),
            duration_seconds: 300.0,
        };
        store.insert_clip(&clip).await.unwrap();

        for (i, (start, end)) in highlight_ranges.iter().enumerate() {
            store
                .insert_highlight(&Highlight {
                    id: format!("{}-h{}", project.id, i),
                    clip_id: clip.id.clone(),
                    start_seconds: *start,
                    end_seconds: *end,
                    color_id: 0,
                    text: String::new(),
                })
                .await
                .unwrap();
        }

        project
    }

    async fn wait_for_terminal(store: &SqliteStore, job_id: &str) -> ExportJob {
        for _ in 0..500 {
            let job = store.get_job(job_id).await.unwrap().unwrap();
            if job.stage.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job {} never reached a terminal stage", job_id);
    }

    #[tokio::test]
    async fn test_unknown_project_fails_synchronously() {
        let (orchestrator, _store, _tool) = orchestrator_with(MockMediaTool::default());

        let err = orchestrator
            .export_individual("missing", Path::new("/tmp/out"))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("failed to get project"));
    }

    #[tokio::test]
    async fn test_empty_output_path_is_rejected() {
        let (orchestrator, store, _tool) = orchestrator_with(MockMediaTool::default());
        let project = seed_project(&store, "Demo", &[(1.0, 2.0)]).await;

        let err = orchestrator
            .export_individual(&project.id, Path::new(""))
            .await
            .unwrap_err();

        assert!(matches!(err, KlippError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_no_highlights_job_fails_with_message() {
        let (orchestrator, store, _tool) = orchestrator_with(MockMediaTool::default());
        let project = seed_project(&store, "Empty", &[]).await;

        let out = tempfile::tempdir().unwrap();
        let job_id = orchestrator
            .export_individual(&project.id, out.path())
            .await
            .unwrap();

        let job = wait_for_terminal(&store, &job_id).await;
        assert_eq!(job.stage, ExportStage::Failed);
        assert!(job.error_message.unwrap().contains("No highlights found"));
    }

    #[tokio::test]
    async fn test_individual_export_writes_ordinal_files() {
        let (orchestrator, store, tool) = orchestrator_with(MockMediaTool::default());
        let project = seed_project(&store, "My Project", &[(10.0, 20.0), (30.0, 40.0)]).await;

        let out = tempfile::tempdir().unwrap();
        let job_id = orchestrator
            .export_individual(&project.id, out.path())
            .await
            .unwrap();

        let job = wait_for_terminal(&store, &job_id).await;
        assert_eq!(job.stage, ExportStage::Completed);
        assert_eq!(job.progress, 1.0);
        assert_eq!(job.total_files, 2);
        assert_eq!(job.processed_files, 2);

        let project_dir = out.path().join("My_Project");
        assert!(project_dir.join("1.mp4").exists());
        assert!(project_dir.join("2.mp4").exists());
        assert_eq!(job.output_path, project_dir.to_string_lossy());
        assert_eq!(tool.extract_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stitched_export_produces_single_file() {
        let (orchestrator, store, _tool) = orchestrator_with(MockMediaTool::default());
        let project = seed_project(&store, "Talk", &[(10.0, 20.0), (30.0, 40.0)]).await;

        let out = tempfile::tempdir().unwrap();
        let job_id = orchestrator
            .export_stitched(&project.id, out.path())
            .await
            .unwrap();

        let job = wait_for_terminal(&store, &job_id).await;
        assert_eq!(job.stage, ExportStage::Completed);

        let outputs: Vec<_> = std::fs::read_dir(out.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "mp4"))
            .collect();
        assert_eq!(outputs.len(), 1);

        let name = outputs[0].file_name().to_string_lossy().to_string();
        assert!(name.starts_with("Talk_stitched_"));
        assert_eq!(job.output_path, outputs[0].path().to_string_lossy());
    }

    #[tokio::test]
    async fn test_invalid_highlight_times_fail_the_job() {
        let (orchestrator, store, _tool) = orchestrator_with(MockMediaTool::default());
        let project = seed_project(&store, "Bad", &[(20.0, 10.0)]).await;

        let out = tempfile::tempdir().unwrap();
        let job_id = orchestrator
            .export_individual(&project.id, out.path())
            .await
            .unwrap();

        let job = wait_for_terminal(&store, &job_id).await;
        assert_eq!(job.stage, ExportStage::Failed);
        assert!(job.error_message.unwrap().contains("Invalid highlight times"));
    }

    #[tokio::test]
    async fn test_extraction_failure_fails_the_job() {
        let tool = MockMediaTool {
            fail_extraction: true,
            ..Default::default()
        };
        let (orchestrator, store, _tool) = orchestrator_with(tool);
        let project = seed_project(&store, "Broken", &[(1.0, 2.0)]).await;

        let out = tempfile::tempdir().unwrap();
        let job_id = orchestrator
            .export_individual(&project.id, out.path())
            .await
            .unwrap();

        let job = wait_for_terminal(&store, &job_id).await;
        assert_eq!(job.stage, ExportStage::Failed);
        assert!(job
            .error_message
            .unwrap()
            .contains("Failed to extract segment"));
    }

    #[tokio::test]
    async fn test_cooperative_cancellation_between_units() {
        let gate = Arc::new(Semaphore::new(0));
        let (started_tx, mut started_rx) = mpsc::unbounded_channel();

        let tool = MockMediaTool {
            extract_gate: Some(gate.clone()),
            started_tx: Some(started_tx),
            ..Default::default()
        };
        let (orchestrator, store, _tool) = orchestrator_with(tool);
        let project =
            seed_project(&store, "Long", &[(0.0, 10.0), (20.0, 30.0), (40.0, 50.0)]).await;

        let out = tempfile::tempdir().unwrap();
        let job_id = orchestrator
            .export_individual(&project.id, out.path())
            .await
            .unwrap();

        // Cancel while the first extraction is still in flight, then let
        // it finish. The signal is only observed at the next checkpoint.
        started_rx.recv().await.expect("first extraction started");
        orchestrator.cancel(&job_id).await.unwrap();
        gate.add_permits(8);

        let job = wait_for_terminal(&store, &job_id).await;
        assert_eq!(job.stage, ExportStage::Cancelled);
        assert!(job.processed_files <= 1);
    }

    #[tokio::test]
    async fn test_cancel_unknown_job_is_an_error() {
        let (orchestrator, _store, _tool) = orchestrator_with(MockMediaTool::default());
        assert!(orchestrator.cancel("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_exports_are_isolated() {
        let (orchestrator, store, _tool) = orchestrator_with(MockMediaTool::default());
        let alpha = seed_project(&store, "Alpha", &[(1.0, 2.0)]).await;
        let beta = seed_project(&store, "Beta", &[(3.0, 4.0)]).await;

        let out_a = tempfile::tempdir().unwrap();
        let out_b = tempfile::tempdir().unwrap();

        let job_a = orchestrator
            .export_individual(&alpha.id, out_a.path())
            .await
            .unwrap();
        let job_b = orchestrator
            .export_individual(&beta.id, out_b.path())
            .await
            .unwrap();

        assert_ne!(job_a, job_b);

        let done_a = wait_for_terminal(&store, &job_a).await;
        let done_b = wait_for_terminal(&store, &job_b).await;
        assert_eq!(done_a.stage, ExportStage::Completed);
        assert_eq!(done_b.stage, ExportStage::Completed);

        assert!(out_a.path().join("Alpha").join("1.mp4").exists());
        assert!(out_b.path().join("Beta").join("1.mp4").exists());
        assert!(!out_a.path().join("Beta").exists());
        assert!(!out_b.path().join("Alpha").exists());
    }

    #[tokio::test]
    async fn test_recovery_marks_interrupted_jobs_failed() {
        let (orchestrator, store, _tool) = orchestrator_with(MockMediaTool::default());

        // Simulate rows left behind by a crashed process.
        let mut orphan = ExportJob::new(ExportType::Stitched, "p1", "/out");
        orphan.stage = ExportStage::Pending;
        store.create_job(&orphan).await.unwrap();
        store
            .set_stage(&orphan.job_id, ExportStage::Extracting)
            .await
            .unwrap();

        let finished = ExportJob::new(ExportType::Stitched, "p1", "/out");
        store.create_job(&finished).await.unwrap();
        store.complete_job(&finished.job_id, "/out/a.mp4").await.unwrap();

        let recovered = orchestrator.recover_interrupted_jobs().await.unwrap();
        assert_eq!(recovered, 1);

        let job = store.get_job(&orphan.job_id).await.unwrap().unwrap();
        assert_eq!(job.stage, ExportStage::Failed);
        assert!(job.error_message.unwrap().contains("interrupted"));

        // The completed row is untouched.
        let job = store.get_job(&finished.job_id).await.unwrap().unwrap();
        assert_eq!(job.stage, ExportStage::Completed);
    }
}
