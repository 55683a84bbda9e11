//! Export command - run highlight export jobs.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::export::{ExportOrchestrator, ExportStage, ExportType};
use crate::media::FfmpegTool;
use crate::store::{JobStore, SqliteStore};
use std::sync::Arc;
use std::time::Duration;

pub async fn run_export(
    project_id: &str,
    mode: &str,
    output: Option<String>,
    detach: bool,
    settings: Settings,
) -> anyhow::Result<()> {
    preflight::check(Operation::Export)?;

    let export_type: ExportType = mode.parse().map_err(|e: String| anyhow::anyhow!(e))?;

    let store = Arc::new(SqliteStore::new(&settings.sqlite_path())?);
    let orchestrator =
        ExportOrchestrator::new(store.clone(), store.clone(), Arc::new(FfmpegTool::new()));

    // Jobs orphaned by a previous crash can never resume; close them out
    // before starting new work.
    let recovered = orchestrator.recover_interrupted_jobs().await?;
    if recovered > 0 {
        Output::warning(&format!(
            "Marked {} interrupted job(s) from a previous run as failed",
            recovered
        ));
    }

    let output_folder = output
        .map(|o| Settings::expand_path(&o))
        .unwrap_or_else(|| settings.export_dir());

    let job_id = match export_type {
        ExportType::Stitched => {
            orchestrator
                .export_stitched(project_id, &output_folder)
                .await?
        }
        ExportType::Individual => {
            orchestrator
                .export_individual(project_id, &output_folder)
                .await?
        }
    };

    Output::info(&format!("Started {} export job {}", export_type, job_id));

    if detach {
        Output::kv("Poll with", &format!("klipp jobs {}", project_id));
        return Ok(());
    }

    let poll_interval = Duration::from_millis(settings.export.poll_interval_ms);
    let mut bar: Option<indicatif::ProgressBar> = None;

    let final_job = loop {
        tokio::time::sleep(poll_interval).await;

        let Some(job) = store.get_job(&job_id).await? else {
            anyhow::bail!("Job {} disappeared from the store", job_id);
        };

        if job.total_files > 0 {
            let pb = bar.get_or_insert_with(|| {
                Output::progress_bar(job.total_files as u64, "exporting")
            });
            pb.set_position(job.processed_files as u64);
            if let Some(current) = &job.current_file {
                pb.set_message(current.clone());
            }
        }

        if job.stage.is_terminal() {
            break job;
        }
    };

    if let Some(pb) = bar {
        pb.finish_and_clear();
    }

    match final_job.stage {
        ExportStage::Completed => {
            Output::success(&format!("Export complete: {}", final_job.output_path));
        }
        ExportStage::Cancelled => {
            Output::warning("Export cancelled");
        }
        ExportStage::Failed => {
            anyhow::bail!(
                "Export failed: {}",
                final_job
                    .error_message
                    .unwrap_or_else(|| "unknown error".to_string())
            );
        }
        _ => unreachable!("loop exits only on terminal stages"),
    }

    Ok(())
}
