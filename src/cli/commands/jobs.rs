//! Jobs command - list export jobs for a project.

use crate::cli::Output;
use crate::config::Settings;
use crate::store::{JobStore, SqliteStore};

pub async fn run_jobs(project_id: &str, settings: Settings) -> anyhow::Result<()> {
    let store = SqliteStore::new(&settings.sqlite_path())?;

    let jobs = store.list_jobs(project_id).await?;

    if jobs.is_empty() {
        Output::info(&format!("No export jobs for project {}", project_id));
        return Ok(());
    }

    Output::header(&format!("Export jobs for {}", project_id));
    for job in jobs {
        let detail = match (&job.error_message, job.total_files) {
            (Some(err), _) => err.clone(),
            (None, 0) => job.export_type.to_string(),
            (None, total) => format!(
                "{} ({}/{} files)",
                job.export_type, job.processed_files, total
            ),
        };
        Output::job_line(&job.job_id, &job.stage.to_string(), job.progress, &detail);
    }

    Ok(())
}
