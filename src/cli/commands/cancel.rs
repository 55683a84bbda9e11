//! Cancel command - stop a running export job.

use crate::cli::Output;
use crate::config::Settings;
use crate::store::{JobStore, SqliteStore};

pub async fn run_cancel(job_id: &str, settings: Settings) -> anyhow::Result<()> {
    let store = SqliteStore::new(&settings.sqlite_path())?;

    match store.get_job(job_id).await? {
        None => anyhow::bail!("No job with id {}", job_id),
        Some(job) if job.stage.is_terminal() => {
            Output::warning(&format!("Job {} is already {}", job_id, job.stage));
        }
        Some(_) => {
            // The job's task (if still alive) belongs to the process that
            // started it; marking the row cancelled here makes the
            // terminal state authoritative either way.
            store.cancel_job(job_id).await?;
            Output::success(&format!("Job {} marked cancelled", job_id));
        }
    }

    Ok(())
}
