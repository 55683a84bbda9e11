//! Import command - load a project description from JSON.

use crate::cli::Output;
use crate::config::Settings;
use crate::media::{FfmpegTool, MediaTool};
use crate::project::{Highlight, Project, ProjectSpec, VideoClip};
use crate::store::{ProjectStore, SqliteStore};
use std::path::Path;
use uuid::Uuid;

pub async fn run_import(file: &str, settings: Settings) -> anyhow::Result<()> {
    let spec = ProjectSpec::load(Path::new(file))?;
    let store = SqliteStore::new(&settings.sqlite_path())?;
    let media_tool = FfmpegTool::new();

    let project = Project::new(&spec.name);
    store.insert_project(&project).await?;

    let mut clip_count = 0;
    let mut highlight_count = 0;

    for clip_spec in &spec.clips {
        let duration_seconds = if clip_spec.duration_seconds > 0.0 {
            clip_spec.duration_seconds
        } else if clip_spec.path.exists() {
            match media_tool.probe_duration(&clip_spec.path).await {
                Ok(duration) => duration,
                Err(e) => {
                    Output::warning(&format!(
                        "Could not probe {}: {}",
                        clip_spec.path.display(),
                        e
                    ));
                    0.0
                }
            }
        } else {
            0.0
        };

        let clip = VideoClip {
            id: Uuid::new_v4().to_string(),
            project_id: project.id.clone(),
            path: clip_spec.path.clone(),
            duration_seconds,
        };
        store.insert_clip(&clip).await?;
        clip_count += 1;

        for highlight_spec in &clip_spec.highlights {
            store
                .insert_highlight(&Highlight {
                    id: Uuid::new_v4().to_string(),
                    clip_id: clip.id.clone(),
                    start_seconds: highlight_spec.start_seconds,
                    end_seconds: highlight_spec.end_seconds,
                    color_id: highlight_spec.color_id,
                    text: highlight_spec.text.clone(),
                })
                .await?;
            highlight_count += 1;
        }
    }

    Output::success(&format!("Imported project '{}'", spec.name));
    Output::kv("Project ID", &project.id);
    Output::kv("Clips", &clip_count.to_string());
    Output::kv("Highlights", &highlight_count.to_string());

    Ok(())
}
