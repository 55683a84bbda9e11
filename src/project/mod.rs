//! Project, clip, and highlight data model.
//!
//! Highlights are supplied externally (the editor surface owns their
//! CRUD); the export engine treats the set of highlights across a
//! project's clips as its unit of work and never mutates them.

use crate::error::{KlippError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A project groups video clips and their highlights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

/// A source video clip belonging to a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoClip {
    pub id: String,
    pub project_id: String,
    pub path: PathBuf,
    pub duration_seconds: f64,
}

/// A user-selected time range within a clip, destined for export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Highlight {
    pub id: String,
    pub clip_id: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub color_id: i64,
    pub text: String,
}

impl Highlight {
    /// Validate the time range. Negative or inverted timestamps are data
    /// errors surfaced during background processing, never a panic.
    pub fn validate(&self) -> Result<()> {
        if self.start_seconds < 0.0 || self.end_seconds < 0.0 {
            return Err(KlippError::Export(format!(
                "Invalid highlight times: negative timestamp ({:.2}s - {:.2}s)",
                self.start_seconds, self.end_seconds
            )));
        }
        if self.end_seconds <= self.start_seconds {
            return Err(KlippError::Export(format!(
                "Invalid highlight times: end {:.2}s is not after start {:.2}s",
                self.end_seconds, self.start_seconds
            )));
        }
        Ok(())
    }
}

/// Sanitize a project name for use in output file and directory names.
pub fn sanitize_project_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() {
        "project".to_string()
    } else {
        sanitized
    }
}

// ============================================================================
// JSON import (CLI convenience; the engine itself never writes highlights)
// ============================================================================

/// JSON description of a project to import.
#[derive(Debug, Deserialize)]
pub struct ProjectSpec {
    pub name: String,
    pub clips: Vec<ClipSpec>,
}

#[derive(Debug, Deserialize)]
pub struct ClipSpec {
    pub path: PathBuf,
    #[serde(default)]
    pub duration_seconds: f64,
    #[serde(default)]
    pub highlights: Vec<HighlightSpec>,
}

#[derive(Debug, Deserialize)]
pub struct HighlightSpec {
    pub start_seconds: f64,
    pub end_seconds: f64,
    #[serde(default)]
    pub color_id: i64,
    #[serde(default)]
    pub text: String,
}

impl ProjectSpec {
    /// Load a project description from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let spec: ProjectSpec = serde_json::from_str(&content)?;
        Ok(spec)
    }
}
