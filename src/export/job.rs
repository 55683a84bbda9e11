//! Export job state machine types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which export workflow a job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportType {
    /// Concatenate all highlight segments into one output file.
    Stitched,
    /// One output file per highlight.
    Individual,
}

impl std::str::FromStr for ExportType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stitched" => Ok(ExportType::Stitched),
            "individual" => Ok(ExportType::Individual),
            _ => Err(format!("Unknown export type: {}", s)),
        }
    }
}

impl std::fmt::Display for ExportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportType::Stitched => write!(f, "stitched"),
            ExportType::Individual => write!(f, "individual"),
        }
    }
}

/// Lifecycle stage of an export job.
///
/// Stages only move forward: `pending → preparing → extracting|processing`
/// and then exactly one of the terminal stages. Once terminal, the job
/// record is immutable except for being queryable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportStage {
    Pending,
    Preparing,
    Extracting,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl ExportStage {
    /// Whether this stage ends the job.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExportStage::Completed | ExportStage::Failed | ExportStage::Cancelled
        )
    }

    /// Position in the forward-only ordering; terminal stages share a rank.
    fn rank(&self) -> u8 {
        match self {
            ExportStage::Pending => 0,
            ExportStage::Preparing => 1,
            ExportStage::Extracting => 2,
            ExportStage::Processing => 3,
            ExportStage::Completed | ExportStage::Failed | ExportStage::Cancelled => 4,
        }
    }

    /// Whether moving to `next` respects stage monotonicity.
    pub fn can_transition_to(&self, next: ExportStage) -> bool {
        !self.is_terminal() && next.rank() >= self.rank()
    }
}

impl std::str::FromStr for ExportStage {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ExportStage::Pending),
            "preparing" => Ok(ExportStage::Preparing),
            "extracting" => Ok(ExportStage::Extracting),
            "processing" => Ok(ExportStage::Processing),
            "completed" => Ok(ExportStage::Completed),
            "failed" => Ok(ExportStage::Failed),
            "cancelled" => Ok(ExportStage::Cancelled),
            _ => Err(format!("Unknown export stage: {}", s)),
        }
    }
}

impl std::fmt::Display for ExportStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExportStage::Pending => "pending",
            ExportStage::Preparing => "preparing",
            ExportStage::Extracting => "extracting",
            ExportStage::Processing => "processing",
            ExportStage::Completed => "completed",
            ExportStage::Failed => "failed",
            ExportStage::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// Durable record of one export job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportJob {
    pub job_id: String,
    pub export_type: ExportType,
    pub project_id: String,
    pub output_path: String,
    pub stage: ExportStage,
    /// Fraction of work units completed, in `[0, 1]`.
    pub progress: f64,
    /// File most recently produced, if any.
    pub current_file: Option<String>,
    pub total_files: usize,
    pub processed_files: usize,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ExportJob {
    /// Create a new job in stage `pending`.
    pub fn new(export_type: ExportType, project_id: &str, output_path: &str) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            export_type,
            project_id: project_id.to_string(),
            output_path: output_path.to_string(),
            stage: ExportStage::Pending,
            progress: 0.0,
            current_file: None,
            total_files: 0,
            processed_files: 0,
            error_message: None,
            created_at: Utc::now(),
        }
    }
}
