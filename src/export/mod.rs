//! Export job engine for Klipp.
//!
//! Extracts and stitches highlight video segments as long-running,
//! cancellable background jobs. Job state is persisted to the store after
//! every unit of work, so pollers and crash recovery always have a
//! consistent view.

mod job;
mod orchestrator;
mod registry;

pub use job::{ExportJob, ExportStage, ExportType};
pub use orchestrator::ExportOrchestrator;
pub use registry::{ActiveJobHandle, JobRegistry};
