//! CLI command implementations.

mod cancel;
mod doctor;
mod export;
mod import;
mod init;
mod jobs;
mod transcribe;

pub use cancel::run_cancel;
pub use doctor::run_doctor;
pub use export::run_export;
pub use import::run_import;
pub use init::run_init;
pub use jobs::run_jobs;
pub use transcribe::run_transcribe;
