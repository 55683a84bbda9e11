//! Configuration module for Klipp.
//!
//! Handles loading and managing application settings.

mod settings;

pub use settings::{
    ChunkingSettings, ExportSettings, GeneralSettings, Settings, StoreSettings,
    TranscriptionSettings,
};
