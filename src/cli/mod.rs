//! CLI module for Klipp.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Klipp - Highlight Export and Transcription
///
/// A local-first tool for transcribing spoken-word video and exporting
/// highlight clips. The name "Klipp" comes from the Norwegian/Scandinavian
/// word for "cut."
#[derive(Parser, Debug)]
#[command(name = "klipp")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize Klipp and write the default configuration
    Init,

    /// Check system requirements and configuration
    Doctor,

    /// Transcribe a local audio or video file
    Transcribe {
        /// Local audio/video file path
        input: String,

        /// Output transcript to file (stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,

        /// Output format (text, json, srt, vtt)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Import a project with clips and highlights from a JSON file
    Import {
        /// Path to the project description JSON
        file: String,
    },

    /// Export a project's highlights as video files
    Export {
        /// Project ID to export
        project_id: String,

        /// Export mode (stitched, individual)
        #[arg(short, long, default_value = "stitched")]
        mode: String,

        /// Output folder (defaults to the configured export directory)
        #[arg(short, long)]
        output: Option<String>,

        /// Return the job ID immediately instead of waiting for completion
        #[arg(long)]
        detach: bool,
    },

    /// List export jobs for a project
    Jobs {
        /// Project ID
        project_id: String,
    },

    /// Cancel a running export job
    Cancel {
        /// Job ID to cancel
        job_id: String,
    },
}
