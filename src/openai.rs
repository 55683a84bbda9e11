//! OpenAI client configuration with sensible defaults.

use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Timeout for chunk transcription requests (2 minutes).
///
/// Long enough for a 10-minute audio chunk to upload and transcribe,
/// short enough that a hung call fails instead of stalling the whole batch.
pub const TRANSCRIPTION_TIMEOUT_SECS: u64 = 120;

/// Timeout for short API calls such as key validation (30 seconds).
pub const SHORT_CALL_TIMEOUT_SECS: u64 = 30;

/// Create an OpenAI client configured for transcription calls.
pub fn create_transcription_client() -> Client<OpenAIConfig> {
    create_client_with_timeout(Duration::from_secs(TRANSCRIPTION_TIMEOUT_SECS))
}

/// Create an OpenAI client with a custom timeout.
pub fn create_client_with_timeout(timeout: Duration) -> Client<OpenAIConfig> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .expect("Failed to create HTTP client");

    Client::with_config(OpenAIConfig::default()).with_http_client(http_client)
}

/// Check if the OpenAI API key is configured.
pub fn is_api_key_configured() -> bool {
    std::env::var("OPENAI_API_KEY").is_ok_and(|k| !k.is_empty())
}
