//! Wire types for the Ollama HTTP API.

use serde::{Deserialize, Serialize};

/// Body for `POST /api/generate`.
#[derive(Debug, Serialize)]
pub struct OllamaGenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub stream: bool,
    pub options: OllamaOptions,
}

#[derive(Debug, Default, Serialize)]
pub struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Ollama's name for the max-token bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
}

/// One response object from `/api/generate`. In streaming mode the endpoint
/// emits one of these per line (NDJSON) with `done: false` until the final
/// line, which carries `done: true` plus the token counters.
#[derive(Debug, Deserialize)]
pub struct OllamaGenerateResponse {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub response: String,
    pub done: bool,
    #[serde(default)]
    pub done_reason: Option<String>,
    #[serde(default)]
    pub prompt_eval_count: u32,
    #[serde(default)]
    pub eval_count: u32,
}
