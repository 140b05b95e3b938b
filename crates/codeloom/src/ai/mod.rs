//! The generation service boundary.
//!
//! [`Generator`] is the seam between the pipeline and whatever serves
//! completions. The dispatcher and the interactive commands only ever see
//! this trait plus the classified [`Error`](crate::error::Error) variants,
//! never the wire protocol. [`ollama`] is the one concrete implementation.

pub mod ollama;

use crate::error::Error;
use async_trait::async_trait;

/// An immutable generation request, constructed per call.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub prompt: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// The completed result of a blocking generation call.
#[derive(Debug, Clone)]
pub struct GenerateResponse {
    pub content: String,
    pub model: String,
    pub finish_reason: String,
    pub usage: Usage,
}

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// One fragment of a streaming generation.
#[derive(Debug, Clone)]
pub struct StreamChunk {
    pub content: String,
    pub done: bool,
}

/// Abstract boundary to the inference service.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Issue a blocking generation call.
    async fn generate(&self, req: GenerateRequest) -> Result<GenerateResponse, Error>;

    /// Issue a streaming generation call.
    ///
    /// The receiver yields a finite, non-restartable sequence of fragments.
    /// Consumers must stop reading after a fragment with `done` set or after
    /// an `Err` item; nothing further arrives after either.
    async fn generate_stream(
        &self,
        req: GenerateRequest,
    ) -> Result<async_channel::Receiver<Result<StreamChunk, Error>>, Error>;

    /// Cheap connectivity probe, run before a command starts issuing jobs.
    async fn health_check(&self) -> Result<(), Error>;
}
