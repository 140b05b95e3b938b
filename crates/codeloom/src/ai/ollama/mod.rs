//! Ollama client: the concrete [`Generator`] implementation.

pub mod types;

use async_trait::async_trait;
use futures::StreamExt;

use crate::ai::{GenerateRequest, GenerateResponse, Generator, StreamChunk, Usage};
use crate::config::Config;
use crate::error::Error;
use types::{OllamaGenerateRequest, OllamaGenerateResponse, OllamaOptions};

#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    http: reqwest::Client,
}

impl OllamaClient {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| Error::Generic(err.to_string()))?;

        Ok(Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }

    async fn send_generate(
        &self,
        req: &GenerateRequest,
        stream: bool,
    ) -> Result<reqwest::Response, Error> {
        let body = OllamaGenerateRequest {
            model: &req.model,
            prompt: &req.prompt,
            stream,
            options: OllamaOptions {
                temperature: Some(req.temperature),
                num_predict: Some(req.max_tokens),
            },
        };

        let response = self
            .http
            .post(self.generate_url())
            .json(&body)
            .send()
            .await
            .map_err(|err| Error::Network(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

/// Decode one NDJSON line from a streaming response into a fragment.
fn parse_chunk_line(line: &str) -> Result<StreamChunk, Error> {
    let parsed: OllamaGenerateResponse =
        serde_json::from_str(line).map_err(|err| Error::Decode(err.to_string()))?;

    Ok(StreamChunk {
        content: parsed.response,
        done: parsed.done,
    })
}

#[async_trait]
impl Generator for OllamaClient {
    async fn generate(&self, req: GenerateRequest) -> Result<GenerateResponse, Error> {
        let response = self.send_generate(&req, false).await?;

        let parsed: OllamaGenerateResponse = response
            .json()
            .await
            .map_err(|err| Error::Decode(err.to_string()))?;

        Ok(GenerateResponse {
            content: parsed.response,
            model: parsed.model,
            finish_reason: parsed.done_reason.unwrap_or_else(|| "stop".to_string()),
            usage: Usage {
                prompt_tokens: parsed.prompt_eval_count,
                completion_tokens: parsed.eval_count,
                total_tokens: parsed.prompt_eval_count + parsed.eval_count,
            },
        })
    }

    async fn generate_stream(
        &self,
        req: GenerateRequest,
    ) -> Result<async_channel::Receiver<Result<StreamChunk, Error>>, Error> {
        let response = self.send_generate(&req, true).await?;

        let (tx, rx) = async_channel::bounded(32);
        let mut body = response.bytes_stream();

        tokio::spawn(async move {
            let mut buffer = String::new();

            while let Some(piece) = body.next().await {
                let bytes = match piece {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        let _ = tx.send(Err(Error::Network(err.to_string()))).await;
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&bytes));

                // NDJSON: one response object per line.
                while let Some(newline) = buffer.find('\n') {
                    let line = buffer[..newline].trim().to_string();
                    buffer.drain(..=newline);
                    if line.is_empty() {
                        continue;
                    }

                    match parse_chunk_line(&line) {
                        Ok(chunk) => {
                            let done = chunk.done;
                            if tx.send(Ok(chunk)).await.is_err() {
                                return;
                            }
                            if done {
                                return;
                            }
                        }
                        Err(err) => {
                            let _ = tx.send(Err(err)).await;
                            return;
                        }
                    }
                }
            }

            // Connection closed without a done marker; decode any trailing
            // partial line so its content is not lost.
            let line = buffer.trim();
            if !line.is_empty() {
                let _ = tx.send(parse_chunk_line(line)).await;
            }
        });

        Ok(rx)
    }

    async fn health_check(&self) -> Result<(), Error> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self.http.get(&url).send().await.map_err(|err| {
            Error::Network(format!(
                "Cannot connect to Ollama at {}. Is `ollama serve` running? ({err})",
                self.base_url
            ))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
