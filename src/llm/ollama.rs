//! HTTP client for an Ollama-compatible local runtime

use super::{FragmentStream, ModelRuntime};
use crate::config::RuntimeConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

/// Runtime reached over HTTP (`/api/generate`, `/api/tags`)
pub struct OllamaRuntime {
    client: Client,
    base_url: Url,
}

impl OllamaRuntime {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        let client = Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;
        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &RuntimeConfig) -> Result<Self> {
        Self::new(&config.url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Config(format!("Invalid runtime URL: {}", e)))
    }

    async fn post_generate(
        &self,
        model: &str,
        prompt: &str,
        stream: bool,
    ) -> Result<reqwest::Response> {
        let url = self.endpoint("/api/generate")?;
        debug!("POST {} (model {}, stream {})", url, model, stream);
        let response = self
            .client
            .post(url)
            .json(&GenerateRequest {
                model,
                prompt,
                stream,
            })
            .send()
            .await
            .map_err(|e| Error::invocation(model, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::invocation(
                model,
                format!("runtime returned {}: {}", status, body.trim()),
            ));
        }
        Ok(response)
    }
}

#[async_trait]
impl ModelRuntime for OllamaRuntime {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String> {
        let response = self.post_generate(model, prompt, false).await?;
        let chunk: GenerateChunk = response
            .json()
            .await
            .map_err(|e| Error::invocation(model, e))?;
        if let Some(error) = chunk.error {
            return Err(Error::invocation(model, error));
        }
        Ok(chunk.response)
    }

    async fn generate_stream(&self, model: &str, prompt: &str) -> Result<FragmentStream> {
        let response = self.post_generate(model, prompt, true).await?;
        Ok(ndjson_fragments(model.to_string(), Box::pin(response.bytes_stream())))
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let url = self.endpoint("/api/tags")?;
        let tags: TagsResponse = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

struct LineReader<S> {
    bytes: S,
    buffer: Vec<u8>,
    finished: bool,
    model: String,
}

enum Line {
    Fragment(String),
    Skip,
    End,
}

impl<S> LineReader<S> {
    /// Take the next complete line from the buffer (or the remainder at EOF)
    fn take_line(&mut self, at_eof: bool) -> Option<Vec<u8>> {
        if let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            return Some(self.buffer.drain(..=pos).collect());
        }
        if at_eof && !self.buffer.is_empty() {
            return Some(std::mem::take(&mut self.buffer));
        }
        None
    }

    fn parse(&mut self, line: &[u8]) -> Result<Line> {
        let text = String::from_utf8_lossy(line);
        let text = text.trim();
        if text.is_empty() {
            return Ok(Line::Skip);
        }
        let chunk: GenerateChunk = serde_json::from_str(text)
            .map_err(|e| Error::invocation(&self.model, format!("bad stream line: {}", e)))?;
        if let Some(error) = chunk.error {
            return Err(Error::invocation(&self.model, error));
        }
        if chunk.done {
            self.finished = true;
            if chunk.response.is_empty() {
                return Ok(Line::End);
            }
        }
        Ok(Line::Fragment(chunk.response))
    }
}

/// Turn a newline-delimited JSON body into a stream of response fragments
fn ndjson_fragments<S, B>(model: String, bytes: S) -> FragmentStream
where
    S: Stream<Item = reqwest::Result<B>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let reader = LineReader {
        bytes,
        buffer: Vec::new(),
        finished: false,
        model,
    };

    futures::stream::unfold(reader, |mut reader| async move {
        let mut at_eof = false;
        loop {
            if reader.finished {
                return None;
            }
            if let Some(line) = reader.take_line(at_eof) {
                match reader.parse(&line) {
                    Ok(Line::Fragment(fragment)) => return Some((Ok(fragment), reader)),
                    Ok(Line::Skip) => continue,
                    Ok(Line::End) => return None,
                    Err(e) => {
                        reader.finished = true;
                        return Some((Err(e), reader));
                    }
                }
            }
            if at_eof {
                // Body closed without a `done` line
                reader.finished = true;
                let err = Error::invocation(&reader.model, "stream ended before completion");
                return Some((Err(err), reader));
            }
            match reader.bytes.next().await {
                Some(Ok(bytes)) => reader.buffer.extend_from_slice(bytes.as_ref()),
                Some(Err(e)) => {
                    reader.finished = true;
                    let err = Error::invocation(&reader.model, e);
                    return Some((Err(err), reader));
                }
                None => at_eof = true,
            }
        }
    })
    .boxed()
}
