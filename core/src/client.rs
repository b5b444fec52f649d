use async_stream::try_stream;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::Client;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::PlaygroundConfig;
use crate::errors::{PlaygroundError, PlaygroundResult};
use crate::types::*;

/// Lazy sequence of text fragments produced by a completion
pub type TextStream = BoxStream<'static, PlaygroundResult<String>>;

/// The external service that lists models and turns a prompt into streamed text
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// List the models currently available on the provider
    async fn list_models(&self) -> PlaygroundResult<Vec<ModelDescriptor>>;

    /// Start a streamed completion. The stream ends with `PlaygroundError::Cancelled`
    /// once `cancel` fires.
    async fn stream_generate(
        &self,
        model: &str,
        prompt: &str,
        cancel: CancellationToken,
    ) -> PlaygroundResult<TextStream>;
}

/// Client for a local Ollama-compatible server
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    /// Create a client rooted at `base_url` (e.g. `http://localhost:11434/api`)
    pub fn new(base_url: &str) -> PlaygroundResult<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(PlaygroundError::ConfigError(
                "Completion provider base URL cannot be empty".to_string(),
            ));
        }

        // No overall timeout: generations can legitimately run for minutes.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                PlaygroundError::ConfigError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    pub fn from_config(config: &PlaygroundConfig) -> PlaygroundResult<Self> {
        Self::new(config.api_base_url())
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    async fn error_for_status(response: reqwest::Response) -> PlaygroundResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_body = response.text().await.map_err(|e| {
            PlaygroundError::ResponseError(format!("Failed to read error response: {}", e))
        })?;

        Err(PlaygroundError::HttpError {
            status_code: status.as_u16(),
            message: format!("API request failed: {}", error_body),
        })
    }
}

#[async_trait]
impl CompletionProvider for OllamaClient {
    async fn list_models(&self) -> PlaygroundResult<Vec<ModelDescriptor>> {
        let url = self.url("tags");
        debug!(%url, "Listing models");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PlaygroundError::RequestError(format!("Failed to send request: {}", e)))?;
        let response = Self::error_for_status(response).await?;

        let tags = response
            .json::<TagsResponse>()
            .await
            .map_err(|e| PlaygroundError::ParsingError(format!("Failed to parse response: {}", e)))?;

        Ok(tags.models)
    }

    async fn stream_generate(
        &self,
        model: &str,
        prompt: &str,
        cancel: CancellationToken,
    ) -> PlaygroundResult<TextStream> {
        let url = self.url("generate");
        debug!(%url, model, prompt_len = prompt.len(), "Starting streamed generation");

        let request = GenerateRequest {
            model,
            prompt,
            stream: true,
        };

        let send = self.client.post(&url).json(&request).send();
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PlaygroundError::Cancelled),
            response = send => response.map_err(|e| {
                PlaygroundError::RequestError(format!("Failed to send request: {}", e))
            })?,
        };
        let response = Self::error_for_status(response).await?;
        let mut body = Box::pin(response.bytes_stream());

        let stream: TextStream = Box::pin(try_stream! {
            let mut decoder = NdjsonDecoder::default();
            let mut completed = false;
            let mut exhausted = false;

            while !completed && !exhausted {
                let next = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(PlaygroundError::Cancelled),
                    next = body.next() => match next {
                        Some(Ok(bytes)) => Ok(Some(bytes)),
                        Some(Err(e)) => Err(PlaygroundError::ResponseError(
                            format!("Stream interrupted: {}", e),
                        )),
                        None => Ok(None),
                    },
                };

                let lines = match next? {
                    Some(bytes) => decoder.push(&bytes),
                    None => {
                        exhausted = true;
                        decoder.finish().into_iter().collect()
                    }
                };

                for line in lines {
                    let chunk = parse_chunk_line(&line)?;
                    if let Some(error) = chunk.error {
                        warn!(%error, "Provider reported an error mid-stream");
                        Err::<(), _>(PlaygroundError::ApiError(error))?;
                    }
                    if !chunk.response.is_empty() {
                        yield chunk.response;
                    }
                    if chunk.done {
                        completed = true;
                        break;
                    }
                }
            }

            if !completed {
                warn!("Stream closed without a final chunk");
                Err::<(), _>(PlaygroundError::ResponseError(
                    "Stream ended before completion".to_string(),
                ))?;
            }
        });

        Ok(stream)
    }
}

fn parse_chunk_line(line: &str) -> PlaygroundResult<GenerateChunk> {
    serde_json::from_str(line).map_err(|e| {
        PlaygroundError::ParsingError(format!("Malformed stream line {:?}: {}", line, e))
    })
}

/// Reassembles newline-delimited JSON lines from arbitrarily split byte chunks
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buf: Vec<u8>,
}

impl NdjsonDecoder {
    /// Feed bytes, returning every complete non-blank line
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            if let Some(line) = Self::clean(&raw[..raw.len() - 1]) {
                lines.push(line);
            }
        }
        lines
    }

    /// Flush a trailing line that was not newline-terminated
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buf);
        Self::clean(&rest)
    }

    fn clean(raw: &[u8]) -> Option<String> {
        let line = String::from_utf8_lossy(raw);
        let line = line.trim();
        (!line.is_empty()).then(|| line.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OllamaClient {
        OllamaClient::new(&format!("{}/api/", server.uri())).unwrap()
    }

    #[test]
    fn test_decoder_reassembles_split_lines() {
        let mut decoder = NdjsonDecoder::default();
        assert!(decoder.push(br#"{"response":"He"#).is_empty());
        let lines = decoder.push(b"llo\"}\r\n\n{\"response\":\" world\"}\n{\"done\"");
        assert_eq!(lines, vec![r#"{"response":"Hello"}"#, r#"{"response":" world"}"#]);
        assert_eq!(decoder.push(b":true}"), Vec::<String>::new());
        assert_eq!(decoder.finish().as_deref(), Some(r#"{"done":true}"#));
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_empty_base_url_is_rejected() {
        assert!(matches!(
            OllamaClient::new("  "),
            Err(PlaygroundError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_list_models() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "models": [{"name": "llama3:8b", "size": 1}, {"name": "codellama"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let models = client_for(&server).list_models().await.unwrap();
        let names: Vec<_> = models.into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["llama3:8b", "codellama"]);
    }

    #[tokio::test]
    async fn test_list_models_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = client_for(&server).list_models().await.unwrap_err();
        match err {
            PlaygroundError::HttpError { status_code, message } => {
                assert_eq!(status_code, 500);
                assert!(message.contains("boom"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_list_models_unreachable() {
        // Nothing listens on the discard port.
        let client = OllamaClient::new("http://127.0.0.1:9/api").unwrap();
        let err = client.list_models().await.unwrap_err();
        assert!(err.is_unreachable(), "got {err:?}");
    }

    #[tokio::test]
    async fn test_stream_generate_yields_fragments() {
        let server = MockServer::start().await;
        let body = concat!(
            "{\"model\":\"llama3\",\"response\":\"Hel\",\"done\":false}\n",
            "{\"model\":\"llama3\",\"response\":\"lo\",\"done\":false}\n",
            "{\"model\":\"llama3\",\"response\":\"\",\"done\":true}\n",
        );
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(json!({"model": "llama3", "prompt": "hi", "stream": true})))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(1)
            .mount(&server)
            .await;

        let stream = client_for(&server)
            .stream_generate("llama3", "hi", CancellationToken::new())
            .await
            .unwrap();
        let fragments: Vec<String> = stream.try_collect().await.unwrap();
        assert_eq!(fragments, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn test_stream_generate_surfaces_provider_error() {
        let server = MockServer::start().await;
        let body = concat!(
            "{\"response\":\"partial\",\"done\":false}\n",
            "{\"error\":\"model ran out of memory\"}\n",
        );
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let mut stream = client_for(&server)
            .stream_generate("llama3", "hi", CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), "partial");
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(err, PlaygroundError::ApiError(ref m) if m.contains("out of memory")));
    }

    #[tokio::test]
    async fn test_stream_closed_early_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("{\"response\":\"half an\",\"done\":false}\n"),
            )
            .mount(&server)
            .await;

        let mut stream = client_for(&server)
            .stream_generate("llama3", "hi", CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), "half an");
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(err, PlaygroundError::ResponseError(ref m) if m.contains("before completion")));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_stream_generate_unknown_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"error": "model 'x' not found"})),
            )
            .mount(&server)
            .await;

        let result = client_for(&server)
            .stream_generate("x", "hi", CancellationToken::new())
            .await;
        assert!(matches!(
            result,
            Err(PlaygroundError::HttpError { status_code: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_cancelled_stream_ends_with_cancelled() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("{\"response\":\"never read\"}\n"),
            )
            .mount(&server)
            .await;

        let cancel = CancellationToken::new();
        let mut stream = client_for(&server)
            .stream_generate("llama3", "hi", cancel.clone())
            .await
            .unwrap();
        cancel.cancel();

        let first = stream.next().await.unwrap();
        assert!(matches!(first, Err(PlaygroundError::Cancelled)));
    }
}
