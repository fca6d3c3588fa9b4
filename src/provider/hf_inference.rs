//! Client for the Hugging Face inference router.
//!
//! Requests go to `{base_url}/{provider}/models/{model}/v1/chat/completions`
//! with bearer auth; streamed responses arrive as Server-Sent Events carrying
//! OpenAI-style chunks.

use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use tracing::debug;

use crate::provider::sse::{SseDecoder, SseEvent};
use crate::provider::types::{ChatCompletionChunk, ChatCompletionRequest};
use crate::provider::{ChatClient, ChunkStream, ClientFactory, ProviderError};

/// Creates credential-bound clients that share one connection pool.
#[derive(Debug, Clone)]
pub struct HfClientFactory {
    http: reqwest::Client,
    base_url: String,
}

impl HfClientFactory {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl ClientFactory for HfClientFactory {
    fn connect(
        &self,
        provider: &str,
        api_key: &str,
    ) -> Result<Box<dyn ChatClient>, ProviderError> {
        if api_key.is_empty() {
            return Err(ProviderError::Setup("empty API key".to_string()));
        }
        if provider.is_empty() {
            return Err(ProviderError::Setup("empty provider identifier".to_string()));
        }

        Ok(Box::new(HfInferenceClient {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            provider: provider.to_string(),
            api_key: api_key.to_string(),
        }))
    }
}

/// A client bound to one provider and API key.
pub struct HfInferenceClient {
    http: reqwest::Client,
    base_url: String,
    provider: String,
    api_key: String,
}

impl HfInferenceClient {
    /// Each `/`-separated part of `model` becomes one percent-encoded path
    /// segment; dot and empty segments are rejected so the path stays under
    /// the bound provider.
    fn completions_url(&self, model: &str) -> Result<reqwest::Url, ProviderError> {
        if model.split('/').any(|part| matches!(part, "" | "." | "..")) {
            return Err(ProviderError::InvalidModel(model.to_string()));
        }

        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| ProviderError::Setup(format!("invalid base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| ProviderError::Setup("base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .push(&self.provider)
            .push("models")
            .extend(model.split('/'))
            .extend(["v1", "chat", "completions"]);
        Ok(url)
    }
}

#[async_trait]
impl ChatClient for HfInferenceClient {
    async fn stream_chat(
        &self,
        mut request: ChatCompletionRequest,
    ) -> Result<ChunkStream, ProviderError> {
        request.stream = true;
        let url = self.completions_url(&request.model)?;
        debug!(url = %url, model = %request.model, "Opening upstream stream");

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await?;
            return Err(parse_error_response(status, &body));
        }

        let stream: ChunkStream = Box::pin(try_stream! {
            let mut decoder = SseDecoder::new();
            let mut bytes = response.bytes_stream();

            while let Some(chunk) = bytes.next().await {
                let chunk = chunk?;
                let events = decoder.push(&chunk)?;
                for event in events {
                    match event {
                        SseEvent::Done => return,
                        SseEvent::Data(data) => {
                            let parsed = parse_chunk(&data)?;
                            yield parsed;
                        }
                    }
                }
            }

            let tail = decoder.finish()?;
            if let Some(SseEvent::Data(data)) = tail {
                let parsed = parse_chunk(&data)?;
                yield parsed;
            }
        });

        Ok(stream)
    }
}

fn parse_chunk(data: &str) -> Result<ChatCompletionChunk, ProviderError> {
    serde_json::from_str(data)
        .map_err(|e| ProviderError::InvalidEventData(format!("JSON parse error: {e}")))
}

/// Turn a non-success response into an error, preferring the provider's own message.
pub fn parse_error_response(status: reqwest::StatusCode, body: &[u8]) -> ProviderError {
    let message = serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|json| extract_error_message(&json))
        .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string());

    ProviderError::Api {
        status: status.as_u16(),
        message,
    }
}

/// `{"error": {"message": ..}}`, `{"error": ".."}` or `{"message": ..}`.
fn extract_error_message(json: &serde_json::Value) -> Option<String> {
    match json.get("error") {
        Some(serde_json::Value::String(message)) => return Some(message.clone()),
        Some(error) => {
            if let Some(message) = error.get("message").and_then(|m| m.as_str()) {
                return Some(message.to_string());
            }
        }
        None => {}
    }
    json.get("message")
        .and_then(|m| m.as_str())
        .map(str::to_string)
}
