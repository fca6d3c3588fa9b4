//! Upstream inference provider.
//!
//! - [`types`]: chat completion wire types
//! - [`sse`]: Server-Sent Events decoding of streamed responses
//! - [`hf_inference`]: `reqwest` client for the Hugging Face inference router
//!
//! The relay only talks to the provider through [`ClientFactory`] and
//! [`ChatClient`], so the HTTP surface can be driven against a simulated
//! upstream.

pub mod hf_inference;
pub mod sse;
pub mod types;

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::provider::types::{ChatCompletionChunk, ChatCompletionRequest};

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid event data: {0}")]
    InvalidEventData(String),

    #[error("Invalid model id: {0:?}")]
    InvalidModel(String),

    #[error(transparent)]
    Decode(#[from] sse::SseDecodeError),

    #[error("Client construction failed: {0}")]
    Setup(String),
}

/// Chunks of one streamed completion, in arrival order.
pub type ChunkStream = BoxStream<'static, Result<ChatCompletionChunk, ProviderError>>;

/// A client bound to one provider and one credential.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Open a streaming chat completion.
    ///
    /// Resolves once the provider has accepted the request; failures after
    /// that point surface as items of the returned stream.
    async fn stream_chat(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChunkStream, ProviderError>;
}

/// Builds a fresh [`ChatClient`] per request.
pub trait ClientFactory: Send + Sync {
    fn connect(
        &self,
        provider: &str,
        api_key: &str,
    ) -> Result<Box<dyn ChatClient>, ProviderError>;
}
