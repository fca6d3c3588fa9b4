//! Relay HTTP API.
//!
//! - POST /api/chat: stream a completion as plain text
//! - GET /api/health: liveness

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::Config;
use crate::provider::types::{ChatCompletionRequest, ChatMessage};
use crate::provider::{ClientFactory, ProviderError};
use crate::server::streaming::chunks_to_text_stream;

/// Application state shared across handlers.
pub struct AppState {
    pub config: Arc<Config>,
    /// Credential used when a request carries none; read once at startup.
    pub fallback_token: Option<String>,
    pub clients: Arc<dyn ClientFactory>,
}

/// Build the axum router with all API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/health", get(health))
        .layer(TraceLayer::new_for_http())
        // Mirrors the caller's origin so credentialed requests are accepted.
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

// ─── Request/Response Types ────────────────────────────────────────────────

/// Chat relay request.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// System-role content.
    pub developer_message: String,
    /// User-role content.
    pub user_message: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub hf_token: Option<String>,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
}

/// Error body, `{"detail": "..."}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Hugging Face token not found. Please provide it in the request or set {token_env} environment variable.")]
    MissingCredential { token_env: String },

    #[error("Hugging Face API request failed: {0}")]
    Upstream(#[from] ProviderError),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let detail = self.to_string();
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorDetail { detail }),
        )
            .into_response()
    }
}

/// Where the credential for a request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Request,
    Fallback,
}

/// Pick the request token if non-empty, else the startup fallback.
pub fn resolve_credential<'a>(
    request_token: Option<&'a str>,
    fallback: Option<&'a str>,
) -> Option<(&'a str, CredentialSource)> {
    if let Some(token) = request_token.filter(|t| !t.is_empty()) {
        return Some((token, CredentialSource::Request));
    }
    fallback
        .filter(|t| !t.is_empty())
        .map(|token| (token, CredentialSource::Fallback))
}

impl ChatRequest {
    /// Upstream request: system message, then user message.
    pub fn to_completion_request(&self, default_model: &str) -> ChatCompletionRequest {
        let model = self
            .model
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(default_model);

        ChatCompletionRequest {
            model: model.to_string(),
            messages: vec![
                ChatMessage::system(self.developer_message.as_str()),
                ChatMessage::user(self.user_message.as_str()),
            ],
            stream: true,
        }
    }
}

// ─── Route Handlers ────────────────────────────────────────────────────────

async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Response, RelayError> {
    let request_id = Uuid::new_v4().to_string();

    let result = relay(&state, &req, &request_id).await;
    if let Err(e) = &result {
        error!(request_id = %request_id, error = %e, "Chat relay failed");
    }
    result
}

async fn relay(
    state: &AppState,
    req: &ChatRequest,
    request_id: &str,
) -> Result<Response, RelayError> {
    let provider = &state.config.provider;

    let (api_key, source) = resolve_credential(
        req.hf_token.as_deref(),
        state.fallback_token.as_deref(),
    )
    .ok_or_else(|| RelayError::MissingCredential {
        token_env: provider.token_env.clone(),
    })?;

    let completion = req.to_completion_request(&provider.default_model);

    info!(
        request_id = %request_id,
        model = %completion.model,
        provider = %provider.name,
        credential = ?source,
        "Chat relay request"
    );

    let client = state.clients.connect(&provider.name, api_key)?;
    let chunks = client.stream_chat(completion).await?;

    let body = Body::from_stream(chunks_to_text_stream(chunks, request_id.to_string()));
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(model: Option<&str>) -> ChatRequest {
        ChatRequest {
            developer_message: "You are helpful".to_string(),
            user_message: "Hi".to_string(),
            model: model.map(str::to_string),
            hf_token: None,
        }
    }

    #[test]
    fn test_request_token_wins() {
        assert_eq!(
            resolve_credential(Some("abc"), Some("env")),
            Some(("abc", CredentialSource::Request))
        );
    }

    #[test]
    fn test_empty_request_token_falls_back() {
        assert_eq!(
            resolve_credential(Some(""), Some("env")),
            Some(("env", CredentialSource::Fallback))
        );
        assert_eq!(
            resolve_credential(None, Some("env")),
            Some(("env", CredentialSource::Fallback))
        );
    }

    #[test]
    fn test_no_usable_credential() {
        assert_eq!(resolve_credential(None, None), None);
        assert_eq!(resolve_credential(Some(""), Some("")), None);
    }

    #[test]
    fn test_completion_request_defaults_model() {
        let completion = request(None).to_completion_request("org/default");
        assert_eq!(completion.model, "org/default");

        let completion = request(Some("")).to_completion_request("org/default");
        assert_eq!(completion.model, "org/default");

        let completion = request(Some("org/custom")).to_completion_request("org/default");
        assert_eq!(completion.model, "org/custom");
    }

    #[test]
    fn test_completion_request_message_order() {
        let completion = request(None).to_completion_request("m");
        assert_eq!(
            completion.messages,
            vec![ChatMessage::system("You are helpful"), ChatMessage::user("Hi")]
        );
        assert!(completion.stream);
    }

    #[test]
    fn test_request_model_fields_are_optional() {
        let req: ChatRequest =
            serde_json::from_str(r#"{"developer_message":"d","user_message":"u","model":null}"#)
                .unwrap();
        assert!(req.model.is_none());
        assert!(req.hf_token.is_none());
    }

    #[test]
    fn test_error_details() {
        let missing = RelayError::MissingCredential {
            token_env: "HF_TOKEN".to_string(),
        };
        assert!(missing.to_string().contains("token not found"));
        assert!(missing.to_string().contains("HF_TOKEN"));

        let upstream = RelayError::from(ProviderError::Api {
            status: 429,
            message: "rate limited".to_string(),
        });
        assert_eq!(
            upstream.to_string(),
            "Hugging Face API request failed: HTTP 429: rate limited"
        );
    }
}
