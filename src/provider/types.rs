//! Wire types for the OpenAI-compatible chat completion API spoken by the
//! inference router.

use serde::{Deserialize, Serialize};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Chat completion request sent upstream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

/// One streamed chunk of a chat completion.
///
/// Only the fields the relay reads are modelled; everything else the
/// provider sends (id, created, usage, ...) is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionChunk {
    /// Build a single-choice chunk carrying `content`.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            choices: vec![ChunkChoice {
                delta: ChunkDelta {
                    content: Some(content.into()),
                },
            }],
        }
    }

    /// Incremental text of the first choice, if any and non-empty.
    pub fn delta_text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.delta.content.as_deref())
            .filter(|text| !text.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_serialize_lowercase_roles() {
        let req = ChatCompletionRequest {
            model: "m".to_string(),
            messages: vec![ChatMessage::system("be brief"), ChatMessage::user("hi")],
            stream: true,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "m",
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": "hi"}
                ],
                "stream": true
            })
        );
    }

    #[test]
    fn test_chunk_tolerates_provider_extras() {
        let chunk: ChatCompletionChunk = serde_json::from_str(
            r#"{"id":"x","object":"chat.completion.chunk","created":1,
                "choices":[{"index":0,"delta":{"role":"assistant","content":"Hi"},"logprobs":null,"finish_reason":null}]}"#,
        )
        .unwrap();
        assert_eq!(chunk.delta_text(), Some("Hi"));
    }

    #[test]
    fn test_delta_text_skips_empty_and_missing() {
        let usage_only: ChatCompletionChunk =
            serde_json::from_str(r#"{"choices":[],"usage":{"total_tokens":3}}"#).unwrap();
        assert_eq!(usage_only.delta_text(), None);

        let no_content: ChatCompletionChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#).unwrap();
        assert_eq!(no_content.delta_text(), None);

        assert_eq!(ChatCompletionChunk::text("").delta_text(), None);
    }
}
