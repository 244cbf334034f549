//! Native Anthropic Messages API provider.
//!
//! Single attempt per call, bounded by the client timeout. Retry policy
//! belongs to the caller, and the orchestrator deliberately has none.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::llm::{ChatMessage, CompletionProvider, ImageAttachment, Role};

const API_BASE: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
const PROVIDER_NAME: &str = "anthropic";

/// Prompt used for the image entry when the transcript is empty.
pub const DEFAULT_IMAGE_PROMPT: &str = "Analyse cette image d'aliments.";

/// Anthropic Messages API provider.
pub struct AnthropicProvider {
    client: Client,
    api_key: SecretString,
    model: String,
    max_tokens: u32,
}

impl AnthropicProvider {
    pub fn new(
        api_key: SecretString,
        model: impl Into<String>,
        max_tokens: u32,
        timeout: Duration,
    ) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            api_key,
            model: model.into(),
            max_tokens,
        }
    }

    fn request_body(&self, messages: Vec<ApiMessage>, system: &str) -> MessagesRequest {
        MessagesRequest {
            model: self.model.clone(),
            messages,
            max_tokens: self.max_tokens,
            system: Some(system.to_string()),
        }
    }

    /// Send one request to the Messages API. No retries.
    async fn send(&self, body: &MessagesRequest) -> Result<String, LlmError> {
        let url = format!("{API_BASE}/v1/messages");

        tracing::debug!(model = %self.model, "Sending request to Anthropic Messages API");

        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .header("anthropic-version", API_VERSION)
            .header("x-api-key", self.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER_NAME.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        let response_text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            if status.as_u16() == 401 {
                return Err(LlmError::AuthFailed {
                    provider: PROVIDER_NAME.to_string(),
                });
            }
            if status.as_u16() == 429 {
                return Err(LlmError::RateLimited {
                    provider: PROVIDER_NAME.to_string(),
                });
            }
            return Err(LlmError::RequestFailed {
                provider: PROVIDER_NAME.to_string(),
                reason: format!("HTTP {status}: {response_text}"),
            });
        }

        let parsed: MessagesResponse =
            serde_json::from_str(&response_text).map_err(|e| LlmError::InvalidResponse {
                provider: PROVIDER_NAME.to_string(),
                reason: format!("JSON parse error: {e}"),
            })?;

        extract_reply_text(&parsed)
    }
}

#[async_trait]
impl CompletionProvider for AnthropicProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        transcript: &[ChatMessage],
        system: &str,
    ) -> Result<String, LlmError> {
        let messages = convert_transcript(transcript);
        self.send(&self.request_body(messages, system)).await
    }

    async fn complete_with_image(
        &self,
        transcript: &[ChatMessage],
        system: &str,
        image: &ImageAttachment,
    ) -> Result<String, LlmError> {
        let messages = convert_transcript_with_image(transcript, image);
        self.send(&self.request_body(messages, system)).await
    }
}

// -- Messages API request/response types --

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    messages: Vec<ApiMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: ApiContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ApiContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "image")]
    Image { source: ImageSource },
    #[serde(rename = "text")]
    Text { text: String },
}

#[derive(Debug, Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    source_type: &'static str,
    media_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

// -- Message conversion --

fn role_str(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

/// Convert the transcript to plain text API messages.
fn convert_transcript(transcript: &[ChatMessage]) -> Vec<ApiMessage> {
    transcript
        .iter()
        .map(|msg| ApiMessage {
            role: role_str(msg.role),
            content: ApiContent::Text(msg.content.clone()),
        })
        .collect()
}

/// Convert the transcript, replacing the last entry with a multimodal
/// entry carrying the image plus that entry's text. Earlier entries pass
/// through unchanged; an empty transcript yields a single image entry
/// with the default prompt.
fn convert_transcript_with_image(
    transcript: &[ChatMessage],
    image: &ImageAttachment,
) -> Vec<ApiMessage> {
    let (earlier, last_text) = match transcript.split_last() {
        Some((last, earlier)) => (earlier, last.content.clone()),
        None => (&[][..], DEFAULT_IMAGE_PROMPT.to_string()),
    };

    let mut messages = convert_transcript(earlier);
    messages.push(ApiMessage {
        role: "user",
        content: ApiContent::Blocks(vec![
            ContentBlock::Image {
                source: ImageSource {
                    source_type: "base64",
                    media_type: image.media_type.clone(),
                    data: base64::engine::general_purpose::STANDARD.encode(&image.data),
                },
            },
            ContentBlock::Text { text: last_text },
        ]),
    });
    messages
}

/// Pull the first text block out of a Messages API response.
fn extract_reply_text(response: &MessagesResponse) -> Result<String, LlmError> {
    response
        .content
        .iter()
        .find(|block| block.kind == "text")
        .map(|block| block.text.clone())
        .ok_or_else(|| LlmError::InvalidResponse {
            provider: PROVIDER_NAME.to_string(),
            reason: "no text content block in response".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_image() -> ImageAttachment {
        ImageAttachment {
            media_type: "image/jpeg".to_string(),
            data: vec![0xFF, 0xD8, 0xFF],
        }
    }

    #[test]
    fn convert_plain_transcript_keeps_roles_and_order() {
        let transcript = vec![
            ChatMessage::user("Salut"),
            ChatMessage::assistant("Bonjour !"),
            ChatMessage::user("Un point calories ?"),
        ];
        let messages = convert_transcript(&transcript);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, "user");
        assert_eq!(messages[1].role, "assistant");
        assert_eq!(messages[2].role, "user");
    }

    #[test]
    fn image_replaces_only_last_entry() {
        let transcript = vec![
            ChatMessage::user("Salut"),
            ChatMessage::assistant("Bonjour !"),
            ChatMessage::user("Voici mon frigo"),
        ];
        let messages = convert_transcript_with_image(&transcript, &sample_image());
        assert_eq!(messages.len(), 3);

        let value = serde_json::to_value(&messages).unwrap();
        // Earlier entries stay plain text
        assert_eq!(value[0]["content"], "Salut");
        assert_eq!(value[1]["content"], "Bonjour !");
        // Last entry becomes image + original text blocks
        assert_eq!(value[2]["role"], "user");
        assert_eq!(value[2]["content"][0]["type"], "image");
        assert_eq!(value[2]["content"][0]["source"]["type"], "base64");
        assert_eq!(value[2]["content"][0]["source"]["media_type"], "image/jpeg");
        assert_eq!(value[2]["content"][1]["type"], "text");
        assert_eq!(value[2]["content"][1]["text"], "Voici mon frigo");
    }

    #[test]
    fn empty_transcript_gets_default_image_prompt() {
        let messages = convert_transcript_with_image(&[], &sample_image());
        assert_eq!(messages.len(), 1);
        let value = serde_json::to_value(&messages).unwrap();
        assert_eq!(value[0]["content"][1]["text"], DEFAULT_IMAGE_PROMPT);
    }

    #[test]
    fn request_serializes_system_as_top_level_field() {
        let request = MessagesRequest {
            model: "claude-sonnet-4-20250514".to_string(),
            messages: convert_transcript(&[ChatMessage::user("Salut")]),
            max_tokens: 1024,
            system: Some("Tu es Mika.".to_string()),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["system"], "Tu es Mika.");
        assert_eq!(value["max_tokens"], 1024);
        assert_eq!(value["messages"][0]["role"], "user");
    }

    #[test]
    fn reply_text_comes_from_first_text_block() {
        let response: MessagesResponse = serde_json::from_str(
            r#"{"content":[{"type":"text","text":"Bonjour Lea !"},{"type":"text","text":"ignored"}]}"#,
        )
        .unwrap();
        assert_eq!(extract_reply_text(&response).unwrap(), "Bonjour Lea !");
    }

    #[test]
    fn missing_text_block_is_invalid_response() {
        let response: MessagesResponse =
            serde_json::from_str(r#"{"content":[{"type":"thinking"}]}"#).unwrap();
        assert!(matches!(
            extract_reply_text(&response),
            Err(LlmError::InvalidResponse { .. })
        ));
    }
}
