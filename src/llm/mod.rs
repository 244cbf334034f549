//! LLM integration for Coach Mika.
//!
//! The bot talks to the Anthropic Messages API directly over reqwest.
//! Everything above this module goes through the `CompletionProvider`
//! trait so the orchestrator can be tested against a stub.

pub mod anthropic;

pub use anthropic::AnthropicProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// Role of a transcript entry.
///
/// The system prompt is not part of the transcript; it travels as a
/// separate top-level field on every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry of the conversation transcript replayed to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A fetched image ready to be embedded in a multimodal request.
#[derive(Debug, Clone)]
pub struct ImageAttachment {
    /// Declared content type, e.g. `image/jpeg`.
    pub media_type: String,
    /// Raw image bytes.
    pub data: Vec<u8>,
}

/// Text/vision completion service.
///
/// One attempt per call; the orchestrator owns the recovery policy.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Model identifier, for logging.
    fn model_name(&self) -> &str;

    /// Send the transcript and system prompt, return the raw reply text.
    async fn complete(
        &self,
        transcript: &[ChatMessage],
        system: &str,
    ) -> Result<String, LlmError>;

    /// Like [`complete`](Self::complete), but the last transcript entry is
    /// replaced by a multimodal entry carrying the image alongside its
    /// original text.
    async fn complete_with_image(
        &self,
        transcript: &[ChatMessage],
        system: &str,
        image: &ImageAttachment,
    ) -> Result<String, LlmError>;
}

/// Resolves an image reference (a media URL) to bytes + content type.
///
/// The fetch/auth mechanism is a channel concern; failures surface as
/// [`LlmError::ImageFetch`] so the orchestrator treats them like any
/// other upstream failure.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<ImageAttachment, LlmError>;
}
