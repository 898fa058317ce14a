//! Conversation and completion request types.
//!
//! Turn ordering is caller-supplied and preserved verbatim: the gateway never
//! reorders or mutates turns beyond appending the single user turn it
//! assembles from an upload.

use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// One role-attributed message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Role of the turn's author.
    pub role: TurnRole,
    /// Content: plain text or an ordered list of typed blocks.
    pub content: TurnContent,
}

impl ChatTurn {
    /// Create a user turn with plain text content.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: TurnContent::Text(content.into()),
        }
    }

    /// Create an assistant turn with plain text content.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: TurnContent::Text(content.into()),
        }
    }

    /// Create a system turn with plain text content.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::System,
            content: TurnContent::Text(content.into()),
        }
    }

    /// Create a user turn from assembled content blocks.
    #[must_use]
    pub fn user_blocks(blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: TurnRole::User,
            content: TurnContent::Blocks(blocks),
        }
    }
}

/// Turn author role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// System instruction.
    System,
    /// End-user message.
    User,
    /// Model response.
    Assistant,
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// Turn content: a bare string or an ordered block list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TurnContent {
    /// Simple text content.
    Text(String),
    /// Multimodal content blocks.
    Blocks(Vec<ContentBlock>),
}

impl TurnContent {
    /// Whether the content is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::Blocks(blocks) => blocks.is_empty(),
        }
    }

    /// Render the content as plain text, joining text blocks and eliding
    /// images. Used when building the title-generation transcript.
    #[must_use]
    pub fn to_plain_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Blocks(blocks) => blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    ContentBlock::Image { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// One typed unit within a conversational turn.
///
/// Serialized in the completion service's wire shape: a `type` tag with either
/// inline text or a base64 image source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Text content block. Carries no attribution metadata.
    Text {
        /// The text payload.
        text: String,
    },
    /// Image content block with base64-encoded data.
    Image {
        /// Base64 source descriptor.
        source: ImageSource,
    },
}

impl ContentBlock {
    /// Create a text block.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create a base64 image block. `media_type` must come from the supported
    /// image MIME types in the file registry.
    #[must_use]
    pub fn image(media_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self::Image {
            source: ImageSource {
                source_type: "base64".to_string(),
                media_type: media_type.into(),
                data: data.into(),
            },
        }
    }
}

/// Base64 image source for an image content block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSource {
    /// Source encoding, always `"base64"`.
    #[serde(rename = "type")]
    pub source_type: String,
    /// MIME type of the encoded image.
    pub media_type: String,
    /// Base64-encoded image bytes.
    pub data: String,
}

/// Normalized request dispatched to the completion backend.
///
/// All defaults (model fallback, token ceiling, temperature policy) are
/// applied before construction; the backend never sees unresolved input.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Target model identifier.
    pub model: String,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature in `[0.0, 1.0]`.
    pub temperature: f32,
    /// Ordered conversation turns, caller order preserved.
    pub turns: Vec<ChatTurn>,
}

impl CompletionRequest {
    /// Create a new builder.
    #[must_use]
    pub fn builder() -> CompletionRequestBuilder {
        CompletionRequestBuilder::default()
    }
}

/// Builder for [`CompletionRequest`].
#[derive(Debug, Default)]
pub struct CompletionRequestBuilder {
    model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    turns: Vec<ChatTurn>,
}

impl CompletionRequestBuilder {
    /// Set the model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set max tokens.
    #[must_use]
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the temperature.
    #[must_use]
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the turns.
    #[must_use]
    pub fn turns(mut self, turns: Vec<ChatTurn>) -> Self {
        self.turns = turns;
        self
    }

    /// Append a turn.
    #[must_use]
    pub fn turn(mut self, turn: ChatTurn) -> Self {
        self.turns.push(turn);
        self
    }

    /// Build the request.
    ///
    /// # Errors
    /// Returns [`GatewayError::InvalidInput`] when the model is missing or
    /// the turn list is empty.
    pub fn build(self) -> Result<CompletionRequest, GatewayError> {
        let model = self
            .model
            .ok_or_else(|| GatewayError::invalid_input("model is required"))?;

        if self.turns.is_empty() {
            return Err(GatewayError::invalid_input("messages cannot be empty"));
        }

        Ok(CompletionRequest {
            model,
            max_tokens: self.max_tokens.unwrap_or(crate::types::MaxTokens::CEILING),
            temperature: self.temperature.unwrap_or(0.7),
            turns: self.turns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_builder() {
        let request = CompletionRequest::builder()
            .model("claude-3-opus-20240229")
            .turn(ChatTurn::user("Hello"))
            .temperature(0.3)
            .max_tokens(100)
            .build();

        let request = request.expect("should build");
        assert_eq!(request.model, "claude-3-opus-20240229");
        assert_eq!(request.turns.len(), 1);
        assert!((request.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(request.max_tokens, 100);
    }

    #[test]
    fn test_request_builder_missing_model() {
        let request = CompletionRequest::builder()
            .turn(ChatTurn::user("Hello"))
            .build();
        assert!(request.is_err());
    }

    #[test]
    fn test_request_builder_empty_turns() {
        let request = CompletionRequest::builder().model("m").build();
        assert!(request.is_err());
    }

    #[test]
    fn test_turn_role_round_trip() {
        let turn: ChatTurn =
            serde_json::from_value(json!({"role": "user", "content": "hi"})).expect("deserialize");
        assert_eq!(turn.role, TurnRole::User);
        assert_eq!(turn.content, TurnContent::Text("hi".to_string()));
    }

    #[test]
    fn test_invalid_role_rejected() {
        let result: Result<ChatTurn, _> =
            serde_json::from_value(json!({"role": "robot", "content": "hi"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_content_block_wire_shape() {
        let block = ContentBlock::image("image/png", "QUJD");
        let json = serde_json::to_value(&block).expect("serialize");
        assert_eq!(json["type"], "image");
        assert_eq!(json["source"]["type"], "base64");
        assert_eq!(json["source"]["media_type"], "image/png");

        let text = ContentBlock::text("hello");
        let json = serde_json::to_value(&text).expect("serialize");
        assert_eq!(json["type"], "text");
        assert_eq!(json["text"], "hello");
    }

    #[test]
    fn test_block_content_deserializes_untagged() {
        let turn: ChatTurn = serde_json::from_value(json!({
            "role": "user",
            "content": [{"type": "text", "text": "hi"}]
        }))
        .expect("deserialize");
        match turn.content {
            TurnContent::Blocks(blocks) => assert_eq!(blocks.len(), 1),
            TurnContent::Text(_) => panic!("expected blocks"),
        }
    }

    #[test]
    fn test_plain_text_rendering_elides_images() {
        let content = TurnContent::Blocks(vec![
            ContentBlock::image("image/png", "data"),
            ContentBlock::text("caption"),
        ]);
        assert_eq!(content.to_plain_text(), "caption");
    }
}
