//! Anthropic Messages API adapter.
//!
//! Implements [`CompletionBackend`] against `POST {base_url}/v1/messages` in
//! both whole-response and incremental-event modes. Provider and transport
//! failures are normalized into [`GatewayError::Completion`]; no call is ever
//! retried here.

use async_stream::stream;
use async_trait::async_trait;
use chat_core::{
    Completion, CompletionBackend, CompletionRequest, CompletionStream, GatewayError, StreamEvent,
    TurnContent, TurnRole,
};
use chat_config::CompletionConfig;
use futures_util::StreamExt;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic-backed completion client.
pub struct AnthropicBackend {
    api_key: SecretString,
    base_url: String,
    default_model: String,
    client: Client,
}

impl AnthropicBackend {
    /// Create a new adapter from the completion configuration.
    ///
    /// # Errors
    /// [`GatewayError::Configuration`] when the API key is empty;
    /// [`GatewayError::Internal`] when the HTTP client cannot be built.
    pub fn new(config: &CompletionConfig) -> Result<Self, GatewayError> {
        if config.api_key.expose_secret().is_empty() {
            return Err(GatewayError::configuration(
                "completion service API key is not set",
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::internal(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            default_model: config.default_model.clone(),
            client,
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    /// Transform the normalized request into the Messages API wire shape.
    ///
    /// Anthropic has no system role inside `messages`; system turns are
    /// lifted into the top-level `system` field, preserving the order of the
    /// remaining turns.
    fn transform_request<'a>(
        request: &'a CompletionRequest,
        streaming: bool,
    ) -> MessagesRequest<'a> {
        let mut system_parts = Vec::new();
        let mut messages = Vec::new();

        for turn in &request.turns {
            match turn.role {
                TurnRole::System => system_parts.push(turn.content.to_plain_text()),
                TurnRole::User => messages.push(WireMessage {
                    role: "user",
                    content: &turn.content,
                }),
                TurnRole::Assistant => messages.push(WireMessage {
                    role: "assistant",
                    content: &turn.content,
                }),
            }
        }

        MessagesRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            messages,
            system: if system_parts.is_empty() {
                None
            } else {
                Some(system_parts.join("\n\n"))
            },
            temperature: request.temperature,
            stream: streaming,
        }
    }

    /// Normalize a non-success response into the taxonomy, preferring the
    /// structured error message when the body parses.
    fn parse_error(status: u16, body: &str) -> GatewayError {
        let message = serde_json::from_str::<ErrorEnvelope>(body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| {
                let mut raw = body.trim().to_string();
                raw.truncate(200);
                raw
            });
        GatewayError::completion(format!("upstream returned {status}: {message}"))
    }
}

#[async_trait]
impl CompletionBackend for AnthropicBackend {
    fn id(&self) -> &str {
        "anthropic"
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, GatewayError> {
        let body = Self::transform_request(request, false);

        debug!(model = %request.model, turns = request.turns.len(), "Dispatching completion");

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Completion request failed");
                GatewayError::completion(format!("request failed: {e}"))
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::completion(format!("failed to read response: {e}")))?;

        trace!(status = %status, "Received completion response");

        if !status.is_success() {
            return Err(Self::parse_error(status.as_u16(), &text));
        }

        let parsed: MessagesResponse = serde_json::from_str(&text)
            .map_err(|e| GatewayError::completion(format!("invalid response JSON: {e}")))?;

        let first_text = parsed
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .map(|block| block.text)
            .ok_or_else(|| GatewayError::completion("response contained no text content"))?;

        Ok(Completion::new(
            first_text,
            parsed.model.unwrap_or_else(|| request.model.clone()),
        ))
    }

    async fn complete_stream(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionStream, GatewayError> {
        let body = Self::transform_request(request, true);

        debug!(model = %request.model, "Dispatching streaming completion");

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Streaming completion request failed");
                GatewayError::completion(format!("streaming request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Self::parse_error(status.as_u16(), &text));
        }

        let events = stream! {
            let mut byte_stream = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk_result) = byte_stream.next().await {
                let chunk = match chunk_result {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield StreamEvent::Error(format!("stream transport error: {e}"));
                        return;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&chunk));

                // Process complete SSE events
                while let Some(pos) = buffer.find("\n\n") {
                    let event = buffer[..pos].to_string();
                    buffer.drain(..pos + 2);

                    for line in event.lines() {
                        let Some(data) = line.strip_prefix("data: ") else {
                            continue;
                        };
                        match parse_stream_payload(data) {
                            Some(event @ (StreamEvent::Done | StreamEvent::Error(_))) => {
                                yield event;
                                return;
                            }
                            Some(event) => yield event,
                            None => {}
                        }
                    }
                }
            }
        };

        Ok(CompletionStream::new(events))
    }
}

/// Decode one SSE data payload into a stream event; `None` for event kinds
/// that carry nothing the relay needs (ping, block boundaries, usage).
fn parse_stream_payload(data: &str) -> Option<StreamEvent> {
    let payload: StreamPayload = serde_json::from_str(data).ok()?;
    match payload.kind.as_str() {
        "content_block_delta" => {
            let delta = payload.delta?;
            (delta.kind == "text_delta").then(|| StreamEvent::Delta(delta.text))
        }
        "message_stop" => Some(StreamEvent::Done),
        "error" => Some(StreamEvent::Error(
            payload
                .error
                .map_or_else(|| "unknown upstream error".to_string(), |e| e.message),
        )),
        _ => None,
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    temperature: f32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a TurnContent,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: WireError,
}

#[derive(Debug, Deserialize)]
struct WireError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct StreamPayload {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    delta: Option<WireDelta>,
    #[serde(default)]
    error: Option<WireError>,
}

#[derive(Debug, Deserialize)]
struct WireDelta {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_core::{ChatTurn, ContentBlock};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend_for(server: &MockServer) -> AnthropicBackend {
        let config = CompletionConfig {
            api_key: SecretString::new("test-key".to_string()),
            base_url: server.uri(),
            ..CompletionConfig::default()
        };
        AnthropicBackend::new(&config).expect("valid config")
    }

    fn request() -> CompletionRequest {
        CompletionRequest::builder()
            .model("claude-3-opus-20240229")
            .turn(ChatTurn::user("Hello"))
            .build()
            .expect("valid request")
    }

    #[test]
    fn test_empty_api_key_rejected_at_construction() {
        let config = CompletionConfig::default();
        assert!(matches!(
            AnthropicBackend::new(&config),
            Err(GatewayError::Configuration { .. })
        ));
    }

    #[test]
    fn test_system_turns_lifted_out_of_messages() {
        let request = CompletionRequest::builder()
            .model("m")
            .turn(ChatTurn::system("Be brief"))
            .turn(ChatTurn::user("Hi"))
            .turn(ChatTurn::assistant("Hello"))
            .build()
            .expect("valid request");

        let wire = AnthropicBackend::transform_request(&request, false);
        assert_eq!(wire.system.as_deref(), Some("Be brief"));
        assert_eq!(wire.messages.len(), 2);
        assert_eq!(wire.messages[0].role, "user");
        assert_eq!(wire.messages[1].role, "assistant");
    }

    #[test]
    fn test_block_content_serializes_in_wire_shape() {
        let request = CompletionRequest::builder()
            .model("m")
            .turn(ChatTurn::user_blocks(vec![
                ContentBlock::image("image/png", "QUJD"),
                ContentBlock::text("describe this"),
            ]))
            .build()
            .expect("valid request");

        let wire = AnthropicBackend::transform_request(&request, true);
        let json = serde_json::to_value(&wire).expect("serialize");
        assert_eq!(json["stream"], true);
        assert_eq!(json["messages"][0]["content"][0]["type"], "image");
        assert_eq!(
            json["messages"][0]["content"][0]["source"]["media_type"],
            "image/png"
        );
        assert_eq!(json["messages"][0]["content"][1]["type"], "text");
    }

    #[tokio::test]
    async fn test_complete_returns_first_text_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .and(body_partial_json(serde_json::json!({
                "model": "claude-3-opus-20240229",
                "max_tokens": 4096,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [{"type": "text", "text": "Hi there!"}],
                "model": "claude-3-opus-20240229"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let completion = backend_for(&server)
            .complete(&request())
            .await
            .expect("completion");
        assert_eq!(completion.text, "Hi there!");
        assert_eq!(completion.model, "claude-3-opus-20240229");
    }

    #[tokio::test]
    async fn test_provider_error_normalized_with_upstream_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"type": "rate_limit_error", "message": "overloaded"}
            })))
            .mount(&server)
            .await;

        let err = backend_for(&server)
            .complete(&request())
            .await
            .expect_err("should fail");
        match err {
            GatewayError::Completion { message } => {
                assert!(message.contains("overloaded"));
                assert!(message.contains("429"));
            }
            other => panic!("expected Completion error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_response_body_is_a_completion_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = backend_for(&server)
            .complete(&request())
            .await
            .expect_err("should fail");
        assert!(matches!(err, GatewayError::Completion { .. }));
    }

    #[tokio::test]
    async fn test_stream_decodes_deltas_and_terminates_once() {
        let server = MockServer::start().await;
        let sse_body = concat!(
            "event: message_start\n",
            "data: {\"type\":\"message_start\"}\n\n",
            "event: content_block_delta\n",
            "data: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"Hel\"}}\n\n",
            "event: content_block_delta\n",
            "data: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"lo\"}}\n\n",
            "event: ping\n",
            "data: {\"type\":\"ping\"}\n\n",
            "event: message_stop\n",
            "data: {\"type\":\"message_stop\"}\n\n",
        );
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(sse_body, "text/event-stream"))
            .mount(&server)
            .await;

        let mut stream = backend_for(&server)
            .complete_stream(&request())
            .await
            .expect("stream established");

        assert_eq!(stream.next().await, Some(StreamEvent::Delta("Hel".to_string())));
        assert_eq!(stream.next().await, Some(StreamEvent::Delta("lo".to_string())));
        assert_eq!(stream.next().await, Some(StreamEvent::Done));
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn test_stream_error_event_surfaces_in_band() {
        let server = MockServer::start().await;
        let sse_body = concat!(
            "data: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"partial\"}}\n\n",
            "data: {\"type\":\"error\",\"error\":{\"type\":\"overloaded_error\",\"message\":\"overloaded\"}}\n\n",
        );
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(sse_body, "text/event-stream"))
            .mount(&server)
            .await;

        let mut stream = backend_for(&server)
            .complete_stream(&request())
            .await
            .expect("stream established");

        assert_eq!(
            stream.next().await,
            Some(StreamEvent::Delta("partial".to_string()))
        );
        assert_eq!(
            stream.next().await,
            Some(StreamEvent::Error("overloaded".to_string()))
        );
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn test_stream_establishment_failure_is_an_error_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {"type": "authentication_error", "message": "invalid api key"}
            })))
            .mount(&server)
            .await;

        let err = backend_for(&server)
            .complete_stream(&request())
            .await
            .expect_err("should fail before streaming");
        assert!(matches!(err, GatewayError::Completion { .. }));
    }
}
