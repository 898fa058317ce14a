//! HTTP request handlers for the chat endpoints.

use axum::extract::multipart::{Field, Multipart, MultipartError};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use chat_core::{ChatTurn, CompletionRequest, GatewayError, MaxTokens, Temperature};
use chat_files::{assemble, classify, validate, StoredUpload, UploadedFile};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::extractors::JsonBody;
use crate::relay::StreamRelay;
use crate::state::AppState;

/// JSON body accepted by the chat endpoints.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Ordered conversation turns.
    pub messages: Vec<ChatTurn>,
    /// Optional model override.
    #[serde(default)]
    pub model: Option<String>,
    /// Raw temperature value; resolved permissively.
    #[serde(default)]
    pub temperature: Option<Value>,
}

/// Buffered completion response body.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// Generated text.
    pub content: String,
    /// Model that produced it.
    pub model: String,
}

/// JSON body accepted by the title endpoint.
#[derive(Debug, Deserialize)]
pub struct TitleRequest {
    /// Conversation to summarize.
    pub messages: Vec<ChatTurn>,
}

/// Title endpoint response body.
#[derive(Debug, Serialize)]
pub struct TitleResponse {
    /// Short conversation title.
    pub title: String,
}

/// Health endpoint response body.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the process is serving.
    pub status: &'static str,
    /// Crate version.
    pub version: &'static str,
}

const TITLE_PROMPT_PREFIX: &str = "Based on this conversation, please generate a short, \
     descriptive title (maximum 6 words). Here's the conversation:\n\n";

fn build_request(
    state: &AppState,
    turns: Vec<ChatTurn>,
    model: Option<String>,
    temperature: Option<&Value>,
) -> Result<CompletionRequest, GatewayError> {
    let completion = &state.config.completion;
    let model = model
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| completion.default_model.clone());

    CompletionRequest::builder()
        .model(model)
        .max_tokens(MaxTokens::resolve(Some(completion.max_tokens)).value())
        .temperature(Temperature::resolve(temperature, completion.default_temperature).value())
        .turns(turns)
        .build()
}

/// `POST /api/chat` — buffered completion.
#[instrument(skip_all)]
pub async fn send_message(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if body.messages.is_empty() {
        return Err(GatewayError::invalid_input("messages cannot be empty").into());
    }

    let request = build_request(&state, body.messages, body.model, body.temperature.as_ref())?;
    info!(model = %request.model, turns = request.turns.len(), "Dispatching completion");

    let completion = state.backend.complete(&request).await?;
    Ok(Json(ChatResponse {
        content: completion.text,
        model: completion.model,
    }))
}

/// `POST /api/chat/stream` — streaming completion relayed over SSE.
#[instrument(skip_all)]
pub async fn stream_message(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<ChatRequest>,
) -> Result<Response, ApiError> {
    if body.messages.is_empty() {
        return Err(GatewayError::invalid_input("messages cannot be empty").into());
    }

    let request = build_request(&state, body.messages, body.model, body.temperature.as_ref())?;
    info!(model = %request.model, turns = request.turns.len(), "Dispatching streaming completion");

    let upstream = state.backend.complete_stream(&request).await?;
    Ok(StreamRelay::new(upstream).into_response())
}

/// `POST /api/chat/upload` — multipart upload assembled into one user turn,
/// then a buffered completion.
#[instrument(skip_all)]
pub async fn upload_and_complete(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ChatResponse>, ApiError> {
    let mut stored: Vec<StoredUpload> = Vec::new();
    let mut message = String::new();
    let mut model: Option<String> = None;
    let mut temperature: Option<Value> = None;

    // Blobs written so far must be cleaned up if anything below fails, so
    // every early return goes through discard_stored.
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                discard_stored(&state, &stored).await;
                return Err(map_multipart_err(e).into());
            }
        };

        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "files" => {
                if stored.len() >= state.config.uploads.max_files {
                    discard_stored(&state, &stored).await;
                    return Err(GatewayError::invalid_input(format!(
                        "too many files; at most {} are accepted",
                        state.config.uploads.max_files
                    ))
                    .into());
                }
                match receive_file(&state, field).await {
                    Ok(upload) => stored.push(upload),
                    Err(e) => {
                        discard_stored(&state, &stored).await;
                        return Err(e.into());
                    }
                }
            }
            "message" => message = read_text_field(&state, field, &stored).await?,
            "model" => model = Some(read_text_field(&state, field, &stored).await?),
            "temperature" => {
                temperature =
                    Some(Value::String(read_text_field(&state, field, &stored).await?));
            }
            // Unrecognized fields are ignored.
            _ => {}
        }
    }

    if stored.is_empty() {
        let err = if message.trim().is_empty() {
            GatewayError::EmptyRequest
        } else {
            GatewayError::invalid_input("at least one file is required")
        };
        return Err(err.into());
    }

    info!(files = stored.len(), "Assembling uploaded files");
    let blocks = assemble(&state.blobs, message.trim(), stored).await?;
    let turn = ChatTurn::user_blocks(blocks);

    let request = build_request(&state, vec![turn], model, temperature.as_ref())?;
    let completion = state.backend.complete(&request).await?;
    Ok(Json(ChatResponse {
        content: completion.text,
        model: completion.model,
    }))
}

/// `POST /api/chat/title` — short title for a conversation.
#[instrument(skip_all)]
pub async fn generate_title(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<TitleRequest>,
) -> Result<Json<TitleResponse>, ApiError> {
    if body.messages.is_empty() {
        return Err(GatewayError::invalid_input("messages cannot be empty").into());
    }

    let transcript = body
        .messages
        .iter()
        .map(|turn| format!("{}: {}", turn.role, turn.content.to_plain_text()))
        .collect::<Vec<_>>()
        .join("\n");

    let prompt = format!("{TITLE_PROMPT_PREFIX}{transcript}");
    let request = build_request(&state, vec![ChatTurn::user(prompt)], None, None)?;

    let completion = state.backend.complete(&request).await?;
    Ok(Json(TitleResponse {
        title: tidy_title(&completion.text),
    }))
}

/// `GET /health` — liveness probe, never rate limited.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn tidy_title(raw: &str) -> String {
    raw.trim().trim_matches('"').chars().take(80).collect()
}

async fn read_text_field(
    state: &AppState,
    field: Field<'_>,
    stored: &[StoredUpload],
) -> Result<String, ApiError> {
    match field.text().await {
        Ok(text) => Ok(text),
        Err(e) => {
            discard_stored(state, stored).await;
            Err(map_multipart_err(e).into())
        }
    }
}

async fn receive_file(state: &AppState, mut field: Field<'_>) -> Result<StoredUpload, GatewayError> {
    let name = field.file_name().unwrap_or("unnamed").to_string();
    let declared = field.content_type().unwrap_or_default().to_string();

    // Classify by extension and declared type before buffering any bytes.
    let rule = classify(&name, &declared)?;
    let cap = rule
        .effective_limit()
        .min(state.config.uploads.max_file_size_bytes);

    let mut bytes: Vec<u8> = Vec::new();
    loop {
        let chunk = match field.chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(e) => return Err(map_multipart_err(e)),
        };
        if bytes.len() as u64 + chunk.len() as u64 > cap {
            return Err(GatewayError::FileTooLarge {
                name,
                size_bytes: bytes.len() as u64 + chunk.len() as u64,
                limit_bytes: cap,
            });
        }
        bytes.extend_from_slice(&chunk);
    }

    let file = UploadedFile::new(name, declared, bytes.len() as u64);
    let category = validate(&file)?;
    let handle = state.blobs.put(&bytes, &file.extension).await?;

    Ok(StoredUpload {
        file,
        category,
        handle,
    })
}

async fn discard_stored(state: &AppState, stored: &[StoredUpload]) {
    for upload in stored {
        state.blobs.delete(&upload.handle).await;
    }
}

fn map_multipart_err(err: MultipartError) -> GatewayError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        GatewayError::PayloadTooLarge
    } else {
        GatewayError::invalid_input(format!("malformed multipart request: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tidy_title_strips_quotes_and_whitespace() {
        assert_eq!(tidy_title("  \"Trip Planning Help\"  "), "Trip Planning Help");
        assert_eq!(tidy_title("Plain title"), "Plain title");
    }

    #[test]
    fn test_tidy_title_truncates() {
        let long = "x".repeat(200);
        assert_eq!(tidy_title(&long).chars().count(), 80);
    }
}
