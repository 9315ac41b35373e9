//! Chat completions endpoint
//!
//! OpenAI-compatible chat completions API endpoint. Dispatches between
//! buffered responses, streamed responses, and image generation based on
//! the requested model and the stream flag.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use tracing::{info, warn};

use crate::{
    api::{format_sse_chunk, format_sse_done, ChatCompletionRequest, ImageGenerationResponse},
    chat::ChatEventStream,
    error::AppError,
    AppState,
};

/// Model id the upstream reserves for image generation.
pub const IMAGE_MODEL: &str = "AkashGen";

/// Sampling defaults for text models.
const TEXT_TEMPERATURE: f64 = 0.6;
const TEXT_TOP_P: f64 = 0.95;

/// Sampling defaults for image generation.
const IMAGE_TEMPERATURE: f64 = 0.85;
const IMAGE_TOP_P: f64 = 1.0;

/// Handle chat completion requests
pub async fn chat_completions(
    State(state): State<Arc<AppState>>,
    request: axum::extract::Request,
) -> Result<Response, AppError> {
    let body = axum::body::to_bytes(request.into_body(), usize::MAX)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to read request body: {}", e)))?;

    let chat_request: ChatCompletionRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e)))?;

    if chat_request.model.is_empty() {
        return Err(AppError::BadRequest("model is required".to_string()));
    }
    if chat_request.messages.is_empty() {
        return Err(AppError::BadRequest("messages is required".to_string()));
    }

    info!(
        model = %chat_request.model,
        stream = chat_request.stream,
        messages = chat_request.messages.len(),
        "Processing chat completion request"
    );

    let session_token = state.session.token().await?;

    // Image generation takes precedence over the stream flag: the job id
    // only exists once polling finishes, so there is nothing to stream.
    if chat_request.model == IMAGE_MODEL {
        return handle_image_generation(state, chat_request, &session_token).await;
    }

    if chat_request.stream {
        handle_streaming_chat(state, chat_request, &session_token).await
    } else {
        handle_buffered_chat(state, chat_request, &session_token).await
    }
}

/// Handle non-streaming chat completion
async fn handle_buffered_chat(
    state: Arc<AppState>,
    request: ChatCompletionRequest,
    session_token: &str,
) -> Result<Response, AppError> {
    let temperature = request.temperature.unwrap_or(TEXT_TEMPERATURE);
    let top_p = request.top_p.unwrap_or(TEXT_TOP_P);

    let completion = state
        .chat
        .complete(&request, session_token, temperature, top_p)
        .await?;

    Ok((StatusCode::OK, Json(completion)).into_response())
}

/// Handle streaming chat completion with SSE
async fn handle_streaming_chat(
    state: Arc<AppState>,
    request: ChatCompletionRequest,
    session_token: &str,
) -> Result<Response, AppError> {
    let temperature = request.temperature.unwrap_or(TEXT_TEMPERATURE);
    let top_p = request.top_p.unwrap_or(TEXT_TOP_P);

    let chunks = state
        .chat
        .stream(&request, session_token, temperature, top_p)
        .await?;

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .header("X-Accel-Buffering", "no")
        .body(Body::from_stream(sse_frame_stream(chunks)))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build response: {}", e)))?;

    Ok(response)
}

/// Frame a chunk stream as SSE `data:` events.
///
/// Clean exhaustion appends the `[DONE]` sentinel. An error ends the byte
/// stream right after surfacing it: no sentinel, no trailing error frame,
/// so clients see the truncation instead of a well-formed end of stream.
fn sse_frame_stream(chunks: ChatEventStream) -> impl Stream<Item = Result<Bytes, AppError>> {
    async_stream::stream! {
        let mut chunks = chunks;
        while let Some(item) = chunks.next().await {
            match item {
                Ok(chunk) => yield Ok(format_sse_chunk(&chunk)),
                Err(e) => {
                    warn!(error = %e, "Stream aborted mid-flight");
                    yield Err(e);
                    return;
                }
            }
        }
        yield Ok(format_sse_done());
    }
}

/// Handle image generation via the chat surface
async fn handle_image_generation(
    state: Arc<AppState>,
    request: ChatCompletionRequest,
    session_token: &str,
) -> Result<Response, AppError> {
    let temperature = request.temperature.unwrap_or(IMAGE_TEMPERATURE);
    let top_p = request.top_p.unwrap_or(IMAGE_TOP_P);

    let data = state
        .image
        .generate(
            &request,
            session_token,
            temperature,
            top_p,
            state.shutdown.child_token(),
        )
        .await?;

    let response = ImageGenerationResponse { code: 200, data };
    Ok((StatusCode::OK, Json(response)).into_response())
}
