//! Chat translation between the OpenAI surface and the upstream protocol
//!
//! [`ChatService`] owns both delivery modes: `complete` collects the whole
//! upstream body and folds it into a single completion document; `stream`
//! re-emits it incrementally as OpenAI-style delta chunks. Both run the
//! same tokenizer and the same invalid-model classifier.

use std::pin::Pin;
use std::sync::Arc;

use async_stream::stream;
use bytes::Bytes;
use chrono::Utc;
use futures::{Stream, StreamExt};
use tracing::{debug, error, info, instrument, warn};

use crate::api::{
    ChatCompletionRequest, ChatCompletionResponse, Choice, ChoiceMessage, Role, StreamChunk, Usage,
};
use crate::error::{AppError, AppResult};
use crate::protocol::{LineParser, ProtocolEvent};
use crate::upstream::{is_invalid_model_error, AkashChatRequest, AkashClient};

/// Ordered push-only stream of completion chunks.
///
/// The service never touches the transport: SSE framing and the `[DONE]`
/// sentinel belong to the HTTP boundary consuming this stream.
pub type ChatEventStream = Pin<Box<dyn Stream<Item = AppResult<StreamChunk>> + Send>>;

type UpstreamByteStream = Pin<Box<dyn Stream<Item = AppResult<Bytes>> + Send>>;

/// Translator for text-generation chat requests
pub struct ChatService {
    upstream: Arc<AkashClient>,
}

impl ChatService {
    pub fn new(upstream: Arc<AkashClient>) -> Self {
        Self { upstream }
    }

    /// Run a chat request to completion and fold the upstream body into a
    /// single OpenAI-shaped response.
    #[instrument(skip_all, fields(model = %request.model))]
    pub async fn complete(
        &self,
        request: &ChatCompletionRequest,
        session_token: &str,
        temperature: f64,
        top_p: f64,
    ) -> AppResult<ChatCompletionResponse> {
        let upstream_request = AkashChatRequest::from_chat(request, temperature, top_p);
        let response = self
            .upstream
            .send_chat(&upstream_request, session_token)
            .await?;
        let body = response.text().await?;

        if is_invalid_model_error(&body) {
            warn!("upstream rejected the requested model");
            return Err(AppError::InvalidModel);
        }

        let mut message_id = String::new();
        let mut content = String::new();
        let mut finish_reason = String::new();
        for event in LineParser::parse(&body) {
            match event {
                ProtocolEvent::MessageStart { message_id: id } => message_id = id,
                ProtocolEvent::ContentChunk { text } => content.push_str(&text),
                ProtocolEvent::Finish { reason } => finish_reason = reason,
            }
        }

        debug!(
            message_id = %message_id,
            content_len = content.len(),
            finish_reason = %finish_reason,
            "buffered translation complete"
        );

        Ok(ChatCompletionResponse {
            id: format!("chatcmpl-{}", message_id),
            object: "chat.completion".to_string(),
            created: Utc::now().timestamp(),
            model: request.model.clone(),
            choices: vec![Choice {
                index: 0,
                message: ChoiceMessage {
                    role: Role::Assistant,
                    content,
                },
                finish_reason,
            }],
            usage: Usage::default(),
        })
    }

    /// Run a chat request and re-emit the upstream body as delta chunks.
    ///
    /// The upstream is read until the message opens before this returns, so
    /// a model rejection (or a body with no message at all) still surfaces
    /// as a structured error rather than a broken event stream. After that,
    /// failures travel inside the stream and abort it.
    #[instrument(skip_all, fields(model = %request.model))]
    pub async fn stream(
        &self,
        request: &ChatCompletionRequest,
        session_token: &str,
        temperature: f64,
        top_p: f64,
    ) -> AppResult<ChatEventStream> {
        let upstream_request = AkashChatRequest::from_chat(request, temperature, top_p);
        let model = request.model.clone();
        let response = self
            .upstream
            .send_chat(&upstream_request, session_token)
            .await?;
        let mut upstream: UpstreamByteStream = Box::pin(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(AppError::from)),
        );

        let mut parser = LineParser::new();
        let mut preamble = String::new();
        let mut pending: Vec<ProtocolEvent> = Vec::new();
        let mut message_id: Option<String> = None;
        let mut upstream_done = false;

        while message_id.is_none() {
            match upstream.next().await {
                Some(chunk) => {
                    let chunk = chunk?;
                    // The classifier sees the raw text first: an error body
                    // never opens a message, and the check must win even if
                    // both land in the same chunk. It only reads up to the
                    // `f:` line, though; marker words inside generated
                    // content are not errors.
                    preamble.push_str(&String::from_utf8_lossy(&chunk));
                    if is_invalid_model_error(preamble_window(&preamble)) {
                        warn!("upstream rejected the requested model");
                        return Err(AppError::InvalidModel);
                    }
                    for event in parser.feed(&chunk) {
                        match event {
                            ProtocolEvent::MessageStart { message_id: id } => {
                                message_id = Some(id)
                            }
                            other => pending.push(other),
                        }
                    }
                }
                None => {
                    for event in parser.finish() {
                        match event {
                            ProtocolEvent::MessageStart { message_id: id } => {
                                message_id = Some(id)
                            }
                            other => pending.push(other),
                        }
                    }
                    upstream_done = true;
                    break;
                }
            }
        }

        let Some(message_id) = message_id else {
            return Err(AppError::UpstreamFormat(
                "upstream response has no message start".to_string(),
            ));
        };

        let id = format!("chatcmpl-{}", message_id);
        let created = Utc::now().timestamp();
        info!(completion_id = %id, "stream opened");

        Ok(emit_deltas(
            upstream,
            parser,
            pending,
            upstream_done,
            id,
            model,
            created,
        ))
    }
}

/// The raw body prefix the invalid-model classifier is allowed to see:
/// everything before the `f:` line, or the whole text if none has arrived.
fn preamble_window(raw: &str) -> &str {
    if raw.starts_with("f:") {
        return "";
    }
    match raw.find("\nf:") {
        Some(idx) => &raw[..idx],
        None => raw,
    }
}

/// Drive the opened message to its end as a push-only chunk stream.
///
/// `pending` holds events the handshake already decoded past the message
/// start. An upstream error is surfaced as the stream's final item with no
/// finish chunk after it, so the consumer sees the truncation.
fn emit_deltas(
    mut upstream: UpstreamByteStream,
    mut parser: LineParser,
    pending: Vec<ProtocolEvent>,
    upstream_done: bool,
    id: String,
    model: String,
    created: i64,
) -> ChatEventStream {
    Box::pin(stream! {
        yield Ok(StreamChunk::role_chunk(&id, &model, created));

        let mut finished = false;
        for event in pending {
            if let Some(chunk) = event_chunk(event, &id, &model, created, &mut finished) {
                yield Ok(chunk);
            }
        }

        if !finished && !upstream_done {
            'read: loop {
                match upstream.next().await {
                    Some(Ok(bytes)) => {
                        for event in parser.feed(&bytes) {
                            if let Some(chunk) =
                                event_chunk(event, &id, &model, created, &mut finished)
                            {
                                yield Ok(chunk);
                            }
                            if finished {
                                break 'read;
                            }
                        }
                    }
                    Some(Err(e)) => {
                        error!(error = %e, "upstream connection failed mid-stream");
                        yield Err(e);
                        return;
                    }
                    None => {
                        for event in parser.finish() {
                            if let Some(chunk) =
                                event_chunk(event, &id, &model, created, &mut finished)
                            {
                                yield Ok(chunk);
                            }
                        }
                        break 'read;
                    }
                }
            }
        }

        // Upstream went quiet without an e: line; close the stream with
        // an empty finish reason like the buffered path would report.
        if !finished {
            yield Ok(StreamChunk::finish_chunk(&id, &model, created, ""));
        }
    })
}

/// Translate one protocol event into the chunk to emit, if any.
fn event_chunk(
    event: ProtocolEvent,
    id: &str,
    model: &str,
    created: i64,
    finished: &mut bool,
) -> Option<StreamChunk> {
    match event {
        ProtocolEvent::MessageStart { .. } => None,
        ProtocolEvent::ContentChunk { text } => {
            Some(StreamChunk::content_chunk(id, model, created, text))
        }
        ProtocolEvent::Finish { reason } => {
            *finished = true;
            Some(StreamChunk::finish_chunk(id, model, created, &reason))
        }
    }
}
