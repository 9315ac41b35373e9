//! OpenAI-compatible API surface
//!
//! Request, response, and streaming-chunk types exposed by the gateway,
//! plus the SSE framing helpers used by the streaming endpoint.

pub mod request;
pub mod response;
pub mod sse;

pub use request::{ChatCompletionRequest, ChatMessage};
pub use response::{
    ChatCompletionResponse, Choice, ChoiceMessage, Delta, ImageGenerationData,
    ImageGenerationResponse, Role, StreamChoice, StreamChunk, Usage,
};
pub use sse::{format_sse_chunk, format_sse_done};
