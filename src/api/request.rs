//! Request types for the OpenAI-compatible API
//!
//! Unknown fields are deliberately ignored: clients built against the full
//! OpenAI surface send parameters (max_tokens, stop, ...) that the upstream
//! has no equivalent for.

use serde::{Deserialize, Serialize};

/// A single conversation message, forwarded to the upstream verbatim.
///
/// The role is an open string, not a closed enum: the upstream accepts
/// whatever role label the client sent, and OpenAI keeps adding new ones
/// (`developer`), so the gateway passes it through untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// Role of the message author
    pub role: String,
    /// Content of the message
    pub content: String,
}

/// Chat completion request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionRequest {
    /// Model to run the conversation against
    pub model: String,
    /// Messages in the conversation
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Nucleus sampling parameter; the upstream web client spells this `topP`
    #[serde(skip_serializing_if = "Option::is_none", alias = "topP")]
    pub top_p: Option<f64>,
    /// Whether to stream the response
    #[serde(default)]
    pub stream: bool,
}
