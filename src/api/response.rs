//! Response types for the OpenAI-compatible API
//!
//! Defines the buffered chat completion response, the streaming chunk
//! structure, and the image-generation envelope.

use serde::{Deserialize, Serialize};

/// Role label the gateway emits in completion messages and deltas.
///
/// Responses only ever carry `assistant`; inbound message roles are open
/// strings (see [`super::request::ChatMessage`]).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Assistant,
}

/// Token usage statistics
///
/// The upstream reports no usage, so all counters are structurally present
/// but always zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    /// Number of tokens in the prompt
    pub prompt_tokens: u32,
    /// Number of tokens in the completion
    pub completion_tokens: u32,
    /// Total tokens used
    pub total_tokens: u32,
}

/// Message in a completion choice
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChoiceMessage {
    /// Role of the message author
    pub role: Role,
    /// Content of the message
    pub content: String,
}

/// A completion choice
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Choice {
    /// Index of this choice
    pub index: u32,
    /// The generated message
    pub message: ChoiceMessage,
    /// Reason the generation stopped; empty if the upstream reported none
    pub finish_reason: String,
}

/// Chat completion response (non-streaming)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionResponse {
    /// Unique identifier for this completion
    pub id: String,
    /// Object type (always "chat.completion")
    pub object: String,
    /// Unix timestamp of creation
    pub created: i64,
    /// Model used for completion
    pub model: String,
    /// List of completion choices
    pub choices: Vec<Choice>,
    /// Token usage statistics
    pub usage: Usage,
}

/// Delta content in a streaming chunk
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Delta {
    /// Role (only present in the first chunk)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// Content fragment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// A choice in a streaming chunk
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamChoice {
    /// Index of this choice
    pub index: u32,
    /// Delta content
    pub delta: Delta,
    /// Reason the generation stopped (only in the final chunk)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Streaming chunk for chat completion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamChunk {
    /// Unique identifier for this completion
    pub id: String,
    /// Object type (always "chat.completion.chunk")
    pub object: String,
    /// Unix timestamp of creation
    pub created: i64,
    /// Model used for completion
    pub model: String,
    /// List of choices with delta content
    pub choices: Vec<StreamChoice>,
}

impl StreamChunk {
    /// First chunk of a stream: announces the assistant role, no content.
    pub fn role_chunk(id: &str, model: &str, created: i64) -> Self {
        Self {
            id: id.to_string(),
            object: "chat.completion.chunk".to_string(),
            created,
            model: model.to_string(),
            choices: vec![StreamChoice {
                index: 0,
                delta: Delta {
                    role: Some(Role::Assistant),
                    content: None,
                },
                finish_reason: None,
            }],
        }
    }

    /// Intermediate chunk carrying a content fragment.
    pub fn content_chunk(id: &str, model: &str, created: i64, content: String) -> Self {
        Self {
            id: id.to_string(),
            object: "chat.completion.chunk".to_string(),
            created,
            model: model.to_string(),
            choices: vec![StreamChoice {
                index: 0,
                delta: Delta {
                    role: None,
                    content: Some(content),
                },
                finish_reason: None,
            }],
        }
    }

    /// Final chunk carrying the finish reason (omitted when empty).
    pub fn finish_chunk(id: &str, model: &str, created: i64, finish_reason: &str) -> Self {
        Self {
            id: id.to_string(),
            object: "chat.completion.chunk".to_string(),
            created,
            model: model.to_string(),
            choices: vec![StreamChoice {
                index: 0,
                delta: Delta::default(),
                finish_reason: if finish_reason.is_empty() {
                    None
                } else {
                    Some(finish_reason.to_string())
                },
            }],
        }
    }
}

/// Payload of a completed image generation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageGenerationData {
    /// Model that generated the image
    pub model: String,
    /// Upstream job identifier
    #[serde(rename = "jobId")]
    pub job_id: String,
    /// Prompt the upstream derived for the image worker
    pub prompt: String,
    /// Full URL of the finished image
    pub pic: String,
}

/// Envelope for image generation results: `{ "code": 200, "data": ... }`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageGenerationResponse {
    pub code: u16,
    pub data: ImageGenerationData,
}
