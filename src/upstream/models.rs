//! Wire types for the Akash Chat upstream

use rand::{distr::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};

use crate::api::{ChatCompletionRequest, ChatMessage};

/// System prompt the upstream web client sends with every conversation.
pub const SYSTEM_PROMPT: &str = "You are a skilled conversationalist who adapts naturally to \
what users need. Your responses match the situation—whether someone wants deep analysis, casual \
chat, emotional support, creative collaboration, or just needs to vent.\nCore Approach\n\nRead \
between the lines to understand what people actually want\nMatch their energy and conversational \
style\nShift seamlessly between modes: analytical, empathetic, humorous, creative, or \
practical\nWhen people need to be heard, focus on listening rather than fixing\nFor substantive \
topics, provide thorough, well-organized insights that aid decision-making\n\nCommunication \
Style\n\nSound natural and authentic, never templated or robotic\nAvoid unnecessary politeness \
policing or inclusion reminders\nWrite in requested voices, styles, or perspectives when \
asked\nAdapt tone appropriately—you can be direct, irreverent, or even rude when specifically \
prompted to do so\n\nInteraction Philosophy\n\nSometimes the best help is simply being present \
and understanding\nDon't over-optimize for helpfulness when someone just wants connection\nTrust \
that users know what they're looking for and deliver accordingly\nProvide depth and insight for \
complex topics while keeping casual conversations light";

const CORRELATION_ID_LEN: usize = 16;

const ERROR_MARKER: &str = "error";
const INVALID_MODEL_MARKER: &str = "Invalid model name";

/// Spots upstream model rejections, which arrive inside HTTP 200 chat bodies
/// rather than as status codes.
pub fn is_invalid_model_error(body: &str) -> bool {
    body.contains(ERROR_MARKER) && body.contains(INVALID_MODEL_MARKER)
}

/// Chat request in the upstream's native shape
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AkashChatRequest {
    pub id: String,
    pub messages: Vec<ChatMessage>,
    pub model: String,
    pub system: String,
    pub temperature: f64,
    #[serde(rename = "topP")]
    pub top_p: f64,
    pub context: Vec<serde_json::Value>,
}

impl AkashChatRequest {
    /// Derive the upstream request from an inbound chat completion request,
    /// with sampling parameters already resolved against the mode defaults.
    pub fn from_chat(request: &ChatCompletionRequest, temperature: f64, top_p: f64) -> Self {
        Self {
            id: correlation_id(),
            messages: request.messages.clone(),
            model: request.model.clone(),
            system: SYSTEM_PROMPT.to_string(),
            temperature,
            top_p,
            context: Vec::new(),
        }
    }
}

/// Random 16-character alphanumeric id, one per upstream conversation.
fn correlation_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(CORRELATION_ID_LEN)
        .map(char::from)
        .collect()
}

/// One entry of the upstream's image job status array.
///
/// Decoded leniently: the worker fields come and go depending on whether a
/// worker has picked the job up yet.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImageStatus {
    pub job_id: String,
    pub worker_name: String,
    pub worker_city: String,
    pub worker_country: String,
    pub status: String,
    pub result: String,
    pub worker_gpu: String,
    pub elapsed_time: f64,
    pub queue_position: i64,
}

/// One entry of the upstream model catalogue, passed through to clients
/// in the upstream's own field spelling.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(rename = "tokenLimit", skip_serializing_if = "Option::is_none")]
    pub token_limit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hf_repo: Option<String>,
    #[serde(rename = "aboutContent")]
    pub about_content: String,
    #[serde(rename = "infoContent")]
    pub info_content: String,
    #[serde(rename = "thumbnailId")]
    pub thumbnail_id: String,
    #[serde(rename = "deployUrl", skip_serializing_if = "Option::is_none")]
    pub deploy_url: Option<String>,
    pub available: bool,
}
