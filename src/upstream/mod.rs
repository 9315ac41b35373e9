//! Akash Chat upstream interface
//!
//! The HTTP client, the upstream's native wire types, and the classifier
//! for model rejections that ride inside otherwise-successful chat bodies.

pub mod client;
pub mod models;

pub use client::AkashClient;
pub use models::{is_invalid_model_error, AkashChatRequest, ImageStatus, ModelInfo, SYSTEM_PROMPT};
