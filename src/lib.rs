//! Skybridge - OpenAI-compatible gateway for Akash Chat
//!
//! This library exposes the core functionality of the Skybridge gateway.
//! It translates the OpenAI chat completions API onto the Akash Chat
//! network's private protocol: session cookies, a tagged line protocol
//! for completions, and a job queue for image generation.

pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod image;
pub mod protocol;
pub mod routes;
pub mod session;
pub mod upstream;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio_util::sync::CancellationToken;

pub use crate::chat::ChatService;
pub use crate::config::Config;
pub use crate::image::ImageService;
pub use crate::session::SessionCache;
pub use crate::upstream::AkashClient;

/// Application state shared across all request handlers
pub struct AppState {
    pub config: Config,
    pub start_time: Instant,
    /// Cancelled on shutdown; long-running poll loops watch child tokens
    pub shutdown: CancellationToken,
    pub upstream: Arc<AkashClient>,
    pub session: Arc<SessionCache>,
    pub chat: ChatService,
    pub image: ImageService,
}

impl AppState {
    /// Create a new application state
    pub fn new(config: Config) -> Result<Self> {
        // HTTP client shared by every upstream call
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(100)
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        let upstream = Arc::new(AkashClient::new(http_client, &config));
        let session = Arc::new(SessionCache::new(upstream.clone()));
        let chat = ChatService::new(upstream.clone());
        let image = ImageService::new(upstream.clone());

        Ok(Self {
            config,
            start_time: Instant::now(),
            shutdown: CancellationToken::new(),
            upstream,
            session,
            chat,
            image,
        })
    }
}
