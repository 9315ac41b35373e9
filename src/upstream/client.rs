//! HTTP client for the Akash Chat upstream
//!
//! All outbound calls go through [`AkashClient`]. Chat responses are not
//! gated on HTTP status: the upstream reports failures (including model
//! rejections) inside successful responses, so callers classify bodies.

use reqwest::header::{ACCEPT, CONTENT_TYPE, COOKIE, REFERER};
use tracing::{debug, instrument};

use crate::config::Config;
use crate::error::{AppError, AppResult};

use super::models::{AkashChatRequest, ImageStatus, ModelInfo};

/// Client for the Akash Chat API
pub struct AkashClient {
    client: reqwest::Client,
    base_url: String,
}

impl AkashClient {
    /// Create a new upstream client sharing the application HTTP client
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            base_url: config.akash_base_url.clone(),
        }
    }

    /// Upstream base URL, without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn referer(&self) -> String {
        format!("{}/", self.base_url)
    }

    /// Request a fresh session.
    ///
    /// Returns the raw response: the session cache owns the status check and
    /// `Set-Cookie` extraction.
    #[instrument(skip(self))]
    pub async fn fetch_session(&self) -> AppResult<reqwest::Response> {
        let url = format!("{}/api/auth/session/", self.base_url);
        let response = self
            .client
            .get(&url)
            .header(REFERER, self.referer())
            .header(ACCEPT, "*/*")
            .send()
            .await?;

        debug!(status = %response.status(), "session response received");
        Ok(response)
    }

    /// Send a chat request.
    ///
    /// The body is left unread so callers can collect it whole (buffered
    /// translation) or consume it incrementally (streaming).
    #[instrument(skip_all, fields(model = %request.model, request_id = %request.id))]
    pub async fn send_chat(
        &self,
        request: &AkashChatRequest,
        session_token: &str,
    ) -> AppResult<reqwest::Response> {
        let url = format!("{}/api/chat/", self.base_url);
        let response = self
            .client
            .post(&url)
            .header(REFERER, self.referer())
            .header(COOKIE, session_token)
            .header(ACCEPT, "*/*")
            .header(CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await?;

        debug!(status = %response.status(), "chat response received");
        Ok(response)
    }

    /// Check the status of an image generation job. Unauthenticated.
    #[instrument(skip(self))]
    pub async fn image_status(&self, job_id: &str) -> AppResult<Vec<ImageStatus>> {
        let url = format!("{}/api/image-status?ids={}", self.base_url, job_id);
        let response = self.client.get(&url).send().await?;

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            AppError::UpstreamFormat(format!("failed to decode image status response: {}", e))
        })
    }

    /// Fetch the upstream model catalogue
    #[instrument(skip(self))]
    pub async fn list_models(&self) -> AppResult<Vec<ModelInfo>> {
        let url = format!("{}/api/models/", self.base_url);
        let response = self
            .client
            .get(&url)
            .header(REFERER, self.referer())
            .header(ACCEPT, "*/*")
            .send()
            .await?;

        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| AppError::UpstreamFormat(format!("failed to decode model list: {}", e)))
    }
}
