//! Image generation over the upstream's asynchronous job protocol
//!
//! An image request is an ordinary chat request whose reply embeds
//! `jobId='…'` and `prompt='…'` markers instead of a text answer. The job
//! then has to be polled to completion on the status endpoint. Polling is
//! budgeted (60 attempts, one second apart by default) and cancellable
//! between attempts.

use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::api::{ChatCompletionRequest, ImageGenerationData};
use crate::error::{AppError, AppResult};
use crate::upstream::{is_invalid_model_error, AkashChatRequest, AkashClient, ImageStatus};

static JOB_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"jobId='([^']+)'").expect("valid jobId pattern"));

static PROMPT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"prompt='([^']+)'").expect("valid prompt pattern"));

/// Attempt budget for the status poll loop
#[derive(Debug, Clone)]
pub struct PollPolicy {
    /// Status requests to make before giving up
    pub max_attempts: u32,
    /// Pause between consecutive status requests
    pub interval: Duration,
}

impl Default for PollPolicy {
    /// One minute of polling, one request per second.
    fn default() -> Self {
        Self {
            max_attempts: 60,
            interval: Duration::from_secs(1),
        }
    }
}

/// Lifecycle states the upstream reports for an image job.
///
/// Anything unrecognized counts as still pending; only `succeeded` and
/// `failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    /// A status string this gateway does not know; treated as pending
    Other,
}

impl JobStatus {
    fn parse(status: &str) -> Self {
        match status {
            "queued" => Self::Queued,
            "running" => Self::Running,
            "succeeded" => Self::Succeeded,
            "failed" => Self::Failed,
            _ => Self::Other,
        }
    }

    /// True for the two states that end the poll loop
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// One image generation job, created on submission and updated by each poll
#[derive(Debug, Clone)]
struct ImageJob {
    id: String,
    prompt: String,
    status: JobStatus,
    /// Result path relative to the upstream host, set when succeeded
    result: String,
    elapsed_time: f64,
    queue_position: i64,
}

impl ImageJob {
    fn new(id: String, prompt: String) -> Self {
        Self {
            id,
            prompt,
            status: JobStatus::Queued,
            result: String::new(),
            elapsed_time: 0.0,
            queue_position: 0,
        }
    }

    fn update(&mut self, status: &ImageStatus) {
        self.status = JobStatus::parse(&status.status);
        self.result = status.result.clone();
        self.elapsed_time = status.elapsed_time;
        self.queue_position = status.queue_position;
    }
}

/// Driver for image-generation chat requests
pub struct ImageService {
    upstream: Arc<AkashClient>,
    policy: PollPolicy,
}

impl ImageService {
    pub fn new(upstream: Arc<AkashClient>) -> Self {
        Self::with_policy(upstream, PollPolicy::default())
    }

    /// Override the poll budget; tests shrink the interval with this
    pub fn with_policy(upstream: Arc<AkashClient>, policy: PollPolicy) -> Self {
        Self { upstream, policy }
    }

    /// Submit an image-generation chat request and poll its job until it
    /// produces an image.
    ///
    /// `cancel` stops the poll loop between attempts when the caller gives
    /// up (for instance during shutdown).
    #[instrument(skip_all, fields(model = %request.model))]
    pub async fn generate(
        &self,
        request: &ChatCompletionRequest,
        session_token: &str,
        temperature: f64,
        top_p: f64,
        cancel: CancellationToken,
    ) -> AppResult<ImageGenerationData> {
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

        let (job_id, prompt) = extract_job_markers(&body)?;
        info!(job_id = %job_id, "image job submitted");

        let mut job = ImageJob::new(job_id, prompt);
        self.poll_to_completion(&mut job, &cancel).await?;

        Ok(ImageGenerationData {
            model: request.model.clone(),
            job_id: job.id,
            prompt: job.prompt,
            pic: format!("{}{}", self.upstream.base_url(), job.result),
        })
    }

    /// Poll the status endpoint until the job reaches a terminal state or
    /// the attempt budget runs out.
    #[instrument(skip_all, fields(job_id = %job.id))]
    async fn poll_to_completion(
        &self,
        job: &mut ImageJob,
        cancel: &CancellationToken,
    ) -> AppResult<()> {
        for attempt in 1..=self.policy.max_attempts {
            let statuses = self.upstream.image_status(&job.id).await?;
            let status = statuses.first().ok_or_else(|| {
                AppError::UpstreamFormat("empty image status response".to_string())
            })?;
            job.update(status);

            match job.status {
                JobStatus::Succeeded => {
                    info!(attempt, elapsed = job.elapsed_time, "image job succeeded");
                    return Ok(());
                }
                JobStatus::Failed => {
                    warn!(attempt, "image job failed");
                    return Err(AppError::JobFailed {
                        job_id: job.id.clone(),
                    });
                }
                _ => {
                    debug!(
                        attempt,
                        status = %status.status,
                        queue_position = job.queue_position,
                        "image job still pending"
                    );
                }
            }

            if attempt < self.policy.max_attempts {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!(attempt, "image poll cancelled");
                        return Err(AppError::Cancelled);
                    }
                    _ = tokio::time::sleep(self.policy.interval) => {}
                }
            }
        }

        Err(AppError::PollTimeout {
            attempts: self.policy.max_attempts,
        })
    }
}

/// Extract the `jobId` and `prompt` markers from an image-generation chat
/// body. The two patterns are independent; either one missing is a
/// protocol-drift error.
fn extract_job_markers(body: &str) -> AppResult<(String, String)> {
    let job_id = JOB_ID_PATTERN
        .captures(body)
        .and_then(|captures| captures.get(1))
        .map(|capture| capture.as_str().to_string())
        .ok_or_else(|| AppError::UpstreamFormat("jobId not found in response".to_string()))?;

    let prompt = PROMPT_PATTERN
        .captures(body)
        .and_then(|captures| captures.get(1))
        .map(|capture| capture.as_str().to_string())
        .ok_or_else(|| AppError::UpstreamFormat("prompt not found in response".to_string()))?;

    Ok((job_id, prompt))
}
