//! Session credential cache for the Akash Chat upstream
//!
//! The upstream authenticates with a `session_token` cookie issued by its
//! session endpoint and valid for about an hour. One shared credential
//! serves all gateway clients; it lives in a read-mostly slot and is
//! refreshed on demand with a safety margin before the upstream would
//! actually expire it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::error::{AppError, AppResult};
use crate::upstream::AkashClient;

/// How long the upstream keeps a session alive.
pub const UPSTREAM_SESSION_LIFETIME: Duration = Duration::from_secs(60 * 60);

/// How long a fetched credential is served from cache. Five minutes under
/// the upstream lifetime, so a token is never handed out close to expiry.
pub const CACHED_SESSION_LIFETIME: Duration = Duration::from_secs(55 * 60);

const SESSION_COOKIE_PREFIX: &str = "session_token=";

/// A cached upstream credential
#[derive(Debug, Clone)]
struct Credential {
    /// Full `session_token=<value>` cookie pair, replayed verbatim on chat
    /// requests
    token: String,
    expires_at: Instant,
}

impl Credential {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Read-mostly cache around the upstream session endpoint
pub struct SessionCache {
    upstream: Arc<AkashClient>,
    slot: RwLock<Option<Credential>>,
}

impl SessionCache {
    /// Create an empty cache; the first `token()` call fetches a session
    pub fn new(upstream: Arc<AkashClient>) -> Self {
        Self {
            upstream,
            slot: RwLock::new(None),
        }
    }

    /// Get a valid session token, refreshing if the cached one is missing
    /// or stale.
    ///
    /// Readers share the lock and never block each other. A cold or stale
    /// cache sends every caller to [`refresh`](Self::refresh), where the
    /// write lock serializes them and the double-check lets all but the
    /// first return without an upstream call.
    pub async fn token(&self) -> AppResult<String> {
        {
            let slot = self.slot.read().await;
            if let Some(credential) = slot.as_ref() {
                if !credential.is_expired() {
                    return Ok(credential.token.clone());
                }
            }
        }

        self.refresh().await
    }

    #[instrument(skip(self))]
    async fn refresh(&self) -> AppResult<String> {
        let mut slot = self.slot.write().await;

        // Another task may have refreshed while we waited for the lock.
        if let Some(credential) = slot.as_ref() {
            if !credential.is_expired() {
                debug!("session already refreshed by a concurrent request");
                return Ok(credential.token.clone());
            }
        }

        let response = self.upstream.fetch_session().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Session(format!(
                "session request failed with status {}",
                status
            )));
        }

        let header = response
            .headers()
            .get(reqwest::header::SET_COOKIE)
            .ok_or_else(|| {
                AppError::Session("no Set-Cookie header in session response".to_string())
            })?;
        let header = header
            .to_str()
            .map_err(|_| AppError::Session("Set-Cookie header is not valid UTF-8".to_string()))?;

        let token = extract_session_token(header)?;
        info!("session token refreshed");

        *slot = Some(Credential {
            token: token.clone(),
            expires_at: Instant::now() + CACHED_SESSION_LIFETIME,
        });

        Ok(token)
    }
}

/// Pull the `session_token` pair out of a `Set-Cookie` header.
///
/// Only the first `;`-separated segment is considered, and it must carry a
/// non-empty `session_token` value.
fn extract_session_token(header: &str) -> AppResult<String> {
    let first = header.split(';').next().unwrap_or_default().trim();
    let value = first.strip_prefix(SESSION_COOKIE_PREFIX).ok_or_else(|| {
        AppError::Session("session_token not found in Set-Cookie header".to_string())
    })?;

    if value.is_empty() {
        return Err(AppError::Session("empty session token".to_string()));
    }

    Ok(format!("{}{}", SESSION_COOKIE_PREFIX, value))
}
