//! Models endpoint
//!
//! Lists available models through the gateway.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};

use crate::{error::AppResult, upstream::ModelInfo, AppState};

/// List available models
///
/// Proxies the upstream catalogue as-is. The upstream returns a bare
/// array rather than the OpenAI `list` envelope, and the extra metadata
/// (token limits, descriptions) is worth keeping.
pub async fn list_models(
    State(state): State<Arc<AppState>>,
) -> AppResult<(StatusCode, Json<Vec<ModelInfo>>)> {
    let models = state.upstream.list_models().await?;
    Ok((StatusCode::OK, Json(models)))
}
