//! Maintenance handlers: manual sweep trigger and rate-limit reset.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use kurspay_store::Store;

use crate::auth::AdminActor;
use crate::error::ApiError;
use crate::state::AppState;
use crate::sweeper;

/// Sweep response.
#[derive(Debug, Serialize)]
pub struct SweepResponse {
    /// Whether the sweep completed.
    pub success: bool,
    /// How many pending transactions were expired.
    pub expired_count: u64,
}

/// Rate-limit reset request body.
#[derive(Debug, Deserialize)]
pub struct ResetRateLimitRequest {
    /// The throttled actor (user id or other identifier).
    pub actor: String,
    /// The throttled action label.
    pub action: String,
}

/// Run an expiry sweep immediately.
///
/// Same operation as the scheduled sweep; useful after changing the expiry
/// window or during incident cleanup.
pub async fn run_sweep(
    State(state): State<Arc<AppState>>,
    admin: AdminActor,
) -> Result<Json<SweepResponse>, ApiError> {
    let expired_count = sweeper::run_sweep(&state).map_err(ApiError::from)?;

    tracing::info!(admin = %admin.user_id, expired = expired_count, "Manual expiry sweep");

    Ok(Json(SweepResponse {
        success: true,
        expired_count,
    }))
}

/// Clear the rate-limit counter for one `(actor, action)` pair.
pub async fn reset_rate_limit(
    State(state): State<Arc<AppState>>,
    admin: AdminActor,
    Json(body): Json<ResetRateLimitRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.store.reset_rate_limit(&body.actor, &body.action)?;

    tracing::info!(
        admin = %admin.user_id,
        actor = %body.actor,
        action = %body.action,
        "Rate limit counter reset"
    );

    Ok(Json(serde_json::json!({ "reset": true })))
}
