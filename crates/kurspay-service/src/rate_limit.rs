//! Request-level rate limiting.
//!
//! Handlers for public-facing actions call [`enforce`] before doing their
//! work. Counters are persisted per `(actor, action)` pair; a store failure
//! fails open.

use chrono::{Duration, Utc};
use kurspay_core::{RateLimitDecision, UserId};
use kurspay_store::Store;

use crate::error::ApiError;
use crate::state::AppState;

/// Action label for purchase initiation.
pub const ACTION_PURCHASE: &str = "purchase";

/// Check and record one attempt for `(actor, action)`.
///
/// # Errors
///
/// Returns [`ApiError::RateLimited`] when the actor exhausted the window.
pub fn enforce(state: &AppState, actor: &UserId, action: &str) -> Result<(), ApiError> {
    let window = Duration::minutes(state.config.rate_limit_window_minutes);

    match state.store.check_rate_limit(
        &actor.to_string(),
        action,
        state.config.rate_limit_max_attempts,
        window,
        Utc::now(),
    ) {
        Ok(RateLimitDecision::Allowed { remaining }) => {
            tracing::debug!(actor = %actor, action = %action, remaining, "Rate limit check passed");
            Ok(())
        }
        Ok(RateLimitDecision::Limited { retry_after }) => {
            tracing::info!(actor = %actor, action = %action, "Rate limit exceeded");
            Err(ApiError::RateLimited {
                retry_after_seconds: retry_after.num_seconds().max(0),
            })
        }
        Err(e) => {
            // Fail open on counter-store errors.
            tracing::warn!(
                actor = %actor,
                action = %action,
                error = %e,
                "Rate limit check failed - allowing request"
            );
            Ok(())
        }
    }
}
