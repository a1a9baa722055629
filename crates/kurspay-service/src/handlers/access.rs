//! Course access handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use kurspay_store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// One course grant in the caller's access record.
#[derive(Debug, Serialize)]
pub struct GrantResponse {
    /// The granted course.
    pub course_id: String,
    /// When the purchase was confirmed.
    pub purchased_at: String,
    /// The transaction behind the grant.
    pub transaction_id: String,
    /// Whether the grant is currently usable.
    pub active: bool,
}

/// The caller's full access record.
#[derive(Debug, Serialize)]
pub struct AccessResponse {
    /// Owning user.
    pub user_id: String,
    /// Grants, sorted by course id.
    pub courses: Vec<GrantResponse>,
}

/// Get the current user's course grants.
///
/// A user with no confirmed purchases gets an empty list, not a 404.
pub async fn get_my_access(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<AccessResponse>, ApiError> {
    let courses = state
        .store
        .get_access(&auth.user_id)?
        .map(|access| {
            access
                .courses
                .iter()
                .map(|(course_id, grant)| GrantResponse {
                    course_id: course_id.to_string(),
                    purchased_at: grant.purchased_at.to_rfc3339(),
                    transaction_id: grant.transaction_id.to_string(),
                    active: grant.active,
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(Json(AccessResponse {
        user_id: auth.user_id.to_string(),
        courses,
    }))
}
