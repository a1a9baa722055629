//! User registration handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use kurspay_core::{Role, UserRecord};
use kurspay_store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Registration request body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Email address for payment notifications.
    pub email: String,
}

/// User record response.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    /// User ID.
    pub user_id: String,
    /// Registered email.
    pub email: String,
    /// Assigned role.
    pub role: String,
    /// Creation timestamp.
    pub created_at: String,
}

impl From<&UserRecord> for UserResponse {
    fn from(user: &UserRecord) -> Self {
        Self {
            user_id: user.user_id.to_string(),
            email: user.email.clone(),
            role: match user.role {
                Role::Admin => "admin".into(),
                Role::Student => "student".into(),
            },
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Register the caller's user record.
///
/// The role is `Admin` iff the caller's id appears in the configured
/// bootstrap list; everyone else registers as a student.
pub async fn register_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    if body.email.trim().is_empty() {
        return Err(ApiError::BadRequest("email must not be empty".into()));
    }

    if state.store.get_user(&auth.user_id)?.is_some() {
        return Err(ApiError::AlreadyExists("user already registered".into()));
    }

    let role = if state.config.bootstrap_admins.contains(&auth.user_id) {
        Role::Admin
    } else {
        Role::Student
    };

    let user = UserRecord::new(auth.user_id, body.email, role, Utc::now());
    state.store.put_user(&user)?;

    tracing::info!(user_id = %user.user_id, role = ?user.role, "User registered");

    Ok(Json(UserResponse::from(&user)))
}
