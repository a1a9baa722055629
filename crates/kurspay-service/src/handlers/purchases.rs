//! Purchase initiation handler.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use kurspay_core::{CourseId, Enrollment, Transaction};
use kurspay_store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::rate_limit::{self, ACTION_PURCHASE};
use crate::state::AppState;

/// Purchase request body.
#[derive(Debug, Deserialize)]
pub struct CreatePurchaseRequest {
    /// The course to purchase.
    pub course_id: CourseId,
    /// Purchase price in cents.
    pub amount_cents: i64,
    /// Whether the course is a live class requiring an enrollment.
    #[serde(default)]
    pub live_class: bool,
}

/// Purchase response.
#[derive(Debug, Serialize)]
pub struct CreatePurchaseResponse {
    /// The new pending transaction.
    pub transaction_id: String,
    /// Lifecycle state (always "pending" on creation).
    pub status: String,
    /// Bank reference to cite on the transfer.
    pub payment_ref: String,
    /// Linked enrollment id for live classes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrollment_id: Option<String>,
}

/// Create a pending purchase transaction for the caller.
///
/// The transaction waits for an admin to verify the bank transfer. Live-class
/// purchases also create a pending enrollment in the same batch.
pub async fn create_purchase(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<CreatePurchaseRequest>,
) -> Result<Json<CreatePurchaseResponse>, ApiError> {
    rate_limit::enforce(&state, &auth.user_id, ACTION_PURCHASE)?;

    if body.amount_cents <= 0 {
        return Err(ApiError::BadRequest("amount_cents must be positive".into()));
    }

    // A user who already owns the course cannot buy it again.
    if let Some(access) = state.store.get_access(&auth.user_id)? {
        if access.has_active_access(&body.course_id) {
            return Err(ApiError::AlreadyExists(format!(
                "user already has access to course {}",
                body.course_id
            )));
        }
    }

    let now = Utc::now();
    let mut transaction = Transaction::new(auth.user_id, body.course_id, body.amount_cents, now);
    transaction.payment_ref = Some(payment_ref(&transaction));

    let enrollment = body
        .live_class
        .then(|| Enrollment::new(transaction.id, auth.user_id, body.course_id, now));

    state.store.create_purchase(&transaction, enrollment.as_ref())?;

    tracing::info!(
        transaction_id = %transaction.id,
        user_id = %auth.user_id,
        course_id = %body.course_id,
        amount_cents = body.amount_cents,
        live_class = body.live_class,
        "Purchase created"
    );

    Ok(Json(CreatePurchaseResponse {
        transaction_id: transaction.id.to_string(),
        status: transaction.status.as_str().to_string(),
        payment_ref: transaction.payment_ref.clone().unwrap_or_default(),
        enrollment_id: enrollment.map(|e| e.id.to_string()),
    }))
}

/// Short bank-transfer reference derived from the transaction id.
fn payment_ref(transaction: &Transaction) -> String {
    let id = transaction.id.to_string();
    // Last 8 ULID characters carry the randomness; the prefix is the
    // timestamp and would repeat across same-day purchases.
    format!("KP-{}", &id[id.len() - 8..])
}
