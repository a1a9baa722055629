//! Payment review handlers: confirm, reject, and lookup.
//!
//! Confirm and reject are the admin half of the manual bank-transfer flow.
//! The store performs the guarded state transition atomically; everything
//! after the commit (enrollment sync, notification email) is best-effort and
//! only logged on failure.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use kurspay_core::{CourseId, Transaction, TransactionId, UserId};
use kurspay_store::Store;

use crate::auth::AdminActor;
use crate::error::ApiError;
use crate::state::AppState;

/// Default page size for pending listings.
const DEFAULT_PENDING_LIMIT: usize = 50;

/// Transaction representation returned to admins.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    /// Transaction ID.
    pub transaction_id: String,
    /// Purchasing user.
    pub user_id: String,
    /// Purchased course.
    pub course_id: String,
    /// Amount in cents.
    pub amount_cents: i64,
    /// Lifecycle state.
    pub status: String,
    /// Creation timestamp.
    pub created_at: String,
    /// Bank payment reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_ref: Option<String>,
    /// Rejection reason, if rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

impl From<&Transaction> for TransactionResponse {
    fn from(tx: &Transaction) -> Self {
        Self {
            transaction_id: tx.id.to_string(),
            user_id: tx.user_id.to_string(),
            course_id: tx.course_id.to_string(),
            amount_cents: tx.amount_cents,
            status: tx.status.as_str().to_string(),
            created_at: tx.created_at.to_rfc3339(),
            payment_ref: tx.payment_ref.clone(),
            rejection_reason: tx.rejection_reason.clone(),
        }
    }
}

/// Confirm request body.
#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    /// The user the admin believes made the payment.
    pub user_id: UserId,
    /// The course the payment was for.
    pub course_id: CourseId,
}

/// Reject request body.
#[derive(Debug, Deserialize, Default)]
pub struct RejectRequest {
    /// Why the payment was rejected. A generic reason is used when omitted.
    pub reason: Option<String>,
}

/// Decision response for confirm/reject.
#[derive(Debug, Serialize)]
pub struct DecisionResponse {
    /// Whether the decision was applied.
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
    /// The decided transaction.
    pub transaction_id: String,
}

/// Query parameters for the pending listing.
#[derive(Debug, Deserialize)]
pub struct PendingQuery {
    /// Maximum number of transactions to return.
    pub limit: Option<usize>,
}

/// Confirm a pending payment and grant course access.
pub async fn confirm_payment(
    State(state): State<Arc<AppState>>,
    admin: AdminActor,
    Path(transaction_id): Path<TransactionId>,
    Json(body): Json<ConfirmRequest>,
) -> Result<Json<DecisionResponse>, ApiError> {
    let now = Utc::now();

    let transaction = state.store.confirm_purchase(
        &transaction_id,
        &body.user_id,
        &body.course_id,
        admin.user_id,
        now,
    )?;

    tracing::info!(
        transaction_id = %transaction.id,
        user_id = %transaction.user_id,
        course_id = %transaction.course_id,
        admin = %admin.user_id,
        "Payment confirmed"
    );

    // Post-commit side effects. Each is isolated; a failure here must not
    // undo or report failure for the committed decision.
    sync_enrollment_confirmed(&state, &transaction);
    notify_decision(&state, &transaction, Notification::Confirmed).await;

    Ok(Json(DecisionResponse {
        success: true,
        message: "Payment confirmed and course access granted".into(),
        transaction_id: transaction.id.to_string(),
    }))
}

/// Reject a pending payment.
pub async fn reject_payment(
    State(state): State<Arc<AppState>>,
    admin: AdminActor,
    Path(transaction_id): Path<TransactionId>,
    body: Option<Json<RejectRequest>>,
) -> Result<Json<DecisionResponse>, ApiError> {
    let now = Utc::now();
    let reason = body.and_then(|Json(b)| b.reason);

    let transaction = state
        .store
        .reject_purchase(&transaction_id, reason, admin.user_id, now)?;

    tracing::info!(
        transaction_id = %transaction.id,
        user_id = %transaction.user_id,
        admin = %admin.user_id,
        reason = ?transaction.rejection_reason,
        "Payment rejected"
    );

    sync_enrollment_rejected(&state, &transaction);
    notify_decision(&state, &transaction, Notification::Rejected).await;

    Ok(Json(DecisionResponse {
        success: true,
        message: "Payment rejected".into(),
        transaction_id: transaction.id.to_string(),
    }))
}

/// Fetch one transaction for review.
pub async fn get_payment(
    State(state): State<Arc<AppState>>,
    _admin: AdminActor,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Json<TransactionResponse>, ApiError> {
    let transaction = state
        .store
        .get_transaction(&transaction_id)?
        .ok_or_else(|| ApiError::NotFound(format!("transaction not found: {transaction_id}")))?;

    Ok(Json(TransactionResponse::from(&transaction)))
}

/// List pending transactions, oldest first.
pub async fn list_pending(
    State(state): State<Arc<AppState>>,
    _admin: AdminActor,
    Query(query): Query<PendingQuery>,
) -> Result<Json<Vec<TransactionResponse>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_PENDING_LIMIT);
    let pending = state.store.list_pending_transactions(limit)?;

    Ok(Json(pending.iter().map(TransactionResponse::from).collect()))
}

enum Notification {
    Confirmed,
    Rejected,
}

/// Mark a linked live-class enrollment confirmed, if one exists.
fn sync_enrollment_confirmed(state: &AppState, transaction: &Transaction) {
    match state
        .store
        .confirm_linked_enrollment(&transaction.id, Utc::now())
    {
        Ok(Some(enrollment)) => {
            tracing::info!(
                transaction_id = %transaction.id,
                enrollment_id = %enrollment.id,
                "Linked enrollment confirmed"
            );
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(
                transaction_id = %transaction.id,
                error = %e,
                "Failed to sync linked enrollment - continuing"
            );
        }
    }
}

/// Mark a linked live-class enrollment rejected with the same reason.
fn sync_enrollment_rejected(state: &AppState, transaction: &Transaction) {
    match state.store.reject_linked_enrollment(
        &transaction.id,
        transaction.rejection_reason.clone(),
        Utc::now(),
    ) {
        Ok(Some(enrollment)) => {
            tracing::info!(
                transaction_id = %transaction.id,
                enrollment_id = %enrollment.id,
                "Linked enrollment rejected"
            );
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(
                transaction_id = %transaction.id,
                error = %e,
                "Failed to sync linked enrollment - continuing"
            );
        }
    }
}

/// Send the decision email, if the mailer is configured and the user is known.
async fn notify_decision(state: &AppState, transaction: &Transaction, kind: Notification) {
    let Some(mailer) = &state.mailer else {
        return;
    };

    let email = match state.store.get_user(&transaction.user_id) {
        Ok(Some(user)) => user.email,
        Ok(None) => {
            tracing::warn!(
                user_id = %transaction.user_id,
                "No user record for notification - skipping email"
            );
            return;
        }
        Err(e) => {
            tracing::warn!(user_id = %transaction.user_id, error = %e, "User lookup failed - skipping email");
            return;
        }
    };

    let result = match kind {
        Notification::Confirmed => mailer.send_payment_confirmed(&email, transaction).await,
        Notification::Rejected => {
            let reason = transaction
                .rejection_reason
                .as_deref()
                .unwrap_or(kurspay_core::DEFAULT_REJECTION_REASON);
            mailer
                .send_payment_rejected(&email, transaction, reason)
                .await
        }
    };

    if let Err(e) = result {
        tracing::warn!(
            transaction_id = %transaction.id,
            error = %e,
            "Failed to send notification email - continuing"
        );
    }
}
