//! Purchase transactions and their lifecycle.
//!
//! A transaction records one attempted course purchase paid by bank transfer.
//! It is born `Pending` and moves exactly once into one of the terminal
//! states `Confirmed`, `Rejected`, or `Expired`. Transactions are never
//! deleted; they form the audit trail of the platform.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TransitionError;
use crate::ids::{CourseId, TransactionId, UserId};

/// Rejection reason used when the admin does not supply one.
pub const DEFAULT_REJECTION_REASON: &str = "Payment could not be verified";

/// Number of days a pending transaction may wait before the sweeper expires it.
pub const PENDING_EXPIRY_DAYS: i64 = 30;

/// Lifecycle state of a purchase transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Awaiting manual payment verification.
    Pending,
    /// Payment verified; course access was granted.
    Confirmed,
    /// Payment rejected by an admin.
    Rejected,
    /// Left pending past the expiry cutoff and reclaimed by the sweeper.
    Expired,
}

impl TransactionStatus {
    /// Whether this state still permits a transition.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Stable lowercase name, matching the serialized form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
        }
    }
}

/// A record of a user's attempted course purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction id (ULID, time-ordered).
    pub id: TransactionId,

    /// The purchasing user.
    pub user_id: UserId,

    /// The course being purchased.
    pub course_id: CourseId,

    /// Purchase price in cents.
    pub amount_cents: i64,

    /// Current lifecycle state.
    pub status: TransactionStatus,

    /// When the purchase was initiated.
    pub created_at: DateTime<Utc>,

    /// When the transaction was confirmed, if it was.
    pub confirmed_at: Option<DateTime<Utc>>,

    /// When the transaction was rejected, if it was.
    pub rejected_at: Option<DateTime<Utc>>,

    /// When the sweeper expired the transaction, if it did.
    pub expired_at: Option<DateTime<Utc>>,

    /// Admin who confirmed the payment.
    pub confirmed_by: Option<UserId>,

    /// Admin who rejected the payment.
    pub rejected_by: Option<UserId>,

    /// Why the payment was rejected.
    pub rejection_reason: Option<String>,

    /// Bank payment reference the user was instructed to use.
    pub payment_ref: Option<String>,

    /// URL of the generated pro-forma invoice, if any.
    pub invoice_url: Option<String>,
}

impl Transaction {
    /// Create a new pending transaction.
    #[must_use]
    pub fn new(user_id: UserId, course_id: CourseId, amount_cents: i64, now: DateTime<Utc>) -> Self {
        Self {
            id: TransactionId::generate(),
            user_id,
            course_id,
            amount_cents,
            status: TransactionStatus::Pending,
            created_at: now,
            confirmed_at: None,
            rejected_at: None,
            expired_at: None,
            confirmed_by: None,
            rejected_by: None,
            rejection_reason: None,
            payment_ref: None,
            invoice_url: None,
        }
    }

    /// Transition to `Confirmed`.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] if the transaction is no longer pending.
    pub fn confirm(&mut self, actor: UserId, now: DateTime<Utc>) -> Result<(), TransitionError> {
        self.require_pending()?;
        self.status = TransactionStatus::Confirmed;
        self.confirmed_at = Some(now);
        self.confirmed_by = Some(actor);
        Ok(())
    }

    /// Transition to `Rejected`, recording who rejected it and why.
    ///
    /// A missing reason falls back to [`DEFAULT_REJECTION_REASON`].
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] if the transaction is no longer pending.
    pub fn reject(
        &mut self,
        actor: UserId,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        self.require_pending()?;
        self.status = TransactionStatus::Rejected;
        self.rejected_at = Some(now);
        self.rejected_by = Some(actor);
        self.rejection_reason =
            Some(reason.unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_string()));
        Ok(())
    }

    /// Transition to `Expired` (sweeper only).
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] if the transaction is no longer pending.
    pub fn expire(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        self.require_pending()?;
        self.status = TransactionStatus::Expired;
        self.expired_at = Some(now);
        Ok(())
    }

    /// Whether the sweeper should expire this transaction at `cutoff`.
    #[must_use]
    pub fn is_stale(&self, cutoff: DateTime<Utc>) -> bool {
        self.status.is_pending() && self.created_at < cutoff
    }

    fn require_pending(&self) -> Result<(), TransitionError> {
        if self.status.is_pending() {
            Ok(())
        } else {
            Err(TransitionError {
                status: self.status,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn pending() -> Transaction {
        Transaction::new(UserId::generate(), CourseId::generate(), 4500, Utc::now())
    }

    #[test]
    fn new_transaction_is_pending() {
        let tx = pending();
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert!(tx.confirmed_at.is_none());
        assert!(tx.rejection_reason.is_none());
    }

    #[test]
    fn confirm_records_actor_and_time() {
        let mut tx = pending();
        let admin = UserId::generate();
        let now = Utc::now();

        tx.confirm(admin, now).unwrap();

        assert_eq!(tx.status, TransactionStatus::Confirmed);
        assert_eq!(tx.confirmed_by, Some(admin));
        assert_eq!(tx.confirmed_at, Some(now));
    }

    #[test]
    fn confirm_twice_fails() {
        let mut tx = pending();
        let admin = UserId::generate();
        tx.confirm(admin, Utc::now()).unwrap();

        let err = tx.confirm(admin, Utc::now()).unwrap_err();
        assert_eq!(err.status, TransactionStatus::Confirmed);
    }

    #[test]
    fn reject_after_confirm_fails() {
        let mut tx = pending();
        let admin = UserId::generate();
        tx.confirm(admin, Utc::now()).unwrap();

        assert!(tx.reject(admin, None, Utc::now()).is_err());
        assert_eq!(tx.status, TransactionStatus::Confirmed);
    }

    #[test]
    fn reject_defaults_reason() {
        let mut tx = pending();
        tx.reject(UserId::generate(), None, Utc::now()).unwrap();
        assert_eq!(tx.rejection_reason.as_deref(), Some(DEFAULT_REJECTION_REASON));
    }

    #[test]
    fn reject_keeps_supplied_reason() {
        let mut tx = pending();
        tx.reject(UserId::generate(), Some("wrong amount".into()), Utc::now())
            .unwrap();
        assert_eq!(tx.rejection_reason.as_deref(), Some("wrong amount"));
    }

    #[test]
    fn expire_only_from_pending() {
        let mut tx = pending();
        tx.expire(Utc::now()).unwrap();
        assert_eq!(tx.status, TransactionStatus::Expired);
        assert!(tx.expire(Utc::now()).is_err());
    }

    #[test]
    fn staleness_respects_status_and_age() {
        let now = Utc::now();
        let cutoff = now - Duration::days(PENDING_EXPIRY_DAYS);

        let mut old = pending();
        old.created_at = now - Duration::days(31);
        assert!(old.is_stale(cutoff));

        let mut fresh = pending();
        fresh.created_at = now - Duration::days(5);
        assert!(!fresh.is_stale(cutoff));

        let mut confirmed = pending();
        confirmed.created_at = now - Duration::days(40);
        confirmed.confirm(UserId::generate(), now).unwrap();
        assert!(!confirmed.is_stale(cutoff));
    }
}
