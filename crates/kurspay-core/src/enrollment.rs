//! Live-class enrollments.
//!
//! A purchase of a live (online) class carries an enrollment record linked to
//! its transaction. The enrollment follows the transaction's fate: it is
//! marked rejected when the payment is rejected, and confirmed when the
//! payment is confirmed. Both updates are best-effort side effects applied
//! after the transaction's own state write commits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CourseId, EnrollmentId, TransactionId, UserId};

/// Status of a live-class enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    /// Awaiting the payment decision.
    Pending,
    /// Payment confirmed; seat reserved.
    Confirmed,
    /// Payment rejected; seat released.
    Rejected,
}

/// An enrollment in a live class, tied to the transaction that pays for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    /// Enrollment id.
    pub id: EnrollmentId,

    /// The transaction paying for this enrollment. At most one enrollment
    /// references a given transaction.
    pub transaction_id: TransactionId,

    /// The enrolling user.
    pub user_id: UserId,

    /// The live class being enrolled in.
    pub course_id: CourseId,

    /// Current status.
    pub status: EnrollmentStatus,

    /// When the enrollment was created.
    pub created_at: DateTime<Utc>,

    /// When the status last changed.
    pub updated_at: DateTime<Utc>,

    /// Reason for rejection, mirrored from the transaction.
    pub reason: Option<String>,
}

impl Enrollment {
    /// Create a pending enrollment for a transaction.
    #[must_use]
    pub fn new(
        transaction_id: TransactionId,
        user_id: UserId,
        course_id: CourseId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EnrollmentId::generate(),
            transaction_id,
            user_id,
            course_id,
            status: EnrollmentStatus::Pending,
            created_at: now,
            updated_at: now,
            reason: None,
        }
    }

    /// Mark the enrollment confirmed.
    pub fn mark_confirmed(&mut self, now: DateTime<Utc>) {
        self.status = EnrollmentStatus::Confirmed;
        self.updated_at = now;
    }

    /// Mark the enrollment rejected, carrying the transaction's reason.
    pub fn mark_rejected(&mut self, reason: Option<String>, now: DateTime<Utc>) {
        self.status = EnrollmentStatus::Rejected;
        self.reason = reason;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_enrollment_is_pending() {
        let e = Enrollment::new(
            TransactionId::generate(),
            UserId::generate(),
            CourseId::generate(),
            Utc::now(),
        );
        assert_eq!(e.status, EnrollmentStatus::Pending);
        assert!(e.reason.is_none());
    }

    #[test]
    fn rejection_carries_reason() {
        let mut e = Enrollment::new(
            TransactionId::generate(),
            UserId::generate(),
            CourseId::generate(),
            Utc::now(),
        );
        e.mark_rejected(Some("payment bounced".into()), Utc::now());
        assert_eq!(e.status, EnrollmentStatus::Rejected);
        assert_eq!(e.reason.as_deref(), Some("payment bounced"));
    }
}
