//! Error types for kurspay storage.

use kurspay_core::{CourseId, TransactionStatus};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
///
/// The guard variants (`NotPending`, `ParticipantMismatch`, `AccessExists`)
/// are raised by the compound payment operations before any write, so a
/// failed guard leaves the database untouched.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of record that was missing.
        entity: &'static str,
        /// The id that was looked up.
        id: String,
    },

    /// A confirm/reject was attempted on a transaction that already left
    /// `Pending`.
    #[error("transaction is {}, expected pending", status.as_str())]
    NotPending {
        /// The status the transaction was actually in.
        status: TransactionStatus,
    },

    /// The caller-supplied user or course does not match the transaction.
    #[error("supplied {field} does not match the transaction")]
    ParticipantMismatch {
        /// Which field mismatched (`"user_id"` or `"course_id"`).
        field: &'static str,
    },

    /// The user already holds an active grant for the course.
    #[error("user already has active access to course {course_id}")]
    AccessExists {
        /// The course with an existing grant.
        course_id: CourseId,
    },
}

impl From<kurspay_core::TransitionError> for StoreError {
    fn from(err: kurspay_core::TransitionError) -> Self {
        Self::NotPending { status: err.status }
    }
}
