//! `RocksDB` storage layer for kurspay.
//!
//! This crate persists transactions, course access records, enrollments,
//! users, and rate-limit counters using `RocksDB` with column families.
//!
//! # Architecture
//!
//! - `transactions`: purchase transactions, keyed by ULID (time-ordered)
//! - `transactions_pending`: index of undecided transactions (empty values)
//! - `course_access`: per-user grant maps, keyed by `user_id`
//! - `enrollments` / `enrollments_by_tx`: live-class enrollments and their
//!   transaction index
//! - `users`: registered users with roles
//! - `rate_limits`: fixed-window counters keyed by `"{actor}_{action}"`
//!
//! The compound operations (`confirm_purchase`, `reject_purchase`,
//! `expire_stale_transactions`, `check_rate_limit`) serialize their
//! read-check-write through an internal lock and commit through a single
//! `WriteBatch`, so of two racing decisions on one transaction exactly one
//! wins and the loser observes a clean guard failure.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;

use chrono::{DateTime, Duration, Utc};
use kurspay_core::{
    CourseAccess, CourseId, Enrollment, RateLimitDecision, Transaction, TransactionId, UserId,
    UserRecord,
};

/// The storage trait defining all database operations.
///
/// Abstracting the storage layer keeps the HTTP handlers testable and leaves
/// room for alternative backends.
pub trait Store: Send + Sync {
    // =========================================================================
    // Transaction Operations
    // =========================================================================

    /// Insert or update a transaction, maintaining the pending index.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_transaction(&self, transaction: &Transaction) -> Result<()>;

    /// Get a transaction by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_transaction(&self, transaction_id: &TransactionId) -> Result<Option<Transaction>>;

    /// List pending transactions, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_pending_transactions(&self, limit: usize) -> Result<Vec<Transaction>>;

    /// Create a purchase: the pending transaction plus, for live classes, its
    /// enrollment, written in one atomic batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn create_purchase(
        &self,
        transaction: &Transaction,
        enrollment: Option<&Enrollment>,
    ) -> Result<()>;

    // =========================================================================
    // Access / Enrollment / User Operations
    // =========================================================================

    /// Get a user's course access record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_access(&self, user_id: &UserId) -> Result<Option<CourseAccess>>;

    /// Find the enrollment linked to a transaction, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn find_enrollment_by_transaction(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<Enrollment>>;

    /// Insert or update a user record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_user(&self, user: &UserRecord) -> Result<()>;

    /// Get a user record by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_user(&self, user_id: &UserId) -> Result<Option<UserRecord>>;

    // =========================================================================
    // Compound Payment Operations
    // =========================================================================

    /// Confirm a pending payment and grant course access atomically.
    ///
    /// Guards run in order before any write: transaction exists, is pending,
    /// matches the supplied participant ids, and the user holds no active
    /// grant for the course. On success the terminal transaction state and
    /// the merged grant commit in one batch.
    ///
    /// Returns the confirmed transaction.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if the transaction does not exist.
    /// - [`StoreError::NotPending`] if it already left `Pending`.
    /// - [`StoreError::ParticipantMismatch`] on a user/course mix-up.
    /// - [`StoreError::AccessExists`] on a duplicate active grant.
    fn confirm_purchase(
        &self,
        transaction_id: &TransactionId,
        user_id: &UserId,
        course_id: &CourseId,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> Result<Transaction>;

    /// Reject a pending payment.
    ///
    /// Same existence and pending guards as [`Store::confirm_purchase`]; no
    /// access record is touched.
    ///
    /// Returns the rejected transaction.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if the transaction does not exist.
    /// - [`StoreError::NotPending`] if it already left `Pending`.
    fn reject_purchase(
        &self,
        transaction_id: &TransactionId,
        reason: Option<String>,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> Result<Transaction>;

    /// Mark the enrollment linked to a transaction confirmed.
    ///
    /// Returns the updated enrollment, or `None` when the transaction has no
    /// linked enrollment (not an error: most purchases are self-paced).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn confirm_linked_enrollment(
        &self,
        transaction_id: &TransactionId,
        now: DateTime<Utc>,
    ) -> Result<Option<Enrollment>>;

    /// Mark the enrollment linked to a transaction rejected, carrying the
    /// rejection reason.
    ///
    /// Returns the updated enrollment, or `None` when there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn reject_linked_enrollment(
        &self,
        transaction_id: &TransactionId,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Option<Enrollment>>;

    // =========================================================================
    // Expiry Sweep
    // =========================================================================

    /// Expire every pending transaction created before `cutoff`.
    ///
    /// All matched transactions flip to `Expired` in a single atomic batch;
    /// an error aborts the whole sweep and the next run finds the same rows
    /// again. Returns the number of transactions expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn expire_stale_transactions(&self, cutoff: DateTime<Utc>, now: DateTime<Utc>) -> Result<u64>;

    // =========================================================================
    // Rate Limiting
    // =========================================================================

    /// Register an attempt for `(actor, action)` and decide whether to allow
    /// it. The read-modify-write is serialized, closing the lost-update race
    /// of naive counter implementations.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails. Callers treat store
    /// errors as fail-open.
    fn check_rate_limit(
        &self,
        actor: &str,
        action: &str,
        max_attempts: u32,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<RateLimitDecision>;

    /// Administrative reset of a rate-limit counter.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn reset_rate_limit(&self, actor: &str, action: &str) -> Result<()>;
}
