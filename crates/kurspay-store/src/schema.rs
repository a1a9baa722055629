//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Purchase transactions, keyed by `transaction_id` (ULID).
    pub const TRANSACTIONS: &str = "transactions";

    /// Index: pending transactions, keyed by `transaction_id`.
    /// Value is empty (index only); an entry is removed in the same batch as
    /// the terminal state write, so the index never lists a decided
    /// transaction.
    pub const TRANSACTIONS_PENDING: &str = "transactions_pending";

    /// Course access records, keyed by `user_id`.
    pub const COURSE_ACCESS: &str = "course_access";

    /// Live-class enrollments, keyed by `enrollment_id`.
    pub const ENROLLMENTS: &str = "enrollments";

    /// Index: enrollment by transaction, keyed by `transaction_id`.
    /// Value is the `enrollment_id` bytes (at most one per transaction).
    pub const ENROLLMENTS_BY_TX: &str = "enrollments_by_tx";

    /// Registered users, keyed by `user_id`.
    pub const USERS: &str = "users";

    /// Rate limit counters, keyed by `"{actor}_{action}"`.
    pub const RATE_LIMITS: &str = "rate_limits";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::TRANSACTIONS,
        cf::TRANSACTIONS_PENDING,
        cf::COURSE_ACCESS,
        cf::ENROLLMENTS,
        cf::ENROLLMENTS_BY_TX,
        cf::USERS,
        cf::RATE_LIMITS,
    ]
}
