//! Core types for the kurspay course-payment platform.
//!
//! This crate provides the domain model shared by the store and the HTTP
//! service:
//!
//! - **Identifiers**: `UserId`, `CourseId`, `TransactionId`, `EnrollmentId`
//! - **Transactions**: `Transaction` and its one-way status machine
//! - **Access**: `CourseAccess`, the per-user map of course grants
//! - **Enrollments**: `Enrollment` for live classes, linked by transaction
//! - **Users**: `UserRecord` with the `Admin`/`Student` role
//! - **Rate limiting**: `RateLimitCounter` fixed-window arithmetic
//!
//! Amounts are stored as `i64` integer cents to avoid floating point issues.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod access;
pub mod enrollment;
pub mod error;
pub mod ids;
pub mod rate_limit;
pub mod transaction;
pub mod user;

pub use access::{CourseAccess, CourseGrant};
pub use enrollment::{Enrollment, EnrollmentStatus};
pub use error::TransitionError;
pub use ids::{CourseId, EnrollmentId, IdError, TransactionId, UserId};
pub use rate_limit::{
    RateLimitCounter, RateLimitDecision, DEFAULT_MAX_ATTEMPTS, DEFAULT_WINDOW_MINUTES,
};
pub use transaction::{
    Transaction, TransactionStatus, DEFAULT_REJECTION_REASON, PENDING_EXPIRY_DAYS,
};
pub use user::{Role, UserRecord};
