//! Error types for kurspay core.

use crate::transaction::TransactionStatus;

/// A transition was requested on a transaction that already left `Pending`.
///
/// Transactions move one-way into a terminal state; any second decision on
/// the same transaction surfaces as this error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("transaction is {}, expected pending", status.as_str())]
pub struct TransitionError {
    /// The status the transaction was actually in.
    pub status: TransactionStatus,
}
