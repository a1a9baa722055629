//! Key encoding utilities for `RocksDB`.

use kurspay_core::{EnrollmentId, TransactionId, UserId};

/// Create a transaction key from a transaction ID.
///
/// ULID bytes are time-ordered, so iterating this column family yields
/// transactions oldest-first.
#[must_use]
pub fn transaction_key(transaction_id: &TransactionId) -> Vec<u8> {
    transaction_id.to_bytes().to_vec()
}

/// Create a course-access key from a user ID.
#[must_use]
pub fn access_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Create an enrollment key from an enrollment ID.
#[must_use]
pub fn enrollment_key(enrollment_id: &EnrollmentId) -> Vec<u8> {
    enrollment_id.as_bytes().to_vec()
}

/// Create a user-record key from a user ID.
#[must_use]
pub fn user_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Create a rate-limit counter key from an actor and an action.
///
/// Format: `"{actor}_{action}"`, matching the legacy collection layout.
#[must_use]
pub fn rate_limit_key(actor: &str, action: &str) -> Vec<u8> {
    format!("{actor}_{action}").into_bytes()
}

/// Decode a transaction ID from a key in the transactions column family.
///
/// # Errors
///
/// Returns `None` if the key is not 16 bytes of valid ULID.
#[must_use]
pub fn decode_transaction_key(key: &[u8]) -> Option<TransactionId> {
    let bytes: [u8; 16] = key.try_into().ok()?;
    TransactionId::from_bytes(bytes).ok()
}

/// Decode an enrollment ID from an index value.
#[must_use]
pub fn decode_enrollment_id(value: &[u8]) -> Option<EnrollmentId> {
    let bytes: [u8; 16] = value.try_into().ok()?;
    Some(EnrollmentId::from_uuid(uuid::Uuid::from_bytes(bytes)))
}
