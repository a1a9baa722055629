//! User records and roles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::UserId;

/// Role held by a registered user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular learner; may purchase courses.
    Student,
    /// May confirm and reject payments and run maintenance operations.
    Admin,
}

/// A registered platform user.
///
/// The admin capability check for confirm/reject is a role lookup on this
/// record, not a claim embedded in the token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// The user id (matches the JWT subject).
    pub user_id: UserId,

    /// Email address used for payment notifications.
    pub email: String,

    /// Assigned role.
    pub role: Role,

    /// When the user registered.
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    /// Create a user record.
    #[must_use]
    pub fn new(user_id: UserId, email: String, role: Role, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            email,
            role,
            created_at: now,
        }
    }

    /// Whether this user may perform admin operations.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_gates_admin_check() {
        let student = UserRecord::new(
            UserId::generate(),
            "ana@example.rs".into(),
            Role::Student,
            Utc::now(),
        );
        let admin = UserRecord::new(
            UserId::generate(),
            "uprava@example.rs".into(),
            Role::Admin,
            Utc::now(),
        );
        assert!(!student.is_admin());
        assert!(admin.is_admin());
    }
}
