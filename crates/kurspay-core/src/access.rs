//! Course access records.
//!
//! One record per user maps each purchased course to the grant that created
//! it. A grant is only ever written by a successful payment confirmation, in
//! the same atomic batch as the transaction-state write.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CourseId, TransactionId, UserId};

/// A single course grant inside a user's access record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseGrant {
    /// When the purchase was confirmed.
    pub purchased_at: DateTime<Utc>,

    /// The transaction that paid for this grant.
    pub transaction_id: TransactionId,

    /// Whether the grant is currently usable.
    ///
    /// Legacy records were written without this flag; they deserialize as
    /// active, so plain key presence still grants access for old data.
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl CourseGrant {
    /// Create an active grant backed by the given transaction.
    #[must_use]
    pub fn new(transaction_id: TransactionId, purchased_at: DateTime<Utc>) -> Self {
        Self {
            purchased_at,
            transaction_id,
            active: true,
        }
    }
}

/// The full set of course grants held by one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseAccess {
    /// The owning user.
    pub user_id: UserId,

    /// Grants keyed by course.
    pub courses: BTreeMap<CourseId, CourseGrant>,

    /// When the record was last modified.
    pub updated_at: DateTime<Utc>,
}

impl CourseAccess {
    /// Create an empty access record for a user.
    #[must_use]
    pub fn new(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            courses: BTreeMap::new(),
            updated_at: now,
        }
    }

    /// Canonical access check: the grant must exist and be active.
    #[must_use]
    pub fn has_active_access(&self, course_id: &CourseId) -> bool {
        self.courses.get(course_id).is_some_and(|g| g.active)
    }

    /// Merge a new grant into the record.
    ///
    /// Callers must check [`Self::has_active_access`] first; merging over an
    /// active grant would overwrite the original purchase audit trail.
    pub fn grant(&mut self, course_id: CourseId, grant: CourseGrant, now: DateTime<Utc>) {
        self.courses.insert(course_id, grant);
        self.updated_at = now;
    }
}
