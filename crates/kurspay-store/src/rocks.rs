//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.
//! Compound payment operations take an internal write lock around their
//! read-check-write so that two racing decisions on the same transaction
//! cannot both pass the pending guard; the winner's writes land in one
//! `WriteBatch`.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options, WriteBatch,
};

use kurspay_core::{
    CourseAccess, CourseGrant, CourseId, Enrollment, RateLimitCounter, RateLimitDecision,
    Transaction, TransactionId, UserId, UserRecord,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::Store;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    /// Serialize the compound read-check-write sections.
    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Stage a transaction write, keeping the pending index in sync.
    fn stage_transaction(&self, batch: &mut WriteBatch, transaction: &Transaction) -> Result<()> {
        let cf_tx = self.cf(cf::TRANSACTIONS)?;
        let cf_pending = self.cf(cf::TRANSACTIONS_PENDING)?;
        let key = keys::transaction_key(&transaction.id);
        let value = Self::serialize(transaction)?;

        batch.put_cf(&cf_tx, &key, &value);
        if transaction.status.is_pending() {
            batch.put_cf(&cf_pending, &key, b"");
        } else {
            batch.delete_cf(&cf_pending, &key);
        }
        Ok(())
    }

    fn load_transaction(&self, transaction_id: &TransactionId) -> Result<Transaction> {
        self.get_transaction(transaction_id)?
            .ok_or_else(|| StoreError::NotFound {
                entity: "transaction",
                id: transaction_id.to_string(),
            })
    }

    fn put_access(&self, access: &CourseAccess) -> Result<()> {
        let cf = self.cf(cf::COURSE_ACCESS)?;
        let key = keys::access_key(&access.user_id);
        let value = Self::serialize(access)?;
        self.db
            .put_cf(&cf, key, value)
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    fn put_enrollment(&self, enrollment: &Enrollment) -> Result<()> {
        let cf = self.cf(cf::ENROLLMENTS)?;
        let key = keys::enrollment_key(&enrollment.id);
        let value = Self::serialize(enrollment)?;
        self.db
            .put_cf(&cf, key, value)
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Transaction Operations
    // =========================================================================

    fn put_transaction(&self, transaction: &Transaction) -> Result<()> {
        let mut batch = WriteBatch::default();
        self.stage_transaction(&mut batch, transaction)?;
        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn get_transaction(&self, transaction_id: &TransactionId) -> Result<Option<Transaction>> {
        let cf = self.cf(cf::TRANSACTIONS)?;
        let key = keys::transaction_key(transaction_id);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn list_pending_transactions(&self, limit: usize) -> Result<Vec<Transaction>> {
        let cf_pending = self.cf(cf::TRANSACTIONS_PENDING)?;

        // ULID keys iterate oldest-first.
        let mut transactions = Vec::new();
        for item in self.db.iterator_cf(&cf_pending, IteratorMode::Start) {
            if transactions.len() >= limit {
                break;
            }
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;

            let Some(tx_id) = keys::decode_transaction_key(&key) else {
                tracing::warn!("skipping malformed pending index key");
                continue;
            };
            if let Some(tx) = self.get_transaction(&tx_id)? {
                transactions.push(tx);
            }
        }

        Ok(transactions)
    }

    fn create_purchase(
        &self,
        transaction: &Transaction,
        enrollment: Option<&Enrollment>,
    ) -> Result<()> {
        let mut batch = WriteBatch::default();
        self.stage_transaction(&mut batch, transaction)?;

        if let Some(enrollment) = enrollment {
            let cf_enr = self.cf(cf::ENROLLMENTS)?;
            let cf_by_tx = self.cf(cf::ENROLLMENTS_BY_TX)?;
            batch.put_cf(
                &cf_enr,
                keys::enrollment_key(&enrollment.id),
                Self::serialize(enrollment)?,
            );
            batch.put_cf(
                &cf_by_tx,
                keys::transaction_key(&enrollment.transaction_id),
                keys::enrollment_key(&enrollment.id),
            );
        }

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    // =========================================================================
    // Access / Enrollment / User Operations
    // =========================================================================

    fn get_access(&self, user_id: &UserId) -> Result<Option<CourseAccess>> {
        let cf = self.cf(cf::COURSE_ACCESS)?;
        let key = keys::access_key(user_id);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn find_enrollment_by_transaction(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<Enrollment>> {
        let cf_by_tx = self.cf(cf::ENROLLMENTS_BY_TX)?;
        let cf_enr = self.cf(cf::ENROLLMENTS)?;

        let Some(index_value) = self
            .db
            .get_cf(&cf_by_tx, keys::transaction_key(transaction_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(None);
        };

        let Some(enrollment_id) = keys::decode_enrollment_id(&index_value) else {
            return Err(StoreError::Serialization(
                "malformed enrollment index value".into(),
            ));
        };

        self.db
            .get_cf(&cf_enr, keys::enrollment_key(&enrollment_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn put_user(&self, user: &UserRecord) -> Result<()> {
        let cf = self.cf(cf::USERS)?;
        let key = keys::user_key(&user.user_id);
        let value = Self::serialize(user)?;
        self.db
            .put_cf(&cf, key, value)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn get_user(&self, user_id: &UserId) -> Result<Option<UserRecord>> {
        let cf = self.cf(cf::USERS)?;
        let key = keys::user_key(user_id);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    // =========================================================================
    // Compound Payment Operations
    // =========================================================================

    fn confirm_purchase(
        &self,
        transaction_id: &TransactionId,
        user_id: &UserId,
        course_id: &CourseId,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> Result<Transaction> {
        let _guard = self.lock_writes();

        let mut transaction = self.load_transaction(transaction_id)?;

        // Guards, in order, before any write.
        if !transaction.status.is_pending() {
            return Err(StoreError::NotPending {
                status: transaction.status,
            });
        }
        if transaction.user_id != *user_id {
            return Err(StoreError::ParticipantMismatch { field: "user_id" });
        }
        if transaction.course_id != *course_id {
            return Err(StoreError::ParticipantMismatch { field: "course_id" });
        }

        let mut access = self
            .get_access(user_id)?
            .unwrap_or_else(|| CourseAccess::new(*user_id, now));
        if access.has_active_access(course_id) {
            return Err(StoreError::AccessExists {
                course_id: *course_id,
            });
        }

        transaction.confirm(actor, now)?;
        access.grant(*course_id, CourseGrant::new(transaction.id, now), now);

        // Terminal state and grant commit together.
        let mut batch = WriteBatch::default();
        self.stage_transaction(&mut batch, &transaction)?;
        let cf_access = self.cf(cf::COURSE_ACCESS)?;
        batch.put_cf(
            &cf_access,
            keys::access_key(user_id),
            Self::serialize(&access)?,
        );

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(transaction)
    }

    fn reject_purchase(
        &self,
        transaction_id: &TransactionId,
        reason: Option<String>,
        actor: UserId,
        now: DateTime<Utc>,
    ) -> Result<Transaction> {
        let _guard = self.lock_writes();

        let mut transaction = self.load_transaction(transaction_id)?;
        transaction.reject(actor, reason, now)?;

        let mut batch = WriteBatch::default();
        self.stage_transaction(&mut batch, &transaction)?;
        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(transaction)
    }

    fn confirm_linked_enrollment(
        &self,
        transaction_id: &TransactionId,
        now: DateTime<Utc>,
    ) -> Result<Option<Enrollment>> {
        let Some(mut enrollment) = self.find_enrollment_by_transaction(transaction_id)? else {
            return Ok(None);
        };
        enrollment.mark_confirmed(now);
        self.put_enrollment(&enrollment)?;
        Ok(Some(enrollment))
    }

    fn reject_linked_enrollment(
        &self,
        transaction_id: &TransactionId,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Option<Enrollment>> {
        let Some(mut enrollment) = self.find_enrollment_by_transaction(transaction_id)? else {
            return Ok(None);
        };
        enrollment.mark_rejected(reason, now);
        self.put_enrollment(&enrollment)?;
        Ok(Some(enrollment))
    }

    // =========================================================================
    // Expiry Sweep
    // =========================================================================

    fn expire_stale_transactions(&self, cutoff: DateTime<Utc>, now: DateTime<Utc>) -> Result<u64> {
        let _guard = self.lock_writes();

        let cf_pending = self.cf(cf::TRANSACTIONS_PENDING)?;

        let mut stale = Vec::new();
        for item in self.db.iterator_cf(&cf_pending, IteratorMode::Start) {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let Some(tx_id) = keys::decode_transaction_key(&key) else {
                tracing::warn!("skipping malformed pending index key");
                continue;
            };
            let Some(tx) = self.get_transaction(&tx_id)? else {
                tracing::warn!(transaction_id = %tx_id, "pending index entry without transaction");
                continue;
            };
            if tx.is_stale(cutoff) {
                stale.push(tx);
            }
        }

        if stale.is_empty() {
            return Ok(0);
        }

        let mut batch = WriteBatch::default();
        for transaction in &mut stale {
            transaction.expire(now)?;
            self.stage_transaction(&mut batch, transaction)?;
        }

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(stale.len() as u64)
    }

    // =========================================================================
    // Rate Limiting
    // =========================================================================

    fn check_rate_limit(
        &self,
        actor: &str,
        action: &str,
        max_attempts: u32,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<RateLimitDecision> {
        let _guard = self.lock_writes();

        let cf = self.cf(cf::RATE_LIMITS)?;
        let key = keys::rate_limit_key(actor, action);

        let existing = self
            .db
            .get_cf(&cf, &key)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let (counter, decision) = match existing {
            None => (
                RateLimitCounter::first_attempt(now),
                RateLimitDecision::Allowed {
                    remaining: max_attempts.saturating_sub(1),
                },
            ),
            Some(data) => {
                let mut counter: RateLimitCounter = Self::deserialize(&data)?;
                let decision = counter.register(max_attempts, window, now);
                (counter, decision)
            }
        };

        self.db
            .put_cf(&cf, key, Self::serialize(&counter)?)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(decision)
    }

    fn reset_rate_limit(&self, actor: &str, action: &str) -> Result<()> {
        let cf = self.cf(cf::RATE_LIMITS)?;
        self.db
            .delete_cf(&cf, keys::rate_limit_key(actor, action))
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}
