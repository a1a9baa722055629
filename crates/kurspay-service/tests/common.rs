//! Common test utilities for kurspay integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;
use chrono::Utc;
use tempfile::TempDir;

use kurspay_core::{CourseId, Role, Transaction, UserId, UserRecord};
use kurspay_service::{create_router, AppState, ServiceConfig};
use kurspay_store::{RocksStore, Store};

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Direct handle to the store, for seeding and verification.
    pub store: Arc<RocksStore>,
    /// Temporary directory for the database (kept alive for test duration).
    pub _temp_dir: TempDir,
    /// An admin user for payment-decision requests.
    pub admin_id: UserId,
    /// A regular student user.
    pub student_id: UserId,
}

impl TestHarness {
    /// Create a new test harness with a fresh database.
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Create a harness with config adjustments (rate limits, mailer, ...).
    pub fn with_config(adjust: impl FnOnce(&mut ServiceConfig)) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = Arc::new(RocksStore::open(temp_dir.path()).expect("Failed to open store"));

        let admin_id = UserId::generate();
        let student_id = UserId::generate();

        let mut config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            data_dir: temp_dir.path().to_string_lossy().to_string(),
            auth_base_url: "http://localhost".into(),
            bootstrap_admins: vec![admin_id],
            ..ServiceConfig::default()
        };
        adjust(&mut config);

        store
            .put_user(&UserRecord::new(
                admin_id,
                "admin@example.test".into(),
                Role::Admin,
                Utc::now(),
            ))
            .expect("Failed to seed admin");
        store
            .put_user(&UserRecord::new(
                student_id,
                "student@example.test".into(),
                Role::Student,
                Utc::now(),
            ))
            .expect("Failed to seed student");

        let state = AppState::new(Arc::clone(&store), config);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            store,
            _temp_dir: temp_dir,
            admin_id,
            student_id,
        }
    }

    /// Authorization header for an arbitrary user.
    pub fn auth_header(user_id: UserId) -> String {
        format!("Bearer test-token:{user_id}")
    }

    /// Authorization header for the seeded admin.
    pub fn admin_auth(&self) -> String {
        Self::auth_header(self.admin_id)
    }

    /// Authorization header for the seeded student.
    pub fn student_auth(&self) -> String {
        Self::auth_header(self.student_id)
    }

    /// Seed a pending transaction directly in the store.
    pub fn seed_pending(&self, user_id: UserId, course_id: CourseId, amount_cents: i64) -> Transaction {
        let tx = Transaction::new(user_id, course_id, amount_cents, Utc::now());
        self.store
            .put_transaction(&tx)
            .expect("Failed to seed transaction");
        tx
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
