//! Integration tests for purchase initiation, rate limiting, and access.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::TestHarness;
use kurspay_core::CourseId;
use kurspay_store::Store;

#[tokio::test]
async fn purchase_creates_pending_transaction() {
    let harness = TestHarness::new();
    let course_id = CourseId::generate();

    let response = harness
        .server
        .post("/v1/purchases")
        .add_header("authorization", harness.student_auth())
        .json(&json!({
            "course_id": course_id.to_string(),
            "amount_cents": 4500,
        }))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "pending");
    assert!(body["payment_ref"].as_str().unwrap().starts_with("KP-"));
    assert!(body.get("enrollment_id").is_none());

    let pending = harness.store.list_pending_transactions(10).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].user_id, harness.student_id);
    assert_eq!(pending[0].course_id, course_id);
}

#[tokio::test]
async fn live_class_purchase_creates_enrollment() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/purchases")
        .add_header("authorization", harness.student_auth())
        .json(&json!({
            "course_id": CourseId::generate().to_string(),
            "amount_cents": 9900,
            "live_class": true,
        }))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    let tx_id: kurspay_core::TransactionId =
        body["transaction_id"].as_str().unwrap().parse().unwrap();
    assert!(body["enrollment_id"].is_string());

    let enrollment = harness
        .store
        .find_enrollment_by_transaction(&tx_id)
        .unwrap()
        .unwrap();
    assert_eq!(enrollment.user_id, harness.student_id);
}

#[tokio::test]
async fn purchase_requires_positive_amount() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/purchases")
        .add_header("authorization", harness.student_auth())
        .json(&json!({
            "course_id": CourseId::generate().to_string(),
            "amount_cents": 0,
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn owned_course_cannot_be_purchased_again() {
    let harness = TestHarness::new();
    let course_id = CourseId::generate();

    // Buy and confirm once.
    let tx = harness.seed_pending(harness.student_id, course_id, 4500);
    harness
        .server
        .post(&format!("/v1/payments/{}/confirm", tx.id))
        .add_header("authorization", harness.admin_auth())
        .json(&json!({
            "user_id": harness.student_id.to_string(),
            "course_id": course_id.to_string(),
        }))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .post("/v1/purchases")
        .add_header("authorization", harness.student_auth())
        .json(&json!({
            "course_id": course_id.to_string(),
            "amount_cents": 4500,
        }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let err: serde_json::Value = response.json();
    assert_eq!(err["error"]["code"], "already_exists");
}

#[tokio::test]
async fn purchases_are_rate_limited_per_user() {
    let harness = TestHarness::with_config(|config| {
        config.rate_limit_max_attempts = 2;
    });

    for _ in 0..2 {
        harness
            .server
            .post("/v1/purchases")
            .add_header("authorization", harness.student_auth())
            .json(&json!({
                "course_id": CourseId::generate().to_string(),
                "amount_cents": 4500,
            }))
            .await
            .assert_status_ok();
    }

    let limited = harness
        .server
        .post("/v1/purchases")
        .add_header("authorization", harness.student_auth())
        .json(&json!({
            "course_id": CourseId::generate().to_string(),
            "amount_cents": 4500,
        }))
        .await;
    limited.assert_status(StatusCode::TOO_MANY_REQUESTS);
    let err: serde_json::Value = limited.json();
    assert_eq!(err["error"]["code"], "rate_limited");
    assert!(err["error"]["details"]["retry_after_seconds"].as_i64().unwrap() > 0);

    // Another user is unaffected.
    harness
        .server
        .post("/v1/purchases")
        .add_header("authorization", harness.admin_auth())
        .json(&json!({
            "course_id": CourseId::generate().to_string(),
            "amount_cents": 4500,
        }))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn admin_can_reset_a_rate_limit() {
    let harness = TestHarness::with_config(|config| {
        config.rate_limit_max_attempts = 1;
    });
    let purchase = json!({
        "course_id": CourseId::generate().to_string(),
        "amount_cents": 4500,
    });

    harness
        .server
        .post("/v1/purchases")
        .add_header("authorization", harness.student_auth())
        .json(&purchase)
        .await
        .assert_status_ok();

    harness
        .server
        .post("/v1/purchases")
        .add_header("authorization", harness.student_auth())
        .json(&purchase)
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);

    harness
        .server
        .post("/v1/maintenance/rate-limits/reset")
        .add_header("authorization", harness.admin_auth())
        .json(&json!({
            "actor": harness.student_id.to_string(),
            "action": "purchase",
        }))
        .await
        .assert_status_ok();

    harness
        .server
        .post("/v1/purchases")
        .add_header("authorization", harness.student_auth())
        .json(&json!({
            "course_id": CourseId::generate().to_string(),
            "amount_cents": 4500,
        }))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn access_record_is_empty_for_new_users() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get("/v1/access/me")
        .add_header("authorization", harness.student_auth())
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["user_id"], harness.student_id.to_string());
    assert!(body["courses"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn health_is_public() {
    let harness = TestHarness::new();
    let response = harness.server.get("/health").await;
    response.assert_status_ok();
}
