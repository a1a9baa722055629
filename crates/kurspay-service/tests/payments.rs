//! Integration tests for the payment review endpoints.

mod common;

use axum::http::StatusCode;
use chrono::Utc;
use serde_json::json;

use common::TestHarness;
use kurspay_core::{CourseId, Enrollment, EnrollmentStatus, TransactionStatus, UserId};
use kurspay_store::Store;

#[tokio::test]
async fn confirm_grants_access_end_to_end() {
    let harness = TestHarness::new();
    let course_id = CourseId::generate();
    let tx = harness.seed_pending(harness.student_id, course_id, 4500);

    let response = harness
        .server
        .post(&format!("/v1/payments/{}/confirm", tx.id))
        .add_header("authorization", harness.admin_auth())
        .json(&json!({
            "user_id": harness.student_id.to_string(),
            "course_id": course_id.to_string(),
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["transaction_id"], tx.id.to_string());

    // The student now sees the course in their access record.
    let access = harness
        .server
        .get("/v1/access/me")
        .add_header("authorization", harness.student_auth())
        .await;
    access.assert_status_ok();
    let access_body: serde_json::Value = access.json();
    assert_eq!(access_body["courses"][0]["course_id"], course_id.to_string());
    assert_eq!(access_body["courses"][0]["active"], true);
    assert_eq!(
        access_body["courses"][0]["transaction_id"],
        tx.id.to_string()
    );
}

#[tokio::test]
async fn confirm_requires_authentication() {
    let harness = TestHarness::new();
    let tx = harness.seed_pending(harness.student_id, CourseId::generate(), 4500);

    let response = harness
        .server
        .post(&format!("/v1/payments/{}/confirm", tx.id))
        .json(&json!({
            "user_id": harness.student_id.to_string(),
            "course_id": tx.course_id.to_string(),
        }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn confirm_requires_admin_role() {
    let harness = TestHarness::new();
    let tx = harness.seed_pending(harness.student_id, CourseId::generate(), 4500);

    let response = harness
        .server
        .post(&format!("/v1/payments/{}/confirm", tx.id))
        .add_header("authorization", harness.student_auth())
        .json(&json!({
            "user_id": harness.student_id.to_string(),
            "course_id": tx.course_id.to_string(),
        }))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);

    // The guard fired before any mutation.
    let stored = harness.store.get_transaction(&tx.id).unwrap().unwrap();
    assert_eq!(stored.status, TransactionStatus::Pending);
}

#[tokio::test]
async fn second_confirm_is_a_conflict() {
    let harness = TestHarness::new();
    let course_id = CourseId::generate();
    let tx = harness.seed_pending(harness.student_id, course_id, 4500);
    let body = json!({
        "user_id": harness.student_id.to_string(),
        "course_id": course_id.to_string(),
    });

    let first = harness
        .server
        .post(&format!("/v1/payments/{}/confirm", tx.id))
        .add_header("authorization", harness.admin_auth())
        .json(&body)
        .await;
    first.assert_status_ok();

    let second = harness
        .server
        .post(&format!("/v1/payments/{}/confirm", tx.id))
        .add_header("authorization", harness.admin_auth())
        .json(&body)
        .await;
    second.assert_status(StatusCode::CONFLICT);
    let err: serde_json::Value = second.json();
    assert_eq!(err["error"]["code"], "failed_precondition");
}

#[tokio::test]
async fn reject_then_confirm_is_a_conflict() {
    let harness = TestHarness::new();
    let tx = harness.seed_pending(harness.student_id, CourseId::generate(), 4500);

    let reject = harness
        .server
        .post(&format!("/v1/payments/{}/reject", tx.id))
        .add_header("authorization", harness.admin_auth())
        .json(&json!({ "reason": "no transfer received" }))
        .await;
    reject.assert_status_ok();

    let confirm = harness
        .server
        .post(&format!("/v1/payments/{}/confirm", tx.id))
        .add_header("authorization", harness.admin_auth())
        .json(&json!({
            "user_id": harness.student_id.to_string(),
            "course_id": tx.course_id.to_string(),
        }))
        .await;
    confirm.assert_status(StatusCode::CONFLICT);

    // Rejection stands, no access was granted.
    let stored = harness.store.get_transaction(&tx.id).unwrap().unwrap();
    assert_eq!(stored.status, TransactionStatus::Rejected);
    assert!(harness.store.get_access(&harness.student_id).unwrap().is_none());
}

#[tokio::test]
async fn mismatched_participants_are_bad_requests() {
    let harness = TestHarness::new();
    let course_id = CourseId::generate();
    let tx = harness.seed_pending(harness.student_id, course_id, 4500);

    let wrong_user = harness
        .server
        .post(&format!("/v1/payments/{}/confirm", tx.id))
        .add_header("authorization", harness.admin_auth())
        .json(&json!({
            "user_id": UserId::generate().to_string(),
            "course_id": course_id.to_string(),
        }))
        .await;
    wrong_user.assert_status(StatusCode::BAD_REQUEST);

    let wrong_course = harness
        .server
        .post(&format!("/v1/payments/{}/confirm", tx.id))
        .add_header("authorization", harness.admin_auth())
        .json(&json!({
            "user_id": harness.student_id.to_string(),
            "course_id": CourseId::generate().to_string(),
        }))
        .await;
    wrong_course.assert_status(StatusCode::BAD_REQUEST);

    // Still pending and still no access.
    let stored = harness.store.get_transaction(&tx.id).unwrap().unwrap();
    assert_eq!(stored.status, TransactionStatus::Pending);
    assert!(harness.store.get_access(&harness.student_id).unwrap().is_none());
}

#[tokio::test]
async fn confirm_unknown_transaction_is_not_found() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post(&format!(
            "/v1/payments/{}/confirm",
            kurspay_core::TransactionId::generate()
        ))
        .add_header("authorization", harness.admin_auth())
        .json(&json!({
            "user_id": harness.student_id.to_string(),
            "course_id": CourseId::generate().to_string(),
        }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reject_without_body_uses_default_reason() {
    let harness = TestHarness::new();
    let tx = harness.seed_pending(harness.student_id, CourseId::generate(), 4500);

    let response = harness
        .server
        .post(&format!("/v1/payments/{}/reject", tx.id))
        .add_header("authorization", harness.admin_auth())
        .await;
    response.assert_status_ok();

    let stored = harness.store.get_transaction(&tx.id).unwrap().unwrap();
    assert_eq!(stored.status, TransactionStatus::Rejected);
    assert_eq!(
        stored.rejection_reason.as_deref(),
        Some(kurspay_core::DEFAULT_REJECTION_REASON)
    );
    assert_eq!(stored.rejected_by, Some(harness.admin_id));
}

#[tokio::test]
async fn reject_syncs_linked_enrollment() {
    let harness = TestHarness::new();
    let course_id = CourseId::generate();
    let now = Utc::now();

    let tx = kurspay_core::Transaction::new(harness.student_id, course_id, 9900, now);
    let enrollment = Enrollment::new(tx.id, harness.student_id, course_id, now);
    harness
        .store
        .create_purchase(&tx, Some(&enrollment))
        .unwrap();

    let response = harness
        .server
        .post(&format!("/v1/payments/{}/reject", tx.id))
        .add_header("authorization", harness.admin_auth())
        .json(&json!({ "reason": "wrong amount transferred" }))
        .await;
    response.assert_status_ok();

    let synced = harness
        .store
        .find_enrollment_by_transaction(&tx.id)
        .unwrap()
        .unwrap();
    assert_eq!(synced.status, EnrollmentStatus::Rejected);
    assert_eq!(synced.reason.as_deref(), Some("wrong amount transferred"));
}

#[tokio::test]
async fn concurrent_confirm_and_reject_have_one_winner() {
    let harness = TestHarness::new();
    let course_id = CourseId::generate();
    let tx = harness.seed_pending(harness.student_id, course_id, 4500);

    let confirm = harness
        .server
        .post(&format!("/v1/payments/{}/confirm", tx.id))
        .add_header("authorization", harness.admin_auth())
        .json(&json!({
            "user_id": harness.student_id.to_string(),
            "course_id": course_id.to_string(),
        }));
    let reject = harness
        .server
        .post(&format!("/v1/payments/{}/reject", tx.id))
        .add_header("authorization", harness.admin_auth())
        .json(&json!({ "reason": "duplicate" }));

    let (confirm_resp, reject_resp) =
        tokio::join!(async { confirm.await }, async { reject.await });

    let confirm_won = confirm_resp.status_code() == StatusCode::OK;
    let reject_won = reject_resp.status_code() == StatusCode::OK;
    assert_ne!(confirm_won, reject_won, "exactly one decision must win");
    assert!(
        confirm_resp.status_code() == StatusCode::CONFLICT
            || reject_resp.status_code() == StatusCode::CONFLICT
    );

    // Access exists iff the confirm won.
    let stored = harness.store.get_transaction(&tx.id).unwrap().unwrap();
    let has_access = harness
        .store
        .get_access(&harness.student_id)
        .unwrap()
        .is_some_and(|a| a.has_active_access(&course_id));
    assert_eq!(stored.status == TransactionStatus::Confirmed, confirm_won);
    assert_eq!(has_access, confirm_won);
}

#[tokio::test]
async fn pending_listing_is_oldest_first_and_admin_only() {
    let harness = TestHarness::new();
    let first = harness.seed_pending(harness.student_id, CourseId::generate(), 1000);
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    let second = harness.seed_pending(harness.student_id, CourseId::generate(), 2000);

    let forbidden = harness
        .server
        .get("/v1/payments/pending")
        .add_header("authorization", harness.student_auth())
        .await;
    forbidden.assert_status(StatusCode::FORBIDDEN);

    let response = harness
        .server
        .get("/v1/payments/pending")
        .add_header("authorization", harness.admin_auth())
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    let listed: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["transaction_id"].as_str().unwrap())
        .collect();
    assert_eq!(listed, vec![first.id.to_string(), second.id.to_string()]);
}

#[tokio::test]
async fn decided_transactions_leave_the_pending_listing() {
    let harness = TestHarness::new();
    let course_id = CourseId::generate();
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
        .get("/v1/payments/pending")
        .add_header("authorization", harness.admin_auth())
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn get_payment_returns_details() {
    let harness = TestHarness::new();
    let tx = harness.seed_pending(harness.student_id, CourseId::generate(), 4500);

    let response = harness
        .server
        .get(&format!("/v1/payments/{}", tx.id))
        .add_header("authorization", harness.admin_auth())
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["transaction_id"], tx.id.to_string());
    assert_eq!(body["status"], "pending");
    assert_eq!(body["amount_cents"], 4500);
}
