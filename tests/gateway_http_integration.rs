//! Integration tests for the billing HTTP endpoints.
//!
//! These tests drive the Axum router the way the gateway and the application
//! frontend do: form-encoded callback posts and JSON user requests, asserting
//! the status mapping the gateway's redelivery logic depends on and the DTO
//! shapes the frontend consumes.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tower::ServiceExt;

use postpay::adapters::http::{billing_router, BillingAppState};
use postpay::adapters::{InMemoryEventBus, MemoryBillingStore};
use postpay::domain::billing::{Money, Plan, PlanType, TransactionStatus};
use postpay::domain::foundation::{PlanId, Timestamp, UserId};
use postpay::ports::{BillingStore, Clock};

// =============================================================================
// Test Infrastructure
// =============================================================================

const TEST_SECRET: &str = "gw_test_secret_12345";

struct FixedClock {
    now: Timestamp,
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.now
    }
}

fn fixed_now() -> Timestamp {
    Timestamp::from_unix_secs(1705276800) // 2024-01-15T00:00:00Z
}

fn letters_plan() -> Plan {
    Plan::new(
        PlanId::new(),
        "Letters 1000",
        PlanType::Letters,
        1000,
        500,
        Money::parse("500.00", "RUB").unwrap(),
    )
    .unwrap()
}

async fn test_state() -> (BillingAppState, Arc<MemoryBillingStore>, Arc<InMemoryEventBus>) {
    let store = Arc::new(MemoryBillingStore::new());
    let events = Arc::new(InMemoryEventBus::new());
    let state = BillingAppState::new(
        store.clone(),
        Arc::new(FixedClock { now: fixed_now() }),
        events.clone(),
        TEST_SECRET,
        30,
    );
    (state, store, events)
}

fn gateway_code(secret: &str, fields: &HashMap<String, String>) -> String {
    let ordered: BTreeMap<&str, &str> = fields
        .iter()
        .filter(|(name, _)| name.as_str() != "signature")
        .map(|(name, value)| (name.as_str(), value.as_str()))
        .collect();

    let mut payload = String::new();
    for value in ordered.values() {
        payload.push_str(value);
        payload.push(';');
    }

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn notification_fields(payment_id: &str, status: &str, amount: &str) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    fields.insert("payment_id".to_string(), payment_id.to_string());
    fields.insert("status".to_string(), status.to_string());
    fields.insert("amount".to_string(), amount.to_string());
    fields.insert("currency".to_string(), "RUB".to_string());
    fields
}

fn signed(mut fields: HashMap<String, String>) -> HashMap<String, String> {
    let code = gateway_code(TEST_SECRET, &fields);
    fields.insert("signature".to_string(), code);
    fields
}

// Test field values never need percent escaping
fn form_encode(fields: &HashMap<String, String>) -> String {
    fields
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("&")
}

fn callback_request(fields: &HashMap<String, String>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/billing/gateway/callback")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(form_encode(fields)))
        .unwrap()
}

fn json_request(method: &str, uri: &str, user_id: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("X-User-Id", user_id)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Initiates a purchase over HTTP and returns the gateway payment reference.
async fn initiate_over_http(state: &BillingAppState, plan_id: &PlanId) -> String {
    let app = billing_router().with_state(state.clone());
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/billing/payments",
            "user-123",
            &format!(r#"{{"plan_id":"{}"}}"#, plan_id),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response_json(response).await;
    body["external_id"].as_str().unwrap().to_string()
}

async fn deliver_callback(
    state: &BillingAppState,
    fields: &HashMap<String, String>,
) -> axum::response::Response {
    let app = billing_router().with_state(state.clone());
    app.oneshot(callback_request(fields)).await.unwrap()
}

// =============================================================================
// Gateway Callback Tests
// =============================================================================

#[tokio::test]
async fn callback_completion_acknowledges_and_completes_transaction() {
    let (state, store, events) = test_state().await;
    let plan = letters_plan();
    store.insert_plan(plan.clone()).await;

    let payment_ref = initiate_over_http(&state, &plan.id).await;
    let response = deliver_callback(
        &state,
        &signed(notification_fields(&payment_ref, "completed", "500.00")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"OK", "gateway matches the acknowledgment body");

    let transaction = store.find_transaction(&payment_ref).await.unwrap().unwrap();
    assert_eq!(transaction.status, TransactionStatus::Completed);
    assert_eq!(store.grant_count().await, 1);
    assert!(events.has_event("billing.payment.completed.v1"));
    assert!(events.has_event("billing.grant.activated.v1"));
}

#[tokio::test]
async fn callback_redelivery_acknowledges_without_second_grant() {
    let (state, store, _events) = test_state().await;
    let plan = letters_plan();
    store.insert_plan(plan.clone()).await;

    let payment_ref = initiate_over_http(&state, &plan.id).await;
    let fields = signed(notification_fields(&payment_ref, "completed", "500.00"));

    let first = deliver_callback(&state, &fields).await;
    let second = deliver_callback(&state, &fields).await;

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::OK, "redelivery is acknowledged");
    assert_eq!(store.grant_count().await, 1);
}

#[tokio::test]
async fn callback_with_invalid_signature_is_unauthorized() {
    let (state, store, events) = test_state().await;
    let plan = letters_plan();
    store.insert_plan(plan.clone()).await;

    let payment_ref = initiate_over_http(&state, &plan.id).await;
    let mut fields = notification_fields(&payment_ref, "completed", "500.00");
    fields.insert("signature".to_string(), "deadbeef".repeat(8));

    let response = deliver_callback(&state, &fields).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = response_json(response).await;
    assert_eq!(body["error_code"], "UNAUTHORIZED");

    let transaction = store.find_transaction(&payment_ref).await.unwrap().unwrap();
    assert_eq!(
        transaction.status,
        TransactionStatus::Pending,
        "unverified payload must not touch state"
    );
    assert_eq!(events.event_count(), 0);
}

#[tokio::test]
async fn callback_for_unknown_payment_is_not_found() {
    let (state, _store, _events) = test_state().await;

    let response = deliver_callback(
        &state,
        &signed(notification_fields("pay_nonexistent", "completed", "500.00")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response_json(response).await;
    assert_eq!(body["error_code"], "UNKNOWN_TRANSACTION");
}

#[tokio::test]
async fn callback_with_wrong_amount_conflicts() {
    let (state, store, _events) = test_state().await;
    let plan = letters_plan();
    store.insert_plan(plan.clone()).await;

    let payment_ref = initiate_over_http(&state, &plan.id).await;
    let response = deliver_callback(
        &state,
        &signed(notification_fields(&payment_ref, "completed", "9500.00")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = response_json(response).await;
    assert_eq!(body["error_code"], "AMOUNT_MISMATCH");
}

#[tokio::test]
async fn callback_refund_revokes_grant() {
    let (state, store, _events) = test_state().await;
    let plan = letters_plan();
    store.insert_plan(plan.clone()).await;

    let payment_ref = initiate_over_http(&state, &plan.id).await;
    deliver_callback(
        &state,
        &signed(notification_fields(&payment_ref, "completed", "500.00")),
    )
    .await;
    let response = deliver_callback(
        &state,
        &signed(notification_fields(&payment_ref, "refunded", "500.00")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let user = UserId::new("user-123").unwrap();
    assert!(
        store.current_grant(&user).await.unwrap().is_none(),
        "refund should leave no active grant"
    );
}

#[tokio::test]
async fn callback_for_settled_transaction_with_new_status_conflicts() {
    let (state, store, _events) = test_state().await;
    let plan = letters_plan();
    store.insert_plan(plan.clone()).await;

    let payment_ref = initiate_over_http(&state, &plan.id).await;
    deliver_callback(
        &state,
        &signed(notification_fields(&payment_ref, "completed", "500.00")),
    )
    .await;

    // A failure report for an already-completed payment is not a replay
    // (different status), so it is a state machine violation
    let response = deliver_callback(
        &state,
        &signed(notification_fields(&payment_ref, "failed", "500.00")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = response_json(response).await;
    assert_eq!(body["error_code"], "INVALID_TRANSITION");
}

#[tokio::test]
async fn callback_signed_but_incomplete_payload_is_bad_request() {
    let (state, store, _events) = test_state().await;
    let plan = letters_plan();
    store.insert_plan(plan.clone()).await;

    let payment_ref = initiate_over_http(&state, &plan.id).await;
    let mut fields = notification_fields(&payment_ref, "completed", "500.00");
    fields.remove("amount");

    let response = deliver_callback(&state, &signed(fields)).await;

    assert_eq!(
        response.status(),
        StatusCode::BAD_REQUEST,
        "redelivering the same malformed bytes cannot succeed, so no 5xx"
    );
}

// =============================================================================
// Plan & Usage Endpoint Tests
// =============================================================================

#[tokio::test]
async fn payments_endpoint_returns_pending_transaction() {
    let (state, store, _events) = test_state().await;
    let plan = letters_plan();
    store.insert_plan(plan.clone()).await;

    let app = billing_router().with_state(state);
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/billing/payments",
            "user-123",
            &format!(r#"{{"plan_id":"{}"}}"#, plan.id),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert!(body["external_id"].as_str().unwrap().starts_with("pay_"));
    assert_eq!(body["amount"], "500.00");
    assert_eq!(body["currency"], "RUB");
    assert_eq!(body["status"], "pending");
}

#[tokio::test]
async fn payments_endpoint_with_malformed_plan_id_is_bad_request() {
    let (state, _store, _events) = test_state().await;

    let app = billing_router().with_state(state);
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/billing/payments",
            "user-123",
            r#"{"plan_id":"starter"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn payments_endpoint_with_unknown_plan_is_not_found() {
    let (state, _store, _events) = test_state().await;

    let app = billing_router().with_state(state);
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/billing/payments",
            "user-123",
            &format!(r#"{{"plan_id":"{}"}}"#, PlanId::new()),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn plan_endpoint_reports_active_standing() {
    let (state, store, _events) = test_state().await;
    let plan = letters_plan();
    store.insert_plan(plan.clone()).await;

    let payment_ref = initiate_over_http(&state, &plan.id).await;
    deliver_callback(
        &state,
        &signed(notification_fields(&payment_ref, "completed", "500.00")),
    )
    .await;

    let app = billing_router().with_state(state);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/billing/plan")
                .header("X-User-Id", "user-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["plan_name"], "Letters 1000");
    assert_eq!(body["plan_type"], "letters");
    assert_eq!(body["emails_remaining"], 1000);
    assert_eq!(body["subscriber_limit"], 500);
    assert_eq!(body["unmetered_sending"], false);
    assert_eq!(body["is_expired"], false);
}

#[tokio::test]
async fn plan_endpoint_without_user_header_is_unauthorized() {
    let (state, _store, _events) = test_state().await;

    let app = billing_router().with_state(state);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/billing/plan")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn usage_endpoint_accumulates_across_requests() {
    let (state, store, _events) = test_state().await;
    let plan = letters_plan();
    store.insert_plan(plan.clone()).await;

    let payment_ref = initiate_over_http(&state, &plan.id).await;
    deliver_callback(
        &state,
        &signed(notification_fields(&payment_ref, "completed", "500.00")),
    )
    .await;

    let app = billing_router().with_state(state.clone());
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/billing/usage",
            "user-123",
            r#"{"emails":25}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["emails_sent"], 25);

    let app = billing_router().with_state(state);
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/billing/usage",
            "user-123",
            r#"{"emails":15}"#,
        ))
        .await
        .unwrap();
    let body = response_json(response).await;
    assert_eq!(body["emails_sent"], 40);
}

#[tokio::test]
async fn usage_endpoint_without_grant_is_payment_required() {
    let (state, _store, _events) = test_state().await;

    let app = billing_router().with_state(state);
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/billing/usage",
            "user-123",
            r#"{"emails":10}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    let body = response_json(response).await;
    assert_eq!(body["error_code"], "NO_ACTIVE_PLAN");
}
