//! Router-level tests driving the full HTTP stack against in-memory stores
//! and the stub payment gateway.

#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::Utc;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use eventhive_api::api;
use eventhive_api::api::auth::{HeaderIdentity, USER_ID_HEADER, USER_ROLE_HEADER};
use eventhive_api::app_state::AppState;
use eventhive_api::domain::signature::payment_signature;
use eventhive_api::gateway::{StubBehavior, StubGateway};
use eventhive_api::persistence::{MemoryBookingStore, MemoryEventStore};
use eventhive_api::service::PaymentSettings;

const GATEWAY_SECRET: &str = "it_gateway_secret";

#[derive(Clone, Copy)]
enum As {
    Anonymous,
    User(Uuid),
    Admin(Uuid),
}

fn state(behavior: StubBehavior, gateway_timeout: Duration) -> AppState {
    let settings = PaymentSettings {
        gateway_secret: GATEWAY_SECRET.to_string(),
        ticket_secret: "it_ticket_secret".to_string(),
        currency: "INR".to_string(),
        gateway_timeout,
    };
    AppState::new(
        Arc::new(MemoryEventStore::new()),
        Arc::new(MemoryBookingStore::new()),
        Arc::new(StubGateway::new("rzp_test_it".to_string(), behavior)),
        settings,
        Arc::new(HeaderIdentity),
    )
}

fn app(behavior: StubBehavior) -> Router {
    api::build_router().with_state(state(behavior, Duration::from_millis(100)))
}

async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    who: As,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    match who {
        As::Anonymous => {}
        As::User(id) => builder = builder.header(USER_ID_HEADER, id.to_string()),
        As::Admin(id) => {
            builder = builder
                .header(USER_ID_HEADER, id.to_string())
                .header(USER_ROLE_HEADER, "admin");
        }
    }
    let request = match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(value.to_string())),
        None => builder.body(Body::empty()),
    };
    let Ok(request) = request else {
        panic!("request should build");
    };
    let Ok(response) = router.clone().oneshot(request).await else {
        panic!("router is infallible");
    };
    let status = response.status();
    let Ok(bytes) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
        panic!("body should be readable");
    };
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        let Ok(value) = serde_json::from_slice(&bytes) else {
            panic!("body should be JSON: {}", String::from_utf8_lossy(&bytes));
        };
        value
    };
    (status, value)
}

async fn create_event(router: &Router, admin: Uuid, seats: u32, price: i64, days_out: i64) -> String {
    let date = Utc::now() + chrono::Duration::days(days_out);
    let (status, body) = send(
        router,
        Method::POST,
        "/api/v1/events",
        As::Admin(admin),
        Some(json!({
            "title": "Monsoon Jazz Night",
            "description": "An evening of live jazz by the sea.",
            "category": "Music",
            "date": date.to_rfc3339(),
            "location": {
                "venue": "Blue Frog",
                "address": "Mathuradas Mills Compound",
                "city": "Mumbai",
                "state": "Maharashtra",
                "pincode": "400013"
            },
            "price": price,
            "totalSeats": seats
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let Some(id) = body["id"].as_str() else {
        panic!("event id missing: {body}");
    };
    id.to_string()
}

async fn book(router: &Router, user: Uuid, event_id: &str, tickets: u32) -> (StatusCode, Value) {
    send(
        router,
        Method::POST,
        "/api/v1/bookings",
        As::User(user),
        Some(json!({ "eventId": event_id, "ticketsBooked": tickets })),
    )
    .await
}

async fn booked_seats(router: &Router, event_id: &str) -> u64 {
    let (status, body) = send(
        router,
        Method::GET,
        &format!("/api/v1/events/{event_id}"),
        As::Anonymous,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let Some(booked) = body["seats"]["booked"].as_u64() else {
        panic!("seat counters missing: {body}");
    };
    booked
}

fn id_of(body: &Value) -> String {
    let Some(id) = body["id"].as_str() else {
        panic!("booking id missing: {body}");
    };
    id.to_string()
}

#[tokio::test]
async fn health_is_public() {
    let router = app(StubBehavior::Succeed);
    let (status, body) = send(&router, Method::GET, "/health", As::Anonymous, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["paymentGateway"], "stub");
}

#[tokio::test]
async fn booking_holds_seats_and_embeds_event_summary() {
    let router = app(StubBehavior::Succeed);
    let admin = Uuid::new_v4();
    let user = Uuid::new_v4();
    let event_id = create_event(&router, admin, 10, 50_000, 20).await;

    let (status, body) = book(&router, user, &event_id, 3).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["paymentStatus"], "pending");
    assert_eq!(body["bookingStatus"], "confirmed");
    assert_eq!(body["totalAmount"], 150_000);
    assert_eq!(body["event"]["title"], "Monsoon Jazz Night");
    assert_eq!(booked_seats(&router, &event_id).await, 3);
}

#[tokio::test]
async fn overbooking_is_rejected() {
    let router = app(StubBehavior::Succeed);
    let event_id = create_event(&router, Uuid::new_v4(), 2, 10_000, 20).await;

    let (status, body) = book(&router, Uuid::new_v4(), &event_id, 3).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "insufficient_seats");
    assert_eq!(booked_seats(&router, &event_id).await, 0);
}

#[tokio::test]
async fn last_seat_goes_to_exactly_one_booker() {
    let router = app(StubBehavior::Succeed);
    let event_id = create_event(&router, Uuid::new_v4(), 1, 10_000, 20).await;

    let (first, second) = tokio::join!(
        book(&router, Uuid::new_v4(), &event_id, 1),
        book(&router, Uuid::new_v4(), &event_id, 1),
    );
    let mut statuses = [first.0, second.0];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::BAD_REQUEST]);
    let loser = if first.0 == StatusCode::BAD_REQUEST {
        first.1
    } else {
        second.1
    };
    assert_eq!(loser["error"]["kind"], "insufficient_seats");
    assert_eq!(booked_seats(&router, &event_id).await, 1);
}

#[tokio::test]
async fn paid_booking_gets_a_verifiable_ticket() {
    let router = app(StubBehavior::Succeed);
    let admin = Uuid::new_v4();
    let user = Uuid::new_v4();
    let event_id = create_event(&router, admin, 10, 75_000, 20).await;
    let (_, booking) = book(&router, user, &event_id, 2).await;
    let booking_id = id_of(&booking);

    let (status, order) = send(
        &router,
        Method::POST,
        "/api/v1/payment/create-order",
        As::User(user),
        Some(json!({ "bookingId": booking_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{order}");
    assert_eq!(order["amount"], 150_000);
    assert_eq!(order["currency"], "INR");
    assert_eq!(order["keyId"], "rzp_test_it");
    let Some(order_id) = order["orderId"].as_str() else {
        panic!("order id missing: {order}");
    };

    let payment_id = "pay_it_0001";
    let Ok(signature) = payment_signature(GATEWAY_SECRET, order_id, payment_id) else {
        panic!("signature should compute");
    };
    let (status, confirmation) = send(
        &router,
        Method::POST,
        "/api/v1/payment/verify",
        As::User(user),
        Some(json!({
            "razorpay_order_id": order_id,
            "razorpay_payment_id": payment_id,
            "razorpay_signature": signature,
            "bookingId": booking_id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{confirmation}");
    assert_eq!(confirmation["paymentStatus"], "completed");
    assert_eq!(confirmation["bookingStatus"], "confirmed");
    let Some(qr_code) = confirmation["qrCode"].as_str() else {
        panic!("ticket token missing: {confirmation}");
    };

    let (status, ticket) = send(
        &router,
        Method::POST,
        "/api/v1/tickets/verify",
        As::Admin(admin),
        Some(json!({ "qrCode": qr_code })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{ticket}");
    assert_eq!(ticket["valid"], true);

    // A second order for a paid booking is refused.
    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/payment/create-order",
        As::User(user),
        Some(json!({ "bookingId": booking_id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "invalid_state");
}

#[tokio::test]
async fn tampered_signature_leaves_booking_pending() {
    let router = app(StubBehavior::Succeed);
    let user = Uuid::new_v4();
    let event_id = create_event(&router, Uuid::new_v4(), 10, 10_000, 20).await;
    let (_, booking) = book(&router, user, &event_id, 1).await;
    let booking_id = id_of(&booking);
    let (_, order) = send(
        &router,
        Method::POST,
        "/api/v1/payment/create-order",
        As::User(user),
        Some(json!({ "bookingId": booking_id })),
    )
    .await;

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/payment/verify",
        As::User(user),
        Some(json!({
            "gatewayOrderId": order["orderId"],
            "gatewayPaymentId": "pay_it_forged",
            "gatewaySignature": "00".repeat(32),
            "bookingId": booking_id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "invalid_signature");

    let (status, body) = send(
        &router,
        Method::GET,
        &format!("/api/v1/bookings/{booking_id}"),
        As::User(user),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["paymentStatus"], "pending");
    assert_eq!(booked_seats(&router, &event_id).await, 1);
}

#[tokio::test]
async fn repeated_failure_releases_seats_once() {
    let router = app(StubBehavior::Succeed);
    let user = Uuid::new_v4();
    let event_id = create_event(&router, Uuid::new_v4(), 5, 10_000, 20).await;
    let (_, kept) = book(&router, Uuid::new_v4(), &event_id, 1).await;
    assert!(kept["id"].is_string());
    let (_, booking) = book(&router, user, &event_id, 2).await;
    let booking_id = id_of(&booking);
    assert_eq!(booked_seats(&router, &event_id).await, 3);

    for _ in 0..2 {
        let (status, body) = send(
            &router,
            Method::POST,
            "/api/v1/payment/failure",
            As::User(user),
            Some(json!({ "bookingId": booking_id })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["paymentStatus"], "failed");
        assert_eq!(body["bookingStatus"], "cancelled");
    }
    assert_eq!(booked_seats(&router, &event_id).await, 1);
}

#[tokio::test]
async fn gateway_outage_at_order_time_keeps_booking_payable() {
    let router = app(StubBehavior::FailOrder);
    let user = Uuid::new_v4();
    let event_id = create_event(&router, Uuid::new_v4(), 5, 10_000, 20).await;
    let (_, booking) = book(&router, user, &event_id, 1).await;
    let booking_id = id_of(&booking);

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/payment/create-order",
        As::User(user),
        Some(json!({ "bookingId": booking_id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["kind"], "gateway_error");
    assert_eq!(booked_seats(&router, &event_id).await, 1);
}

#[tokio::test]
async fn cancelling_ten_days_out_refunds_ninety_percent() {
    let router = app(StubBehavior::Succeed);
    let user = Uuid::new_v4();
    let event_id = create_event(&router, Uuid::new_v4(), 10, 50_000, 10).await;
    let (_, booking) = book(&router, user, &event_id, 2).await;
    let booking_id = id_of(&booking);

    let (status, body) = send(
        &router,
        Method::DELETE,
        &format!("/api/v1/bookings/{booking_id}"),
        As::User(user),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["refundAmount"], 90_000);
    assert_eq!(body["booking"]["bookingStatus"], "cancelled");
    assert_eq!(body["booking"]["refund"]["amount"], 90_000);
    assert_eq!(booked_seats(&router, &event_id).await, 0);

    let (status, body) = send(
        &router,
        Method::DELETE,
        &format!("/api/v1/bookings/{booking_id}"),
        As::User(user),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "invalid_state");
}

#[tokio::test]
async fn identity_is_required_and_ownership_enforced() {
    let router = app(StubBehavior::Succeed);
    let owner = Uuid::new_v4();
    let event_id = create_event(&router, Uuid::new_v4(), 10, 10_000, 20).await;

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/bookings",
        As::Anonymous,
        Some(json!({ "eventId": event_id, "ticketsBooked": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["kind"], "unauthorized");

    let (_, booking) = book(&router, owner, &event_id, 1).await;
    let booking_id = id_of(&booking);
    let (status, _) = send(
        &router,
        Method::GET,
        &format!("/api/v1/bookings/{booking_id}"),
        As::User(Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &router,
        Method::GET,
        &format!("/api/v1/bookings/user/{owner}"),
        As::User(Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&router, Method::GET, "/api/v1/payment/history", As::User(owner), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn event_listing_is_public_and_paginated() {
    let router = app(StubBehavior::Succeed);
    let admin = Uuid::new_v4();
    for _ in 0..3 {
        create_event(&router, admin, 10, 10_000, 20).await;
    }

    let (status, body) = send(
        &router,
        Method::GET,
        "/api/v1/events?page=1&limit=2&city=mumbai",
        As::Anonymous,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let Some(data) = body["data"].as_array() else {
        panic!("data array missing: {body}");
    };
    assert_eq!(data.len(), 2);
    assert_eq!(body["pagination"]["total"], 3);

    let (status, body) = send(
        &router,
        Method::GET,
        "/api/v1/events?page=2&limit=2&city=mumbai",
        As::Anonymous,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["pagination"]["total"], 3);
    assert_eq!(body["pagination"]["totalPages"], 2);

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/events",
        As::Admin(admin),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "invalid_request");
}

#[tokio::test]
async fn malformed_input_uses_the_error_envelope() {
    let router = app(StubBehavior::Succeed);
    let user = Uuid::new_v4();

    let (status, body) = send(
        &router,
        Method::GET,
        "/api/v1/bookings/not-a-uuid",
        As::User(user),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "invalid_request");

    let (status, body) = send(
        &router,
        Method::GET,
        "/api/v1/events?page=first",
        As::Anonymous,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "invalid_request");

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/bookings",
        As::User(user),
        Some(json!({ "ticketsBooked": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 1001);
}

#[tokio::test]
async fn cancelled_booking_stays_cancelled() {
    let router = app(StubBehavior::Succeed);
    let user = Uuid::new_v4();
    let event_id = create_event(&router, Uuid::new_v4(), 1, 10_000, 20).await;
    let (_, booking) = book(&router, user, &event_id, 1).await;
    let booking_id = id_of(&booking);
    let (status, _) = send(
        &router,
        Method::DELETE,
        &format!("/api/v1/bookings/{booking_id}"),
        As::User(user),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &router,
        Method::PUT,
        &format!("/api/v1/bookings/{booking_id}/status"),
        As::User(user),
        Some(json!({ "status": "confirmed", "paymentStatus": "pending" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["error"]["kind"], "invalid_state");

    let (status, _) = book(&router, Uuid::new_v4(), &event_id, 1).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/payment/create-order",
        As::User(user),
        Some(json!({ "bookingId": booking_id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "invalid_state");
    assert_eq!(booked_seats(&router, &event_id).await, 1);
}

#[tokio::test]
async fn slow_requests_time_out_with_408() {
    let router = api::build_app(
        state(StubBehavior::Timeout, Duration::from_secs(60)),
        Duration::from_millis(100),
    );
    let user = Uuid::new_v4();
    let event_id = create_event(&router, Uuid::new_v4(), 5, 10_000, 20).await;
    let (_, booking) = book(&router, user, &event_id, 1).await;
    let booking_id = id_of(&booking);

    let (status, _) = send(
        &router,
        Method::POST,
        "/api/v1/payment/create-order",
        As::User(user),
        Some(json!({ "bookingId": booking_id })),
    )
    .await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(booked_seats(&router, &event_id).await, 1);
}
