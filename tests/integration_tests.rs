use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use salone::config::AppConfig;
use salone::db::{self, queries};
use salone::models::CatalogItem;
use salone::services::payments::{
    CheckoutRequest, CheckoutSession, PaymentProvider, PaymentStatus,
};
use salone::state::AppState;

// ── Mock Payment Provider ──

struct MockPayments {
    counter: AtomicU64,
    paid: AtomicBool,
}

impl MockPayments {
    fn new(paid: bool) -> Self {
        Self {
            counter: AtomicU64::new(0),
            paid: AtomicBool::new(paid),
        }
    }
}

#[async_trait]
impl PaymentProvider for MockPayments {
    async fn create_checkout_session(
        &self,
        _request: &CheckoutRequest,
    ) -> anyhow::Result<CheckoutSession> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(CheckoutSession {
            id: format!("cs_test_{n}"),
            url: Some(format!("https://checkout.example/cs_test_{n}")),
            payment_status: PaymentStatus::Unpaid,
        })
    }

    async fn fetch_checkout_session(&self, session_id: &str) -> anyhow::Result<CheckoutSession> {
        let status = if self.paid.load(Ordering::SeqCst) {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Unpaid
        };
        Ok(CheckoutSession {
            id: session_id.to_string(),
            url: None,
            payment_status: status,
        })
    }
}

// ── Helpers ──

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        public_base_url: "http://localhost:3000".to_string(),
        stripe_secret_key: "".to_string(),
        stripe_public_key: "".to_string(),
        currency: "eur".to_string(),
    }
}

async fn test_state_with_payments(paid: bool) -> Arc<AppState> {
    let pool = db::init_pool(":memory:").await.unwrap();
    let state = Arc::new(AppState {
        pool,
        config: test_config(),
        payments: Box::new(MockPayments::new(paid)),
    });

    state
        .with_db(|conn| {
            queries::insert_service(
                conn,
                &CatalogItem {
                    id: 1,
                    name: "Haircut".to_string(),
                    duration_minutes: 30,
                    price_cents: 2000,
                },
            )?;
            queries::insert_service(
                conn,
                &CatalogItem {
                    id: 2,
                    name: "Color".to_string(),
                    duration_minutes: 90,
                    price_cents: 6000,
                },
            )?;
            queries::insert_extra(
                conn,
                &CatalogItem {
                    id: 10,
                    name: "Beard trim".to_string(),
                    duration_minutes: 15,
                    price_cents: 800,
                },
            )?;
            Ok(())
        })
        .await
        .unwrap();

    state
}

async fn test_state() -> Arc<AppState> {
    test_state_with_payments(true).await
}

fn test_app(state: Arc<AppState>) -> Router {
    salone::router(state)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn with_cookie(mut request: Request<Body>, token: &str) -> Request<Body> {
    request.headers_mut().insert(
        "cookie",
        format!("salone_session={token}").parse().unwrap(),
    );
    request
}

async fn json_body(res: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn session_token(res: &axum::response::Response) -> String {
    let cookie = res
        .headers()
        .get("set-cookie")
        .expect("expected a Set-Cookie header")
        .to_str()
        .unwrap();
    cookie
        .split(';')
        .next()
        .and_then(|pair| pair.split_once('='))
        .map(|(_, token)| token.to_string())
        .unwrap()
}

/// Register + login, returning the session cookie token.
async fn login(state: &Arc<AppState>, username: &str) -> String {
    let res = test_app(state.clone())
        .oneshot(post_json(
            "/api/register",
            serde_json::json!({ "username": username, "password": "hunter2" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = test_app(state.clone())
        .oneshot(post_json(
            "/api/login",
            serde_json::json!({ "username": username, "password": "hunter2" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    session_token(&res)
}

// ── Health ──

#[tokio::test]
async fn test_health() {
    let res = test_app(test_state().await)
        .oneshot(get("/health"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await["status"], "ok");
}

// ── Available Slots ──

#[tokio::test]
async fn test_empty_day_offers_full_grid() {
    let state = test_state().await;
    let res = test_app(state)
        .oneshot(get("/api/available_slots?service_id=1&date=2025-09-01"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = json_body(res).await;
    let slots = body["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 40);
    assert_eq!(slots.first().unwrap(), "10:00");
    assert_eq!(slots.last().unwrap(), "19:45");
}

#[tokio::test]
async fn test_slots_idempotent_when_bookings_unchanged() {
    let state = test_state().await;
    let uri = "/api/available_slots?service_id=1&date=2025-09-01";

    let first = json_body(
        test_app(state.clone()).oneshot(get(uri)).await.unwrap(),
    )
    .await;
    let second = json_body(
        test_app(state.clone()).oneshot(get(uri)).await.unwrap(),
    )
    .await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_long_service_still_offered_late_slots() {
    // 90-minute service at 19:45 would run past closing; the grid does not clip.
    let state = test_state().await;
    let res = test_app(state)
        .oneshot(get("/api/available_slots?service_id=2&date=2025-09-01"))
        .await
        .unwrap();
    let body = json_body(res).await;
    assert_eq!(body["slots"].as_array().unwrap().last().unwrap(), "19:45");
}

#[tokio::test]
async fn test_slots_missing_params_rejected() {
    let state = test_state().await;

    let res = test_app(state.clone())
        .oneshot(get("/api/available_slots?date=2025-09-01"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = test_app(state.clone())
        .oneshot(get("/api/available_slots?service_id=1"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = test_app(state.clone())
        .oneshot(get("/api/available_slots?service_id=abc&date=2025-09-01"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = test_app(state)
        .oneshot(get("/api/available_slots?service_id=1&date=not-a-date"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_slots_unknown_service_rejected() {
    let state = test_state().await;
    let res = test_app(state)
        .oneshot(get("/api/available_slots?service_id=42&date=2025-09-01"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(res).await["error"], "unknown service");
}

#[tokio::test]
async fn test_existing_booking_excludes_overlapping_slots() {
    let state = test_state().await;

    // Anonymous checkout reserves a 30-minute haircut at 10:00.
    let res = test_app(state.clone())
        .oneshot(post_json(
            "/api/bookings/checkout",
            serde_json::json!({
                "service_id": 1,
                "booking_date": "2025-09-01",
                "booking_time": "10:00",
                "customer_name": "Marco",
                "customer_email": "marco@example.com",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = test_app(state)
        .oneshot(get("/api/available_slots?service_id=1&date=2025-09-01"))
        .await
        .unwrap();
    let body = json_body(res).await;
    let slots: Vec<&str> = body["slots"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s.as_str().unwrap())
        .collect();

    // [600,630) is occupied: 10:00 and 10:15 collide, 10:30 touches only.
    assert!(!slots.contains(&"10:00"));
    assert!(!slots.contains(&"10:15"));
    assert!(slots.contains(&"10:30"));
    assert_eq!(slots.len(), 38);
}

#[tokio::test]
async fn test_unknown_extra_does_not_change_slots() {
    let state = test_state().await;

    let plain = json_body(
        test_app(state.clone())
            .oneshot(get("/api/available_slots?service_id=1&date=2025-09-01"))
            .await
            .unwrap(),
    )
    .await;
    let with_ghost_extra = json_body(
        test_app(state)
            .oneshot(get(
                "/api/available_slots?service_id=1&date=2025-09-01&extras=999",
            ))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(plain, with_ghost_extra);
}

// ── Booking creation ──

#[tokio::test]
async fn test_create_booking_requires_login() {
    let state = test_state().await;
    let res = test_app(state)
        .oneshot(post_json(
            "/api/bookings",
            serde_json::json!({
                "service_id": 1,
                "booking_date": "2025-09-01",
                "booking_time": "10:00",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_booking_and_list() {
    let state = test_state().await;
    let token = login(&state, "marco").await;

    let res = test_app(state.clone())
        .oneshot(with_cookie(
            post_json(
                "/api/bookings",
                serde_json::json!({
                    "service_id": 1,
                    "extras": [10],
                    "booking_date": "2025-09-01",
                    "booking_time": "10:00",
                }),
            ),
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    assert!(body["booking_id"].as_str().is_some());

    let res = test_app(state)
        .oneshot(with_cookie(get("/api/bookings"), &token))
        .await
        .unwrap();
    let body = json_body(res).await;
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["booking_date"], "2025-09-01");
    assert_eq!(entries[0]["booking_time"], "10:00");
}

#[tokio::test]
async fn test_create_booking_missing_fields_rejected() {
    let state = test_state().await;
    let token = login(&state, "marco").await;

    let res = test_app(state)
        .oneshot(with_cookie(
            post_json(
                "/api/bookings",
                serde_json::json!({ "service_id": 1, "booking_date": "2025-09-01" }),
            ),
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_overlapping_booking_conflicts() {
    let state = test_state().await;
    let token = login(&state, "marco").await;

    let res = test_app(state.clone())
        .oneshot(with_cookie(
            post_json(
                "/api/bookings",
                serde_json::json!({
                    "service_id": 1,
                    "booking_date": "2025-09-01",
                    "booking_time": "10:00",
                }),
            ),
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // A different service overlapping [600,630) still conflicts: one timeline.
    let res = test_app(state)
        .oneshot(with_cookie(
            post_json(
                "/api/bookings",
                serde_json::json!({
                    "service_id": 2,
                    "booking_date": "2025-09-01",
                    "booking_time": "10:15",
                }),
            ),
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(res).await["error"], "slot unavailable");
}

#[tokio::test]
async fn test_double_booking_race_single_winner() {
    let state = test_state().await;

    let request = |name: &str| {
        post_json(
            "/api/bookings/checkout",
            serde_json::json!({
                "service_id": 1,
                "booking_date": "2025-09-01",
                "booking_time": "12:00",
                "customer_name": name,
                "customer_email": format!("{name}@example.com"),
            }),
        )
    };

    let (first, second) = tokio::join!(
        test_app(state.clone()).oneshot(request("anna")),
        test_app(state.clone()).oneshot(request("bruno")),
    );
    let statuses = [first.unwrap().status(), second.unwrap().status()];

    assert!(statuses.contains(&StatusCode::OK), "no booking succeeded");
    assert!(
        statuses.contains(&StatusCode::CONFLICT),
        "both bookings were accepted: {statuses:?}"
    );
}

// ── Checkout flow ──

#[tokio::test]
async fn test_booking_checkout_then_success_marks_paid() {
    let state = test_state().await;

    let res = test_app(state.clone())
        .oneshot(post_json(
            "/api/bookings/checkout",
            serde_json::json!({
                "service_id": 1,
                "extras": [10],
                "booking_date": "2025-09-01",
                "booking_time": "15:00",
                "customer_name": "Marco",
                "customer_email": "marco@example.com",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    let session_id = body["session_id"].as_str().unwrap().to_string();

    let res = test_app(state.clone())
        .oneshot(get(&format!("/booking-success?session_id={session_id}")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let sid = session_id.clone();
    let status: String = state
        .with_db(move |conn| {
            Ok(conn.query_row(
                "SELECT status FROM bookings WHERE checkout_ref = ?1",
                [sid],
                |row| row.get(0),
            )?)
        })
        .await
        .unwrap();
    assert_eq!(status, "paid");
}

#[tokio::test]
async fn test_unpaid_session_leaves_booking_pending() {
    let state = test_state_with_payments(false).await;

    let res = test_app(state.clone())
        .oneshot(post_json(
            "/api/bookings/checkout",
            serde_json::json!({
                "service_id": 1,
                "booking_date": "2025-09-01",
                "booking_time": "15:00",
                "customer_name": "Marco",
                "customer_email": "marco@example.com",
            }),
        ))
        .await
        .unwrap();
    let session_id = json_body(res).await["session_id"]
        .as_str()
        .unwrap()
        .to_string();

    let res = test_app(state.clone())
        .oneshot(get(&format!("/booking-success?session_id={session_id}")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let sid = session_id.clone();
    let status: String = state
        .with_db(move |conn| {
            Ok(conn.query_row(
                "SELECT status FROM bookings WHERE checkout_ref = ?1",
                [sid],
                |row| row.get(0),
            )?)
        })
        .await
        .unwrap();
    assert_eq!(status, "pending");
}

#[tokio::test]
async fn test_booking_checkout_missing_customer_rejected() {
    let state = test_state().await;
    let res = test_app(state)
        .oneshot(post_json(
            "/api/bookings/checkout",
            serde_json::json!({
                "service_id": 1,
                "booking_date": "2025-09-01",
                "booking_time": "15:00",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

// ── Cart ──

#[tokio::test]
async fn test_cart_add_update_remove() {
    let state = test_state().await;

    // First add mints the session cookie.
    let res = test_app(state.clone())
        .oneshot(post_json(
            "/api/cart/add",
            serde_json::json!({ "id": "pomade", "name": "Pomade", "price_cents": 1200 }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let token = session_token(&res);
    let cart = json_body(res).await;
    assert_eq!(cart.as_array().unwrap().len(), 1);

    // Same product again increments the quantity.
    let res = test_app(state.clone())
        .oneshot(with_cookie(
            post_json(
                "/api/cart/add",
                serde_json::json!({ "id": "pomade", "name": "Pomade", "price_cents": 1200 }),
            ),
            &token,
        ))
        .await
        .unwrap();
    let cart = json_body(res).await;
    assert_eq!(cart[0]["quantity"], 2);

    // Delta down to one.
    let res = test_app(state.clone())
        .oneshot(with_cookie(
            post_json(
                "/api/cart/update",
                serde_json::json!({ "id": "pomade", "delta": -1 }),
            ),
            &token,
        ))
        .await
        .unwrap();
    let cart = json_body(res).await;
    assert_eq!(cart[0]["quantity"], 1);

    // Delta to zero drops the line.
    let res = test_app(state.clone())
        .oneshot(with_cookie(
            post_json(
                "/api/cart/update",
                serde_json::json!({ "id": "pomade", "delta": -1 }),
            ),
            &token,
        ))
        .await
        .unwrap();
    assert!(json_body(res).await.as_array().unwrap().is_empty());

    // Removing from an empty cart still succeeds.
    let res = test_app(state)
        .oneshot(with_cookie(
            post_json("/api/cart/remove", serde_json::json!({ "id": "pomade" })),
            &token,
        ))
        .await
        .unwrap();
    let body = json_body(res).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["total_items"], 0);
    assert_eq!(body["total_price_cents"], 0);
}

#[tokio::test]
async fn test_cart_without_cookie_is_empty() {
    let state = test_state().await;
    let res = test_app(state).oneshot(get("/api/cart")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(json_body(res).await.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_cart_checkout_empty_cart_rejected() {
    let state = test_state().await;
    let res = test_app(state)
        .oneshot(post_json(
            "/api/checkout/session",
            serde_json::json!({
                "customer_name": "Marco",
                "customer_email": "marco@example.com",
                "customer_address": "Via Roma 1",
                "customer_city": "Napoli",
                "customer_zip": "80100",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cart_checkout_records_order_and_success_clears_cart() {
    let state = test_state().await;

    let res = test_app(state.clone())
        .oneshot(post_json(
            "/api/cart/add",
            serde_json::json!({ "id": "pomade", "name": "Pomade", "price_cents": 1200 }),
        ))
        .await
        .unwrap();
    let token = session_token(&res);

    let res = test_app(state.clone())
        .oneshot(with_cookie(
            post_json(
                "/api/checkout/session",
                serde_json::json!({
                    "customer_name": "Marco",
                    "customer_email": "marco@example.com",
                    "customer_address": "Via Roma 1",
                    "customer_city": "Napoli",
                    "customer_zip": "80100",
                }),
            ),
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let session_id = json_body(res).await["session_id"]
        .as_str()
        .unwrap()
        .to_string();

    let sid = session_id.clone();
    let (status, total): (String, i64) = state
        .with_db(move |conn| {
            Ok(conn.query_row(
                "SELECT status, total_cents FROM orders WHERE checkout_ref = ?1",
                [sid],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?)
        })
        .await
        .unwrap();
    assert_eq!(status, "pending");
    assert_eq!(total, 1200);

    // Landing on /success empties the cart.
    let res = test_app(state.clone())
        .oneshot(with_cookie(get("/success"), &token))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = test_app(state)
        .oneshot(with_cookie(get("/api/cart"), &token))
        .await
        .unwrap();
    assert!(json_body(res).await.as_array().unwrap().is_empty());
}

// ── Auth ──

#[tokio::test]
async fn test_register_duplicate_username_rejected() {
    let state = test_state().await;
    let payload = serde_json::json!({ "username": "marco", "password": "hunter2" });

    let res = test_app(state.clone())
        .oneshot(post_json("/api/register", payload.clone()))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = test_app(state)
        .oneshot(post_json("/api/register", payload))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_wrong_password_rejected() {
    let state = test_state().await;
    login(&state, "marco").await;

    let res = test_app(state)
        .oneshot(post_json(
            "/api/login",
            serde_json::json!({ "username": "marco", "password": "wrong" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_drops_session() {
    let state = test_state().await;
    let token = login(&state, "marco").await;

    let res = test_app(state.clone())
        .oneshot(with_cookie(
            post_json("/api/logout", serde_json::json!({})),
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // The old cookie no longer authenticates.
    let res = test_app(state)
        .oneshot(with_cookie(
            post_json(
                "/api/bookings",
                serde_json::json!({
                    "service_id": 1,
                    "booking_date": "2025-09-01",
                    "booking_time": "10:00",
                }),
            ),
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

// ── Contact ──

#[tokio::test]
async fn test_contact_requires_all_fields() {
    let state = test_state().await;
    let res = test_app(state)
        .oneshot(post_json(
            "/api/contact",
            serde_json::json!({ "name": "Marco", "email": "" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_contact_stores_message() {
    let state = test_state().await;
    let res = test_app(state.clone())
        .oneshot(post_json(
            "/api/contact",
            serde_json::json!({
                "name": "Marco",
                "email": "marco@example.com",
                "message": "Do you take walk-ins?",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let count: i64 = state
        .with_db(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?)
        })
        .await
        .unwrap();
    assert_eq!(count, 1);
}
