use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Html;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{cart, Order, OrderStatus};
use crate::services::booking::{self, BookingRequest};
use crate::services::catalog;
use crate::services::payments::{CheckoutLineItem, CheckoutRequest, PaymentStatus};
use crate::services::scheduling;
use crate::session;
use crate::state::AppState;

use super::auth;

static BOOKING_SUCCESS_HTML: &str = include_str!("../web/booking_success.html");
static SUCCESS_HTML: &str = include_str!("../web/success.html");

static PAYMENT_INCOMPLETE_HTML: &str =
    "<!doctype html><html><body><h1>Payment not completed</h1>\
     <p>Your booking is held but unpaid. <a href=\"/booking\">Back to booking</a></p></body></html>";

// POST /api/bookings/checkout
#[derive(Deserialize)]
pub struct BookingCheckoutRequest {
    pub service_id: Option<i64>,
    #[serde(default)]
    pub extras: Vec<i64>,
    pub booking_date: Option<String>,
    pub booking_time: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, AppError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::InvalidInput(format!("{field} is required"))),
    }
}

pub async fn booking_checkout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<BookingCheckoutRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let service_id = payload
        .service_id
        .ok_or_else(|| AppError::InvalidInput("service_id is required".to_string()))?;
    let date = NaiveDate::parse_from_str(
        required(payload.booking_date.as_deref(), "booking_date")?,
        "%Y-%m-%d",
    )
    .map_err(|_| AppError::InvalidInput("invalid booking_date".to_string()))?;
    let start_minute =
        scheduling::parse_hhmm(required(payload.booking_time.as_deref(), "booking_time")?)?;
    let customer_name = required(payload.customer_name.as_deref(), "customer_name")?.to_string();
    let customer_email = required(payload.customer_email.as_deref(), "customer_email")?.to_string();

    // Anonymous checkout is allowed; a logged-in user gets the booking
    // attached to their account.
    let user = auth::current_user(&state, &headers).await?;

    let request = BookingRequest {
        user_id: user.map(|u| u.id),
        service_id,
        extra_ids: payload.extras,
        date,
        start_minute,
        customer_name: Some(customer_name),
        customer_email: Some(customer_email.clone()),
    };

    // Phase one: reserve the slot. The charge amount is resolved from the
    // catalog, never from the client.
    let (booking, amount_cents, label) = state
        .with_db(move |conn| {
            let booking = booking::reserve(conn, &request)?;
            let amount = catalog::resolve_total_price(conn, request.service_id, &request.extra_ids)?;
            let service =
                queries::get_service(conn, request.service_id)?.ok_or(AppError::InvalidService)?;
            Ok((booking, amount, service.name))
        })
        .await?;

    // Phase two: the provider call happens outside any transaction. If it
    // fails, the booking stays pending and the slot stays held.
    let checkout = CheckoutRequest {
        customer_email: Some(customer_email),
        line_items: vec![CheckoutLineItem {
            name: label,
            amount_cents,
            quantity: 1,
        }],
        success_url: format!(
            "{}/booking-success?session_id={{CHECKOUT_SESSION_ID}}",
            state.config.public_base_url
        ),
        cancel_url: format!("{}/booking", state.config.public_base_url),
    };
    let checkout_session = state
        .payments
        .create_checkout_session(&checkout)
        .await
        .map_err(|e| AppError::Payment(e.to_string()))?;

    let booking_id = booking.id.clone();
    let checkout_ref = checkout_session.id.clone();
    state
        .with_db(move |conn| Ok(queries::set_booking_checkout_ref(conn, &booking_id, &checkout_ref)?))
        .await?;

    Ok(Json(serde_json::json!({
        "session_id": checkout_session.id,
        "url": checkout_session.url,
    })))
}

// GET /booking-success
#[derive(Deserialize)]
pub struct BookingSuccessQuery {
    pub session_id: Option<String>,
}

pub async fn booking_success(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BookingSuccessQuery>,
) -> Result<Html<&'static str>, AppError> {
    let session_id = query
        .session_id
        .ok_or_else(|| AppError::InvalidInput("session_id is required".to_string()))?;

    let checkout_session = state
        .payments
        .fetch_checkout_session(&session_id)
        .await
        .map_err(|e| AppError::Payment(e.to_string()))?;

    if checkout_session.payment_status != PaymentStatus::Paid {
        return Ok(Html(PAYMENT_INCOMPLETE_HTML));
    }

    let updated = state
        .with_db(move |conn| Ok(queries::mark_booking_paid(conn, &session_id)?))
        .await?;
    if !updated {
        return Err(AppError::NotFound("booking for session".to_string()));
    }

    Ok(Html(BOOKING_SUCCESS_HTML))
}

// POST /api/checkout/session
#[derive(Deserialize)]
pub struct CartCheckoutRequest {
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_address: Option<String>,
    pub customer_city: Option<String>,
    pub customer_zip: Option<String>,
    pub customer_country: Option<String>,
}

pub async fn create_checkout_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<CartCheckoutRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let customer_name = required(payload.customer_name.as_deref(), "customer_name")?.to_string();
    let customer_email = required(payload.customer_email.as_deref(), "customer_email")?.to_string();
    let shipping_address =
        required(payload.customer_address.as_deref(), "customer_address")?.to_string();
    let shipping_city = required(payload.customer_city.as_deref(), "customer_city")?.to_string();
    let shipping_zip = required(payload.customer_zip.as_deref(), "customer_zip")?.to_string();
    let shipping_country = payload.customer_country.unwrap_or_else(|| "IT".to_string());

    let token = session::token_from_headers(&headers)
        .ok_or_else(|| AppError::InvalidInput("cart is empty".to_string()))?;
    let items = state
        .with_db(move |conn| Ok(queries::get_cart(conn, &token)?))
        .await?;
    if items.is_empty() {
        return Err(AppError::InvalidInput("cart is empty".to_string()));
    }

    let checkout = CheckoutRequest {
        customer_email: Some(customer_email.clone()),
        line_items: items
            .iter()
            .map(|item| CheckoutLineItem {
                name: item.name.clone(),
                amount_cents: item.price_cents,
                quantity: item.quantity,
            })
            .collect(),
        success_url: format!("{}/success", state.config.public_base_url),
        cancel_url: format!("{}/cart", state.config.public_base_url),
    };
    let checkout_session = state
        .payments
        .create_checkout_session(&checkout)
        .await
        .map_err(|e| AppError::Payment(e.to_string()))?;

    let order = Order {
        id: Uuid::new_v4().to_string(),
        customer_name,
        customer_email,
        shipping_address,
        shipping_city,
        shipping_zip,
        shipping_country,
        total_cents: cart::total_price_cents(&items),
        items,
        checkout_ref: Some(checkout_session.id.clone()),
        status: OrderStatus::Pending,
        created_at: chrono::Utc::now().naive_utc(),
    };
    state
        .with_db(move |conn| Ok(queries::insert_order(conn, &order)?))
        .await?;

    Ok(Json(serde_json::json!({
        "session_id": checkout_session.id,
        "url": checkout_session.url,
    })))
}

// GET /success
pub async fn cart_success(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Html<&'static str>, AppError> {
    if let Some(token) = session::token_from_headers(&headers) {
        state
            .with_db(move |conn| Ok(queries::clear_cart(conn, &token)?))
            .await?;
    }
    Ok(Html(SUCCESS_HTML))
}
