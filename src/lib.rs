pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;
pub mod session;
pub mod state;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/", get(handlers::pages::home))
        .route("/booking", get(handlers::pages::booking_page))
        .route("/cart", get(handlers::pages::cart_page))
        .route("/contact", get(handlers::pages::contact_page))
        .route("/success", get(handlers::checkout::cart_success))
        .route("/booking-success", get(handlers::checkout::booking_success))
        .route("/api/services", get(handlers::catalog::list_services))
        .route("/api/extras", get(handlers::catalog::list_extras))
        .route("/api/cart", get(handlers::cart::get_cart))
        .route("/api/cart/add", post(handlers::cart::add_item))
        .route("/api/cart/update", post(handlers::cart::update_item))
        .route("/api/cart/remove", post(handlers::cart::remove_item))
        .route("/api/register", post(handlers::auth::register))
        .route("/api/login", post(handlers::auth::login))
        .route("/api/logout", post(handlers::auth::logout))
        .route("/api/available_slots", get(handlers::bookings::available_slots))
        .route(
            "/api/bookings",
            get(handlers::bookings::list_bookings).post(handlers::bookings::create_booking),
        )
        .route(
            "/api/bookings/checkout",
            post(handlers::checkout::booking_checkout),
        )
        .route(
            "/api/checkout/session",
            post(handlers::checkout::create_checkout_session),
        )
        .route("/api/contact", post(handlers::contact::submit))
        .with_state(state)
}
