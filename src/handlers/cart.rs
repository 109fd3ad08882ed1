use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{cart, CartItem};
use crate::session;
use crate::state::AppState;

// GET /api/cart
pub async fn get_cart(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<CartItem>>, AppError> {
    let Some(token) = session::token_from_headers(&headers) else {
        return Ok(Json(vec![]));
    };
    let items = state
        .with_db(move |conn| Ok(queries::get_cart(conn, &token)?))
        .await?;
    Ok(Json(items))
}

// POST /api/cart/add
#[derive(Deserialize)]
pub struct AddItemRequest {
    pub id: String,
    pub name: String,
    pub price_cents: i64,
}

pub async fn add_item(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<AddItemRequest>,
) -> Result<Response, AppError> {
    if payload.id.is_empty() || payload.name.is_empty() {
        return Err(AppError::InvalidInput("missing product fields".to_string()));
    }
    if payload.price_cents < 0 {
        return Err(AppError::InvalidInput("invalid price".to_string()));
    }

    let handle = session::ensure(&headers);
    let token = handle.token.clone();
    let items = state
        .with_db(move |conn| {
            queries::touch_session(conn, &token)?;
            queries::add_cart_item(conn, &token, &payload.id, &payload.name, payload.price_cents)?;
            Ok(queries::get_cart(conn, &token)?)
        })
        .await?;

    Ok(session::attach_cookie(Json(items).into_response(), &handle))
}

// POST /api/cart/update
#[derive(Deserialize)]
pub struct UpdateItemRequest {
    pub id: String,
    pub delta: i64,
}

pub async fn update_item(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<Json<Vec<CartItem>>, AppError> {
    let Some(token) = session::token_from_headers(&headers) else {
        return Ok(Json(vec![]));
    };
    let items = state
        .with_db(move |conn| {
            queries::update_cart_quantity(conn, &token, &payload.id, payload.delta)?;
            Ok(queries::get_cart(conn, &token)?)
        })
        .await?;
    Ok(Json(items))
}

// POST /api/cart/remove
#[derive(Deserialize)]
pub struct RemoveItemRequest {
    pub id: String,
}

#[derive(Serialize)]
pub struct RemoveItemResponse {
    pub success: bool,
    pub cart: Vec<CartItem>,
    pub total_items: i64,
    pub total_price_cents: i64,
}

pub async fn remove_item(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<RemoveItemRequest>,
) -> Result<Json<RemoveItemResponse>, AppError> {
    let items = match session::token_from_headers(&headers) {
        Some(token) => {
            state
                .with_db(move |conn| {
                    queries::remove_cart_item(conn, &token, &payload.id)?;
                    Ok(queries::get_cart(conn, &token)?)
                })
                .await?
        }
        None => vec![],
    };

    Ok(Json(RemoveItemResponse {
        success: true,
        total_items: cart::total_items(&items),
        total_price_cents: cart::total_price_cents(&items),
        cart: items,
    }))
}
