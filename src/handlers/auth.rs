use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Role, User};
use crate::session;
use crate::state::AppState;

/// Resolve the logged-in user for this request, if any.
pub async fn current_user(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<User>, AppError> {
    let Some(token) = session::token_from_headers(headers) else {
        return Ok(None);
    };
    state
        .with_db(move |conn| Ok(queries::session_user(conn, &token)?))
        .await
}

// POST /api/register
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub role: Option<String>,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if payload.username.is_empty() || payload.password.is_empty() {
        return Err(AppError::InvalidInput(
            "username and password are required".to_string(),
        ));
    }

    let password_hash = bcrypt::hash(&payload.password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Storage(anyhow::anyhow!("password hashing: {e}")))?;

    let user = User {
        id: Uuid::new_v4().to_string(),
        username: payload.username,
        password_hash,
        role: Role::parse(payload.role.as_deref().unwrap_or("user")),
    };

    state
        .with_db(move |conn| match queries::create_user(conn, &user) {
            Err(e) if queries::is_unique_violation(&e) => Err(AppError::InvalidInput(
                "username already taken".to_string(),
            )),
            other => other.map_err(Into::into),
        })
        .await?;

    Ok(Json(serde_json::json!({ "status": "registered" })))
}

// POST /api/login
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, AppError> {
    let username = payload.username.clone();
    let user = state
        .with_db(move |conn| Ok(queries::get_user_by_username(conn, &username)?))
        .await?
        .ok_or(AppError::Unauthenticated)?;

    let verified = bcrypt::verify(&payload.password, &user.password_hash)
        .map_err(|e| AppError::Storage(anyhow::anyhow!("password verification: {e}")))?;
    if !verified {
        return Err(AppError::Unauthenticated);
    }

    let handle = session::ensure(&headers);
    let token = handle.token.clone();
    let user_id = user.id.clone();
    state
        .with_db(move |conn| Ok(queries::set_session_user(conn, &token, &user_id)?))
        .await?;

    let body = Json(serde_json::json!({ "status": "ok", "role": user.role.as_str() }));
    Ok(session::attach_cookie(body.into_response(), &handle))
}

// POST /api/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    if let Some(token) = session::token_from_headers(&headers) {
        state
            .with_db(move |conn| Ok(queries::clear_session(conn, &token)?))
            .await?;
    }
    Ok(Json(serde_json::json!({ "status": "ok" })))
}
