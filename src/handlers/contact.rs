use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::state::AppState;

// POST /api/contact
#[derive(Deserialize)]
pub struct ContactRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
}

pub async fn submit(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ContactRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let name = payload.name.unwrap_or_default();
    let email = payload.email.unwrap_or_default();
    let message = payload.message.unwrap_or_default();
    if name.is_empty() || email.is_empty() || message.is_empty() {
        return Err(AppError::InvalidInput(
            "name, email and message are required".to_string(),
        ));
    }

    state
        .with_db(move |conn| Ok(queries::insert_message(conn, &name, &email, &message)?))
        .await?;

    Ok(Json(serde_json::json!({ "status": "ok" })))
}
