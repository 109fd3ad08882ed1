use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::CatalogItem;
use crate::state::AppState;

// GET /api/services
pub async fn list_services(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CatalogItem>>, AppError> {
    let services = state
        .with_db(|conn| Ok(queries::list_services(conn)?))
        .await?;
    Ok(Json(services))
}

// GET /api/extras
pub async fn list_extras(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CatalogItem>>, AppError> {
    let extras = state.with_db(|conn| Ok(queries::list_extras(conn)?)).await?;
    Ok(Json(extras))
}
