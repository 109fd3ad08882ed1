use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::Role;
use crate::services::booking::{self, BookingRequest};
use crate::services::catalog;
use crate::services::scheduling::{self, Interval};
use crate::state::AppState;

use super::auth;

fn parse_date(s: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| AppError::InvalidInput(format!("invalid date: {s}")))
}

fn parse_id(s: &str) -> Result<i64, AppError> {
    s.trim()
        .parse()
        .map_err(|_| AppError::InvalidInput(format!("invalid id: {s}")))
}

/// Comma-separated id list, e.g. `extras=3,7`. Empty input means no add-ons.
fn parse_id_list(s: Option<&str>) -> Result<Vec<i64>, AppError> {
    match s {
        None | Some("") => Ok(vec![]),
        Some(s) => s.split(',').map(parse_id).collect(),
    }
}

// GET /api/available_slots
#[derive(Deserialize)]
pub struct SlotsQuery {
    pub service_id: Option<String>,
    pub extras: Option<String>,
    pub date: Option<String>,
}

#[derive(Serialize)]
pub struct SlotsResponse {
    pub slots: Vec<String>,
}

pub async fn available_slots(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<SlotsResponse>, AppError> {
    let service_id = query
        .service_id
        .as_deref()
        .ok_or_else(|| AppError::InvalidInput("service_id is required".to_string()))
        .and_then(parse_id)?;
    let date = query
        .date
        .as_deref()
        .ok_or_else(|| AppError::InvalidInput("date is required".to_string()))
        .and_then(parse_date)?;
    let extra_ids = parse_id_list(query.extras.as_deref())?;

    // Always computed from a fresh read; caching the occupied intervals
    // would let a stale snapshot offer an already-taken slot.
    let starts = state
        .with_db(move |conn| {
            let total_duration = catalog::resolve_total_duration(conn, service_id, &extra_ids)?;
            let existing: Vec<Interval> = queries::blocking_intervals(conn, date)?
                .into_iter()
                .map(|(start, duration)| Interval::starting_at(start, duration))
                .collect();
            Ok(scheduling::available_starts(total_duration, &existing))
        })
        .await?;

    Ok(Json(SlotsResponse {
        slots: starts.into_iter().map(scheduling::format_hhmm).collect(),
    }))
}

// POST /api/bookings
#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub service_id: Option<i64>,
    #[serde(default)]
    pub extras: Vec<i64>,
    pub booking_date: Option<String>,
    pub booking_time: Option<String>,
}

#[derive(Serialize)]
pub struct CreateBookingResponse {
    pub booking_id: String,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<Json<CreateBookingResponse>, AppError> {
    let user = auth::current_user(&state, &headers)
        .await?
        .ok_or(AppError::Unauthenticated)?;

    let service_id = payload
        .service_id
        .ok_or_else(|| AppError::InvalidInput("service_id is required".to_string()))?;
    let date = payload
        .booking_date
        .as_deref()
        .ok_or_else(|| AppError::InvalidInput("booking_date is required".to_string()))
        .and_then(parse_date)?;
    let start_minute = payload
        .booking_time
        .as_deref()
        .ok_or_else(|| AppError::InvalidInput("booking_time is required".to_string()))
        .and_then(scheduling::parse_hhmm)?;

    let request = BookingRequest {
        user_id: Some(user.id),
        service_id,
        extra_ids: payload.extras,
        date,
        start_minute,
        customer_name: None,
        customer_email: None,
    };

    let booking = state
        .with_db(move |conn| booking::reserve(conn, &request))
        .await?;

    tracing::info!(booking_id = %booking.id, date = %date, "booking created");

    Ok(Json(CreateBookingResponse {
        booking_id: booking.id,
    }))
}

// GET /api/bookings
#[derive(Serialize)]
pub struct BookingListEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub booking_date: String,
    pub booking_time: String,
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<BookingListEntry>>, AppError> {
    // Anonymous callers get an empty list, not an error.
    let Some(user) = auth::current_user(&state, &headers).await? else {
        return Ok(Json(vec![]));
    };

    let entries: Vec<BookingListEntry> = match user.role {
        Role::Admin => {
            state
                .with_db(|conn| Ok(queries::all_bookings_with_users(conn)?))
                .await?
                .into_iter()
                .map(|slot| BookingListEntry {
                    username: slot.username,
                    booking_date: slot.booking_date,
                    booking_time: scheduling::format_hhmm(slot.start_minute),
                })
                .collect()
        }
        Role::User => {
            let user_id = user.id;
            state
                .with_db(move |conn| Ok(queries::bookings_for_user(conn, &user_id)?))
                .await?
                .into_iter()
                .map(|slot| BookingListEntry {
                    username: None,
                    booking_date: slot.booking_date,
                    booking_time: scheduling::format_hhmm(slot.start_minute),
                })
                .collect()
        }
    };

    Ok(Json(entries))
}
