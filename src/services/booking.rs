//! Reservation orchestration: the check-then-insert path for new bookings.

use chrono::NaiveDate;
use rusqlite::{Connection, TransactionBehavior};
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus};

use super::catalog;
use super::scheduling::{self, Interval};

pub struct BookingRequest {
    pub user_id: Option<String>,
    pub service_id: i64,
    pub extra_ids: Vec<i64>,
    pub date: NaiveDate,
    pub start_minute: u32,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
}

/// Reserve a slot, creating a `pending` booking.
///
/// The duration lookup, the overlap check against every blocking booking on
/// the date, and the insert run in one IMMEDIATE transaction: the write
/// lock is taken at BEGIN, so no concurrent writer can slip a booking in
/// between the check and the insert. The unique index on
/// (booking_date, start_minute, service_id) stays as a backstop; a
/// violation there is reported as the same user-facing conflict.
pub fn reserve(conn: &mut Connection, request: &BookingRequest) -> Result<Booking, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let total_duration =
        catalog::resolve_total_duration(&tx, request.service_id, &request.extra_ids)?;

    let existing: Vec<Interval> = queries::blocking_intervals(&tx, request.date)?
        .into_iter()
        .map(|(start, duration)| Interval::starting_at(start, duration))
        .collect();

    let candidate = Interval::starting_at(request.start_minute, total_duration);
    if scheduling::has_conflict(candidate, &existing) {
        return Err(AppError::Conflict);
    }

    let booking = Booking {
        id: Uuid::new_v4().to_string(),
        user_id: request.user_id.clone(),
        service_id: request.service_id,
        extra_ids: request.extra_ids.clone(),
        booking_date: request.date,
        start_minute: request.start_minute,
        status: BookingStatus::Pending,
        customer_name: request.customer_name.clone(),
        customer_email: request.customer_email.clone(),
        checkout_ref: None,
        created_at: chrono::Utc::now().naive_utc(),
    };

    match queries::insert_booking(&tx, &booking) {
        Ok(()) => {}
        Err(e) if queries::is_unique_violation(&e) => return Err(AppError::Conflict),
        Err(e) => return Err(e.into()),
    }

    tx.commit()?;
    Ok(booking)
}
