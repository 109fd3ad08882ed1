//! Duration and price resolution against the two catalogs.

use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppError;

/// Total occupied minutes for a primary service plus optional add-ons.
///
/// A missing primary service is fatal to the whole operation. Unknown
/// add-on ids are tolerated and contribute zero minutes; the aggregate
/// lookup sums whatever rows exist. Callers must not tighten this.
pub fn resolve_total_duration(
    conn: &Connection,
    service_id: i64,
    extra_ids: &[i64],
) -> Result<u32, AppError> {
    let base = queries::service_duration(conn, service_id)?.ok_or(AppError::InvalidService)?;
    let extra = queries::extras_total_duration(conn, extra_ids)?;
    Ok(base + extra)
}

/// Charge amount for a booking, with the same leniency as duration
/// resolution: unknown add-ons cost nothing.
pub fn resolve_total_price(
    conn: &Connection,
    service_id: i64,
    extra_ids: &[i64],
) -> Result<i64, AppError> {
    let service = queries::get_service(conn, service_id)?.ok_or(AppError::InvalidService)?;
    let extras = queries::extras_total_price(conn, extra_ids)?;
    Ok(service.price_cents + extras)
}
