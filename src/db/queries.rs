use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection};

use crate::models::{Booking, BookingStatus, CartItem, CatalogItem, Order, Role, User};

/// Unique-constraint violations get surfaced as domain conflicts, not as
/// storage failures.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

// ── Sessions ──

pub fn touch_session(conn: &Connection, token: &str) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO sessions (token) VALUES (?1) ON CONFLICT(token) DO NOTHING",
        params![token],
    )?;
    Ok(())
}

pub fn set_session_user(conn: &Connection, token: &str, user_id: &str) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO sessions (token, user_id) VALUES (?1, ?2)
         ON CONFLICT(token) DO UPDATE SET user_id = excluded.user_id",
        params![token, user_id],
    )?;
    Ok(())
}

/// Drop the session row and everything scoped to it.
pub fn clear_session(conn: &Connection, token: &str) -> anyhow::Result<()> {
    conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    conn.execute(
        "DELETE FROM cart_items WHERE session_token = ?1",
        params![token],
    )?;
    Ok(())
}

pub fn session_user(conn: &Connection, token: &str) -> anyhow::Result<Option<User>> {
    let result = conn.query_row(
        "SELECT u.id, u.username, u.password_hash, u.role
         FROM sessions s JOIN users u ON u.id = s.user_id
         WHERE s.token = ?1",
        params![token],
        parse_user_row,
    );

    match result {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// ── Users ──

pub fn create_user(conn: &Connection, user: &User) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO users (id, username, password_hash, role) VALUES (?1, ?2, ?3, ?4)",
        params![
            user.id,
            user.username,
            user.password_hash,
            user.role.as_str()
        ],
    )?;
    Ok(())
}

pub fn get_user_by_username(conn: &Connection, username: &str) -> anyhow::Result<Option<User>> {
    let result = conn.query_row(
        "SELECT id, username, password_hash, role FROM users WHERE username = ?1",
        params![username],
        parse_user_row,
    );

    match result {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn parse_user_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
    let role: String = row.get(3)?;
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        role: Role::parse(&role),
    })
}

// ── Catalog ──

pub fn insert_service(conn: &Connection, item: &CatalogItem) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO services (id, name, duration_minutes, price_cents) VALUES (?1, ?2, ?3, ?4)",
        params![item.id, item.name, item.duration_minutes, item.price_cents],
    )?;
    Ok(())
}

pub fn insert_extra(conn: &Connection, item: &CatalogItem) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO extras (id, name, duration_minutes, price_cents) VALUES (?1, ?2, ?3, ?4)",
        params![item.id, item.name, item.duration_minutes, item.price_cents],
    )?;
    Ok(())
}

pub fn list_services(conn: &Connection) -> anyhow::Result<Vec<CatalogItem>> {
    list_catalog(conn, "services")
}

pub fn list_extras(conn: &Connection) -> anyhow::Result<Vec<CatalogItem>> {
    list_catalog(conn, "extras")
}

fn list_catalog(conn: &Connection, table: &str) -> anyhow::Result<Vec<CatalogItem>> {
    let sql =
        format!("SELECT id, name, duration_minutes, price_cents FROM {table} ORDER BY id ASC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| {
        Ok(CatalogItem {
            id: row.get(0)?,
            name: row.get(1)?,
            duration_minutes: row.get(2)?,
            price_cents: row.get(3)?,
        })
    })?;

    let mut items = vec![];
    for row in rows {
        items.push(row?);
    }
    Ok(items)
}

pub fn get_service(conn: &Connection, id: i64) -> anyhow::Result<Option<CatalogItem>> {
    let result = conn.query_row(
        "SELECT id, name, duration_minutes, price_cents FROM services WHERE id = ?1",
        params![id],
        |row| {
            Ok(CatalogItem {
                id: row.get(0)?,
                name: row.get(1)?,
                duration_minutes: row.get(2)?,
                price_cents: row.get(3)?,
            })
        },
    );

    match result {
        Ok(item) => Ok(Some(item)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn service_duration(conn: &Connection, id: i64) -> anyhow::Result<Option<u32>> {
    let result = conn.query_row(
        "SELECT duration_minutes FROM services WHERE id = ?1",
        params![id],
        |row| row.get::<_, u32>(0),
    );

    match result {
        Ok(duration) => Ok(Some(duration)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Aggregate duration of the given add-ons. Ids with no catalog row simply
/// contribute nothing; the sum defaults to zero.
pub fn extras_total_duration(conn: &Connection, extra_ids: &[i64]) -> anyhow::Result<u32> {
    extras_total(conn, extra_ids, "duration_minutes").map(|total| total as u32)
}

pub fn extras_total_price(conn: &Connection, extra_ids: &[i64]) -> anyhow::Result<i64> {
    extras_total(conn, extra_ids, "price_cents")
}

fn extras_total(conn: &Connection, extra_ids: &[i64], column: &str) -> anyhow::Result<i64> {
    if extra_ids.is_empty() {
        return Ok(0);
    }
    let placeholders = vec!["?"; extra_ids.len()].join(",");
    let sql = format!("SELECT COALESCE(SUM({column}), 0) FROM extras WHERE id IN ({placeholders})");
    let total = conn.query_row(
        &sql,
        rusqlite::params_from_iter(extra_ids.iter()),
        |row| row.get::<_, i64>(0),
    )?;
    Ok(total)
}

// ── Bookings ──

pub fn insert_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    let booking_date = booking.booking_date.format("%Y-%m-%d").to_string();
    let created_at = booking.created_at.format("%Y-%m-%d %H:%M:%S").to_string();

    conn.execute(
        "INSERT INTO bookings (id, user_id, service_id, booking_date, start_minute, status, customer_name, customer_email, checkout_ref, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            booking.id,
            booking.user_id,
            booking.service_id,
            booking_date,
            booking.start_minute,
            booking.status.as_str(),
            booking.customer_name,
            booking.customer_email,
            booking.checkout_ref,
            created_at,
        ],
    )?;

    for extra_id in &booking.extra_ids {
        conn.execute(
            "INSERT OR IGNORE INTO booking_extras (booking_id, extra_id) VALUES (?1, ?2)",
            params![booking.id, extra_id],
        )?;
    }

    Ok(())
}

/// Occupied (start_minute, total_duration) pairs for every blocking booking
/// on `date`. Each booking's duration is its service duration plus the sum
/// of its add-on durations from the join table.
pub fn blocking_intervals(conn: &Connection, date: NaiveDate) -> anyhow::Result<Vec<(u32, u32)>> {
    let date_str = date.format("%Y-%m-%d").to_string();
    let mut stmt = conn.prepare(
        "SELECT b.start_minute,
                s.duration_minutes + COALESCE((
                    SELECT SUM(e.duration_minutes)
                    FROM booking_extras be
                    JOIN extras e ON e.id = be.extra_id
                    WHERE be.booking_id = b.id
                ), 0)
         FROM bookings b
         JOIN services s ON s.id = b.service_id
         WHERE b.booking_date = ?1 AND b.status IN ('pending', 'paid')
         ORDER BY b.start_minute ASC",
    )?;

    let rows = stmt.query_map(params![date_str], |row| {
        Ok((row.get::<_, u32>(0)?, row.get::<_, u32>(1)?))
    })?;

    let mut intervals = vec![];
    for row in rows {
        intervals.push(row?);
    }
    Ok(intervals)
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        "SELECT id, user_id, service_id, booking_date, start_minute, status, customer_name, customer_email, checkout_ref, created_at
         FROM bookings WHERE id = ?1",
        params![id],
        |row| Ok(parse_booking_row(row)),
    );

    let mut booking = match result {
        Ok(booking) => booking?,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    booking.extra_ids = booking_extra_ids(conn, &booking.id)?;
    Ok(Some(booking))
}

fn booking_extra_ids(conn: &Connection, booking_id: &str) -> anyhow::Result<Vec<i64>> {
    let mut stmt = conn.prepare(
        "SELECT extra_id FROM booking_extras WHERE booking_id = ?1 ORDER BY extra_id ASC",
    )?;
    let rows = stmt.query_map(params![booking_id], |row| row.get::<_, i64>(0))?;

    let mut ids = vec![];
    for row in rows {
        ids.push(row?);
    }
    Ok(ids)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let date_str: String = row.get(3)?;
    let status_str: String = row.get(5)?;
    let created_at_str: String = row.get(9)?;

    let booking_date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
        .unwrap_or_else(|_| Utc::now().date_naive());
    let created_at = NaiveDateTime::parse_from_str(&created_at_str, "%Y-%m-%d %H:%M:%S")
        .unwrap_or_else(|_| Utc::now().naive_utc());

    Ok(Booking {
        id: row.get(0)?,
        user_id: row.get(1)?,
        service_id: row.get(2)?,
        extra_ids: vec![],
        booking_date,
        start_minute: row.get(4)?,
        status: BookingStatus::parse(&status_str),
        customer_name: row.get(6)?,
        customer_email: row.get(7)?,
        checkout_ref: row.get(8)?,
        created_at,
    })
}

pub fn set_booking_checkout_ref(
    conn: &Connection,
    id: &str,
    checkout_ref: &str,
) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE bookings SET checkout_ref = ?1 WHERE id = ?2",
        params![checkout_ref, id],
    )?;
    Ok(())
}

/// Returns whether any booking was flipped.
pub fn mark_booking_paid(conn: &Connection, checkout_ref: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = 'paid' WHERE checkout_ref = ?1",
        params![checkout_ref],
    )?;
    Ok(count > 0)
}

pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1 WHERE id = ?2",
        params![status.as_str(), id],
    )?;
    Ok(count > 0)
}

pub struct BookingSlot {
    pub booking_date: String,
    pub start_minute: u32,
}

pub fn bookings_for_user(conn: &Connection, user_id: &str) -> anyhow::Result<Vec<BookingSlot>> {
    let mut stmt = conn.prepare(
        "SELECT booking_date, start_minute FROM bookings
         WHERE user_id = ?1 ORDER BY booking_date ASC, start_minute ASC",
    )?;
    let rows = stmt.query_map(params![user_id], |row| {
        Ok(BookingSlot {
            booking_date: row.get(0)?,
            start_minute: row.get(1)?,
        })
    })?;

    let mut slots = vec![];
    for row in rows {
        slots.push(row?);
    }
    Ok(slots)
}

pub struct BookingSlotWithUser {
    pub username: Option<String>,
    pub booking_date: String,
    pub start_minute: u32,
}

pub fn all_bookings_with_users(conn: &Connection) -> anyhow::Result<Vec<BookingSlotWithUser>> {
    let mut stmt = conn.prepare(
        "SELECT u.username, b.booking_date, b.start_minute
         FROM bookings b
         LEFT JOIN users u ON u.id = b.user_id
         ORDER BY b.booking_date ASC, b.start_minute ASC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(BookingSlotWithUser {
            username: row.get(0)?,
            booking_date: row.get(1)?,
            start_minute: row.get(2)?,
        })
    })?;

    let mut slots = vec![];
    for row in rows {
        slots.push(row?);
    }
    Ok(slots)
}

// ── Cart ──

pub fn get_cart(conn: &Connection, token: &str) -> anyhow::Result<Vec<CartItem>> {
    let mut stmt = conn.prepare(
        "SELECT product_id, name, price_cents, quantity FROM cart_items
         WHERE session_token = ?1 ORDER BY rowid ASC",
    )?;
    let rows = stmt.query_map(params![token], |row| {
        Ok(CartItem {
            id: row.get(0)?,
            name: row.get(1)?,
            price_cents: row.get(2)?,
            quantity: row.get(3)?,
        })
    })?;

    let mut items = vec![];
    for row in rows {
        items.push(row?);
    }
    Ok(items)
}

pub fn add_cart_item(
    conn: &Connection,
    token: &str,
    product_id: &str,
    name: &str,
    price_cents: i64,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO cart_items (session_token, product_id, name, price_cents, quantity)
         VALUES (?1, ?2, ?3, ?4, 1)
         ON CONFLICT(session_token, product_id) DO UPDATE SET quantity = quantity + 1",
        params![token, product_id, name, price_cents],
    )?;
    Ok(())
}

/// Apply a quantity delta; lines that drop to zero or below disappear.
pub fn update_cart_quantity(
    conn: &Connection,
    token: &str,
    product_id: &str,
    delta: i64,
) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE cart_items SET quantity = quantity + ?1
         WHERE session_token = ?2 AND product_id = ?3",
        params![delta, token, product_id],
    )?;
    conn.execute(
        "DELETE FROM cart_items WHERE session_token = ?1 AND quantity <= 0",
        params![token],
    )?;
    Ok(())
}

pub fn remove_cart_item(conn: &Connection, token: &str, product_id: &str) -> anyhow::Result<()> {
    conn.execute(
        "DELETE FROM cart_items WHERE session_token = ?1 AND product_id = ?2",
        params![token, product_id],
    )?;
    Ok(())
}

pub fn clear_cart(conn: &Connection, token: &str) -> anyhow::Result<()> {
    conn.execute(
        "DELETE FROM cart_items WHERE session_token = ?1",
        params![token],
    )?;
    Ok(())
}

// ── Orders ──

pub fn insert_order(conn: &Connection, order: &Order) -> anyhow::Result<()> {
    let items_json = serde_json::to_string(&order.items)?;
    let created_at = order.created_at.format("%Y-%m-%d %H:%M:%S").to_string();

    conn.execute(
        "INSERT INTO orders (id, customer_name, customer_email, shipping_address, shipping_city, shipping_zip, shipping_country, items, total_cents, checkout_ref, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            order.id,
            order.customer_name,
            order.customer_email,
            order.shipping_address,
            order.shipping_city,
            order.shipping_zip,
            order.shipping_country,
            items_json,
            order.total_cents,
            order.checkout_ref,
            order.status.as_str(),
            created_at,
        ],
    )?;
    Ok(())
}

// ── Messages ──

pub fn insert_message(conn: &Connection, name: &str, email: &str, body: &str) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO messages (name, email, body) VALUES (?1, ?2, ?3)",
        params![name, email, body],
    )?;
    Ok(())
}
