use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub user_id: Option<String>,
    pub service_id: i64,
    pub extra_ids: Vec<i64>,
    pub booking_date: NaiveDate,
    pub start_minute: u32,
    pub status: BookingStatus,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub checkout_ref: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Paid,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Paid => "paid",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "paid" => BookingStatus::Paid,
            "cancelled" => BookingStatus::Cancelled,
            _ => BookingStatus::Pending,
        }
    }

    /// Only pending and paid bookings occupy their time slot; any other
    /// status is invisible to conflict detection.
    pub fn blocks_slot(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Paid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            BookingStatus::Pending,
            BookingStatus::Paid,
            BookingStatus::Cancelled,
        ] {
            assert_eq!(BookingStatus::parse(status.as_str()), status);
        }
        // Unknown strings fall back to pending, matching the schema default.
        assert_eq!(BookingStatus::parse("garbage"), BookingStatus::Pending);
    }

    #[test]
    fn test_blocking_statuses() {
        assert!(BookingStatus::Pending.blocks_slot());
        assert!(BookingStatus::Paid.blocks_slot());
        assert!(!BookingStatus::Cancelled.blocks_slot());
    }
}
