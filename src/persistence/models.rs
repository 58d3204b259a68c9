//! Database row models for events and bookings.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use crate::domain::{
    Attendee, Booking, BookingId, Event, EventId, Location, PaymentDetails, RefundRecord,
    SeatInventory, UserId,
};
use crate::error::ApiError;

/// Column list shared by every event query.
pub const EVENT_COLUMNS: &str = "id, title, description, category, starts_at, venue, address, \
     city, state, pincode, price, seats_total, seats_booked, is_active, featured, created_at, \
     updated_at";

/// Column list shared by every booking query.
pub const BOOKING_COLUMNS: &str = "id, user_id, event_id, tickets_booked, total_amount, \
     payment_status, booking_status, payment_details, attendee_details, special_requests, \
     qr_code, refund, seats_released, created_at, updated_at";

/// A row from the `events` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    /// Primary key.
    pub id: Uuid,
    /// Title.
    pub title: String,
    /// Description.
    pub description: String,
    /// Category name.
    pub category: String,
    /// Start time.
    pub starts_at: DateTime<Utc>,
    /// Venue.
    pub venue: String,
    /// Street address.
    pub address: String,
    /// City.
    pub city: String,
    /// State.
    pub state: String,
    /// Postal code.
    pub pincode: String,
    /// Price in minor units.
    pub price: i64,
    /// Total seats.
    pub seats_total: i32,
    /// Booked seats.
    pub seats_booked: i32,
    /// Soft-delete flag.
    pub is_active: bool,
    /// Featured flag.
    pub featured: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = ApiError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let total = to_u32(row.seats_total, "seats_total")?;
        let booked = to_u32(row.seats_booked, "seats_booked")?;
        Ok(Self {
            id: EventId::from_uuid(row.id),
            title: row.title,
            description: row.description,
            category: row.category.parse()?,
            starts_at: row.starts_at,
            location: Location {
                venue: row.venue,
                address: row.address,
                city: row.city,
                state: row.state,
                pincode: row.pincode,
            },
            price: row.price,
            seats: SeatInventory::new(total, booked)
                .map_err(|e| ApiError::Persistence(format!("corrupt seat counters: {e}")))?,
            is_active: row.is_active,
            featured: row.featured,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// A row from the `bookings` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BookingRow {
    /// Primary key.
    pub id: Uuid,
    /// Owner.
    pub user_id: Uuid,
    /// Booked event.
    pub event_id: Uuid,
    /// Ticket count.
    pub tickets_booked: i32,
    /// Total in minor units.
    pub total_amount: i64,
    /// Payment status text.
    pub payment_status: String,
    /// Booking status text.
    pub booking_status: String,
    /// Gateway references.
    pub payment_details: Json<PaymentDetails>,
    /// Attendee list.
    pub attendee_details: Json<Vec<Attendee>>,
    /// Special requests.
    pub special_requests: Option<String>,
    /// Ticket token.
    pub qr_code: Option<String>,
    /// Refund record.
    pub refund: Option<Json<RefundRecord>>,
    /// Seat release flag.
    pub seats_released: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = ApiError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: BookingId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            event_id: EventId::from_uuid(row.event_id),
            tickets_booked: to_u32(row.tickets_booked, "tickets_booked")?,
            total_amount: row.total_amount,
            payment_status: row.payment_status.parse()?,
            booking_status: row.booking_status.parse()?,
            payment_details: row.payment_details.0,
            attendee_details: row.attendee_details.0,
            special_requests: row.special_requests,
            qr_code: row.qr_code,
            refund: row.refund.map(|json| json.0),
            seats_released: row.seats_released,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn to_u32(value: i32, column: &str) -> Result<u32, ApiError> {
    u32::try_from(value)
        .map_err(|_| ApiError::Persistence(format!("negative value in column {column}")))
}

/// Converts a seat or ticket count to the database integer type.
///
/// # Errors
///
/// Returns [`ApiError::InvalidRequest`] for counts above `i32::MAX`.
pub fn to_i32(value: u32) -> Result<i32, ApiError> {
    i32::try_from(value).map_err(|_| ApiError::InvalidRequest(format!("count {value} too large")))
}
