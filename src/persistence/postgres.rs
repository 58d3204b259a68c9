//! PostgreSQL implementation of the storage traits.
//!
//! Seat reservation is one guarded `UPDATE ... RETURNING`; the database
//! evaluates `seats_booked + n <= seats_total` and writes the new value in
//! the same statement. `seats_available` is a generated column. Booking
//! mutations lock the row with `SELECT ... FOR UPDATE` inside a transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgArguments, PgPoolOptions};
use sqlx::query::QueryAs;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres};

use super::models::{BOOKING_COLUMNS, BookingRow, EVENT_COLUMNS, EventRow, to_i32};
use super::{
    BookingFilter, BookingMutation, BookingStore, EventFilter, EventStore, Page, Paged,
};
use crate::domain::{Booking, BookingId, Event, EventId, EventPatch};
use crate::error::ApiError;

/// `WHERE` clause for event listings, parameters `$1..$8`.
const EVENT_FILTER: &str = "($1 OR is_active) \
    AND ($2::timestamptz IS NULL OR starts_at > $2) \
    AND ($3::text IS NULL OR city ILIKE '%' || $3 || '%') \
    AND ($4::text IS NULL OR category = $4) \
    AND ($5::bool IS NULL OR featured = $5) \
    AND ($6::text IS NULL OR title ILIKE '%' || $6 || '%' \
         OR description ILIKE '%' || $6 || '%') \
    AND ($7::bigint IS NULL OR price >= $7) \
    AND ($8::bigint IS NULL OR price <= $8)";

/// `WHERE` clause for booking listings, parameters `$1..$4`.
const BOOKING_FILTER: &str = "($1::uuid IS NULL OR user_id = $1) \
    AND ($2::uuid IS NULL OR event_id = $2) \
    AND ($3::text IS NULL OR booking_status = $3) \
    AND ($4::text IS NULL OR payment_status = $4)";

type PgQueryAs<'q, O> = QueryAs<'q, Postgres, O, PgArguments>;

fn bind_event_filter<'q, O>(query: PgQueryAs<'q, O>, filter: &'q EventFilter) -> PgQueryAs<'q, O> {
    query
        .bind(filter.include_inactive)
        .bind(filter.starts_after)
        .bind(filter.city.as_deref())
        .bind(filter.category.map(|c| c.as_str()))
        .bind(filter.featured)
        .bind(filter.search.as_deref())
        .bind(filter.min_price)
        .bind(filter.max_price)
}

fn bind_booking_filter<'q, O>(
    query: PgQueryAs<'q, O>,
    filter: &'q BookingFilter,
) -> PgQueryAs<'q, O> {
    query
        .bind(filter.user_id.map(uuid::Uuid::from))
        .bind(filter.event_id.map(uuid::Uuid::from))
        .bind(filter.booking_status.map(|s| s.as_str()))
        .bind(filter.payment_status.map(|s| s.as_str()))
}

/// PostgreSQL-backed storage using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `database_url` and runs pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Persistence`] if the connection or a migration
    /// fails.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: std::time::Duration,
    ) -> Result<Self, ApiError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| ApiError::Persistence(format!("migration failed: {e}")))?;
        Ok(Self::new(pool))
    }

    async fn fetch_event(&self, id: EventId) -> Result<Option<Event>, ApiError> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Event::try_from).transpose()
    }
}

#[async_trait]
impl EventStore for PostgresStore {
    async fn insert_event(&self, event: Event) -> Result<Event, ApiError> {
        sqlx::query(
            "INSERT INTO events (id, title, description, category, starts_at, venue, address, \
             city, state, pincode, price, seats_total, seats_booked, is_active, featured, \
             created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
        )
        .bind(event.id.as_uuid())
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.category.as_str())
        .bind(event.starts_at)
        .bind(&event.location.venue)
        .bind(&event.location.address)
        .bind(&event.location.city)
        .bind(&event.location.state)
        .bind(&event.location.pincode)
        .bind(event.price)
        .bind(to_i32(event.seats.total())?)
        .bind(to_i32(event.seats.booked())?)
        .bind(event.is_active)
        .bind(event.featured)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(event)
    }

    async fn get_event(&self, id: EventId) -> Result<Option<Event>, ApiError> {
        self.fetch_event(id).await
    }

    async fn list_events(
        &self,
        filter: &EventFilter,
        page: Page,
    ) -> Result<Paged<Event>, ApiError> {
        let (total,) = bind_event_filter(
            sqlx::query_as::<_, (i64,)>(&format!(
                "SELECT COUNT(*) FROM events WHERE {EVENT_FILTER}"
            )),
            filter,
        )
        .fetch_one(&self.pool)
        .await?;
        let rows = bind_event_filter(
            sqlx::query_as::<_, EventRow>(&format!(
                "SELECT {EVENT_COLUMNS} FROM events WHERE {EVENT_FILTER} \
                 ORDER BY starts_at ASC, id ASC LIMIT $9 OFFSET $10"
            )),
            filter,
        )
        .bind(i64::from(page.limit))
        .bind(i64::from(page.offset))
        .fetch_all(&self.pool)
        .await?;
        Ok(Paged {
            items: rows
                .into_iter()
                .map(Event::try_from)
                .collect::<Result<_, _>>()?,
            total: u64::try_from(total).unwrap_or_default(),
        })
    }

    async fn update_event(
        &self,
        id: EventId,
        patch: EventPatch,
        now: DateTime<Utc>,
    ) -> Result<Event, ApiError> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ApiError::EventNotFound)?;
        let mut event = Event::try_from(row)?;
        event.apply(patch, now)?;

        sqlx::query(
            "UPDATE events SET title = $2, description = $3, category = $4, starts_at = $5, \
             venue = $6, address = $7, city = $8, state = $9, pincode = $10, price = $11, \
             seats_total = $12, is_active = $13, featured = $14, updated_at = $15 \
             WHERE id = $1",
        )
        .bind(event.id.as_uuid())
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.category.as_str())
        .bind(event.starts_at)
        .bind(&event.location.venue)
        .bind(&event.location.address)
        .bind(&event.location.city)
        .bind(&event.location.state)
        .bind(&event.location.pincode)
        .bind(event.price)
        .bind(to_i32(event.seats.total())?)
        .bind(event.is_active)
        .bind(event.featured)
        .bind(event.updated_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(event)
    }

    async fn reserve_seats(
        &self,
        id: EventId,
        count: u32,
        now: DateTime<Utc>,
    ) -> Result<Event, ApiError> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "UPDATE events SET seats_booked = seats_booked + $2, updated_at = $3 \
             WHERE id = $1 AND is_active AND starts_at > $3 \
               AND seats_booked + $2 <= seats_total \
             RETURNING {EVENT_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(to_i32(count)?)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Event::try_from(row);
        }

        // Nothing was written; classify why from a plain read.
        let Some(mut event) = self.fetch_event(id).await? else {
            return Err(ApiError::EventNotFound);
        };
        match event.reserve(count, now) {
            Err(err) => Err(err),
            Ok(()) => Err(ApiError::Internal(format!(
                "seat reservation for event {id} was not applied"
            ))),
        }
    }

    async fn release_seats(&self, id: EventId, count: u32) -> Result<Event, ApiError> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "UPDATE events SET seats_booked = GREATEST(seats_booked - $2, 0), updated_at = now() \
             WHERE id = $1 RETURNING {EVENT_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(to_i32(count)?)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ApiError::EventNotFound)?;
        Event::try_from(row)
    }
}

#[async_trait]
impl BookingStore for PostgresStore {
    async fn insert_booking(&self, booking: Booking) -> Result<Booking, ApiError> {
        sqlx::query(
            "INSERT INTO bookings (id, user_id, event_id, tickets_booked, total_amount, \
             payment_status, booking_status, payment_details, attendee_details, \
             special_requests, qr_code, refund, seats_released, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(booking.id.as_uuid())
        .bind(booking.user_id.as_uuid())
        .bind(booking.event_id.as_uuid())
        .bind(to_i32(booking.tickets_booked)?)
        .bind(booking.total_amount)
        .bind(booking.payment_status.as_str())
        .bind(booking.booking_status.as_str())
        .bind(Json(&booking.payment_details))
        .bind(Json(&booking.attendee_details))
        .bind(booking.special_requests.as_deref())
        .bind(booking.qr_code.as_deref())
        .bind(booking.refund.as_ref().map(Json))
        .bind(booking.seats_released)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(booking)
    }

    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>, ApiError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Booking::try_from).transpose()
    }

    async fn list_bookings(
        &self,
        filter: &BookingFilter,
        page: Page,
    ) -> Result<Paged<Booking>, ApiError> {
        let (total,) = bind_booking_filter(
            sqlx::query_as::<_, (i64,)>(&format!(
                "SELECT COUNT(*) FROM bookings WHERE {BOOKING_FILTER}"
            )),
            filter,
        )
        .fetch_one(&self.pool)
        .await?;
        let rows = bind_booking_filter(
            sqlx::query_as::<_, BookingRow>(&format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings WHERE {BOOKING_FILTER} \
                 ORDER BY created_at DESC, id ASC LIMIT $5 OFFSET $6"
            )),
            filter,
        )
        .bind(i64::from(page.limit))
        .bind(i64::from(page.offset))
        .fetch_all(&self.pool)
        .await?;
        Ok(Paged {
            items: rows
                .into_iter()
                .map(Booking::try_from)
                .collect::<Result<_, _>>()?,
            total: u64::try_from(total).unwrap_or_default(),
        })
    }

    async fn revenue(&self, filter: &BookingFilter) -> Result<i64, ApiError> {
        let (sum,) = bind_booking_filter(
            sqlx::query_as::<_, (i64,)>(&format!(
                "SELECT COALESCE(SUM(total_amount), 0)::bigint FROM bookings \
                 WHERE {BOOKING_FILTER}"
            )),
            filter,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(sum)
    }

    async fn update_booking(
        &self,
        id: BookingId,
        mutation: BookingMutation,
    ) -> Result<Booking, ApiError> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ApiError::BookingNotFound)?;
        let mut booking = Booking::try_from(row)?;
        mutation(&mut booking)?;
        booking.updated_at = Utc::now();

        sqlx::query(
            "UPDATE bookings SET payment_status = $2, booking_status = $3, \
             payment_details = $4, attendee_details = $5, special_requests = $6, \
             qr_code = $7, refund = $8, updated_at = $9 \
             WHERE id = $1",
        )
        .bind(booking.id.as_uuid())
        .bind(booking.payment_status.as_str())
        .bind(booking.booking_status.as_str())
        .bind(Json(&booking.payment_details))
        .bind(Json(&booking.attendee_details))
        .bind(booking.special_requests.as_deref())
        .bind(booking.qr_code.as_deref())
        .bind(booking.refund.as_ref().map(Json))
        .bind(booking.updated_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(booking)
    }

    async fn claim_seat_release(&self, id: BookingId) -> Result<bool, ApiError> {
        let claimed = sqlx::query_scalar::<_, uuid::Uuid>(
            "UPDATE bookings SET seats_released = TRUE, updated_at = now() \
             WHERE id = $1 AND seats_released = FALSE RETURNING id",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        if claimed.is_some() {
            return Ok(true);
        }
        let exists = sqlx::query_scalar::<_, uuid::Uuid>("SELECT id FROM bookings WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_some() {
            Ok(false)
        } else {
            Err(ApiError::BookingNotFound)
        }
    }

    async fn revert_seat_release(&self, id: BookingId) -> Result<(), ApiError> {
        let result = sqlx::query(
            "UPDATE bookings SET seats_released = FALSE, updated_at = now() WHERE id = $1",
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::BookingNotFound);
        }
        Ok(())
    }
}
