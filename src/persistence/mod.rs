//! Persistence layer: event inventory and booking ledger storage.
//!
//! Services talk to storage through [`EventStore`] and [`BookingStore`].
//! Every mutating method is a single atomic read-modify-write on one
//! record: the in-memory backend holds the record's write lock for the
//! whole operation, the PostgreSQL backend uses guarded `UPDATE`s and
//! row locks. Application code never reads a counter and writes it back
//! in two steps.

pub mod memory;
pub mod models;
pub mod postgres;

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Booking, BookingId, BookingStatus, Event, EventCategory, EventId, EventPatch, PaymentStatus,
    UserId,
};
use crate::error::ApiError;

pub use memory::{MemoryBookingStore, MemoryEventStore};
pub use postgres::PostgresStore;

/// Mutation applied to a booking under its row lock.
///
/// Returning an error aborts the update and leaves the booking unchanged.
pub type BookingMutation = Box<dyn FnOnce(&mut Booking) -> Result<(), ApiError> + Send>;

/// Filters for event listings. `None` means "don't filter".
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Include soft-deleted events.
    pub include_inactive: bool,
    /// Only events starting after this instant.
    pub starts_after: Option<DateTime<Utc>>,
    /// Case-insensitive substring of the city.
    pub city: Option<String>,
    /// Exact category.
    pub category: Option<EventCategory>,
    /// Featured flag.
    pub featured: Option<bool>,
    /// Case-insensitive substring of title or description.
    pub search: Option<String>,
    /// Minimum price in minor units.
    pub min_price: Option<i64>,
    /// Maximum price in minor units.
    pub max_price: Option<i64>,
}

impl EventFilter {
    /// Returns `true` if `event` passes every set filter.
    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        if !self.include_inactive && !event.is_active {
            return false;
        }
        if let Some(after) = self.starts_after
            && event.starts_at <= after
        {
            return false;
        }
        if let Some(city) = &self.city
            && !contains_ignore_case(&event.location.city, city)
        {
            return false;
        }
        if let Some(category) = self.category
            && event.category != category
        {
            return false;
        }
        if let Some(featured) = self.featured
            && event.featured != featured
        {
            return false;
        }
        if let Some(search) = &self.search
            && !contains_ignore_case(&event.title, search)
            && !contains_ignore_case(&event.description, search)
        {
            return false;
        }
        if self.min_price.is_some_and(|min| event.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| event.price > max) {
            return false;
        }
        true
    }
}

/// Filters for booking listings. `None` means "don't filter".
#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    /// Owner.
    pub user_id: Option<UserId>,
    /// Booked event.
    pub event_id: Option<EventId>,
    /// Booking state.
    pub booking_status: Option<BookingStatus>,
    /// Payment state.
    pub payment_status: Option<PaymentStatus>,
}

impl BookingFilter {
    /// Returns `true` if `booking` passes every set filter.
    #[must_use]
    pub fn matches(&self, booking: &Booking) -> bool {
        self.user_id.is_none_or(|id| booking.user_id == id)
            && self.event_id.is_none_or(|id| booking.event_id == id)
            && self
                .booking_status
                .is_none_or(|status| booking.booking_status == status)
            && self
                .payment_status
                .is_none_or(|status| booking.payment_status == status)
    }
}

/// Window of a listing: skip `offset` rows, return at most `limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Rows to skip.
    pub offset: u32,
    /// Maximum rows to return.
    pub limit: u32,
}

impl Page {
    /// Every row.
    pub const ALL: Self = Self {
        offset: 0,
        limit: u32::MAX,
    };

    /// Cuts the window out of rows that are already filtered and sorted.
    #[must_use]
    pub fn slice<T>(self, items: Vec<T>) -> Paged<T> {
        let total = items.len() as u64;
        let items = items
            .into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect();
        Paged { items, total }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::ALL
    }
}

/// One window of a listing plus the number of rows matching the filter.
#[derive(Debug, Clone)]
pub struct Paged<T> {
    /// Rows inside the window.
    pub items: Vec<T>,
    /// Matching rows across all windows.
    pub total: u64,
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Event inventory storage.
#[async_trait]
pub trait EventStore: Send + Sync + Debug {
    /// Stores a new event.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Persistence`] on storage failure.
    async fn insert_event(&self, event: Event) -> Result<Event, ApiError>;

    /// Loads an event, active or not.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Persistence`] on storage failure.
    async fn get_event(&self, id: EventId) -> Result<Option<Event>, ApiError>;

    /// Lists one window of matching events ordered by start time.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Persistence`] on storage failure.
    async fn list_events(
        &self,
        filter: &EventFilter,
        page: Page,
    ) -> Result<Paged<Event>, ApiError>;

    /// Applies an admin patch atomically.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::EventNotFound`] if the event is missing, or the
    /// validation error raised by the patch.
    async fn update_event(
        &self,
        id: EventId,
        patch: EventPatch,
        now: DateTime<Utc>,
    ) -> Result<Event, ApiError>;

    /// Atomically takes `count` seats from an active, upcoming event.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::EventNotFound`] for missing or inactive events,
    /// [`ApiError::EventExpired`] if the event has started and
    /// [`ApiError::InsufficientSeats`] if capacity is short.
    async fn reserve_seats(
        &self,
        id: EventId,
        count: u32,
        now: DateTime<Utc>,
    ) -> Result<Event, ApiError>;

    /// Atomically hands `count` seats back, clamping at zero booked.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::EventNotFound`] if the event is missing.
    async fn release_seats(&self, id: EventId, count: u32) -> Result<Event, ApiError>;
}

/// Booking ledger storage.
#[async_trait]
pub trait BookingStore: Send + Sync + Debug {
    /// Stores a new booking.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Persistence`] on storage failure.
    async fn insert_booking(&self, booking: Booking) -> Result<Booking, ApiError>;

    /// Loads a booking.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Persistence`] on storage failure.
    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>, ApiError>;

    /// Lists one window of matching bookings, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Persistence`] on storage failure.
    async fn list_bookings(
        &self,
        filter: &BookingFilter,
        page: Page,
    ) -> Result<Paged<Booking>, ApiError>;

    /// Sums `total_amount` over every matching booking, in minor units.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Persistence`] on storage failure.
    async fn revenue(&self, filter: &BookingFilter) -> Result<i64, ApiError>;

    /// Runs `mutation` against the booking while holding its lock and
    /// stores the result.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::BookingNotFound`] if the booking is missing, or
    /// whatever the mutation returns.
    async fn update_booking(
        &self,
        id: BookingId,
        mutation: BookingMutation,
    ) -> Result<Booking, ApiError>;

    /// Flips `seats_released` from `false` to `true`.
    ///
    /// Returns `true` only for the single caller that performed the flip,
    /// which is then responsible for releasing the seats.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::BookingNotFound`] if the booking is missing.
    async fn claim_seat_release(&self, id: BookingId) -> Result<bool, ApiError>;

    /// Resets `seats_released` to `false` after a claimed release could not
    /// be applied to the event, so a later call can release the seats.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::BookingNotFound`] if the booking is missing.
    async fn revert_seat_release(&self, id: BookingId) -> Result<(), ApiError>;
}
