//! In-memory storage with per-record fine-grained locking.
//!
//! Each store keeps a `RwLock<HashMap<..>>` whose values are individually
//! protected by a [`tokio::sync::RwLock`]. Reads of the same record run
//! concurrently, writes to different records run concurrently, and writes
//! to the same record are serialized, so every check-then-mutate happens
//! under one write guard.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{
    BookingFilter, BookingMutation, BookingStore, EventFilter, EventStore, Page, Paged,
};
use crate::domain::{Booking, BookingId, Event, EventId, EventPatch};
use crate::error::ApiError;

/// In-memory [`EventStore`].
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    events: RwLock<HashMap<EventId, Arc<RwLock<Event>>>>,
}

impl MemoryEventStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn entry(&self, id: EventId) -> Result<Arc<RwLock<Event>>, ApiError> {
        let map = self.events.read().await;
        map.get(&id).cloned().ok_or(ApiError::EventNotFound)
    }

    /// Returns the number of stored events.
    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    /// Returns `true` if no event is stored.
    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn insert_event(&self, event: Event) -> Result<Event, ApiError> {
        let mut map = self.events.write().await;
        if map.contains_key(&event.id) {
            return Err(ApiError::InvalidRequest(format!(
                "event {} already exists",
                event.id
            )));
        }
        map.insert(event.id, Arc::new(RwLock::new(event.clone())));
        Ok(event)
    }

    async fn get_event(&self, id: EventId) -> Result<Option<Event>, ApiError> {
        let map = self.events.read().await;
        match map.get(&id) {
            Some(entry) => Ok(Some(entry.read().await.clone())),
            None => Ok(None),
        }
    }

    async fn list_events(
        &self,
        filter: &EventFilter,
        page: Page,
    ) -> Result<Paged<Event>, ApiError> {
        let map = self.events.read().await;
        let mut events = Vec::with_capacity(map.len());
        for entry in map.values() {
            let event = entry.read().await;
            if filter.matches(&event) {
                events.push(event.clone());
            }
        }
        events.sort_by_key(|event| event.starts_at);
        Ok(page.slice(events))
    }

    async fn update_event(
        &self,
        id: EventId,
        patch: EventPatch,
        now: DateTime<Utc>,
    ) -> Result<Event, ApiError> {
        let entry = self.entry(id).await?;
        let mut event = entry.write().await;
        let mut updated = event.clone();
        updated.apply(patch, now)?;
        *event = updated.clone();
        Ok(updated)
    }

    async fn reserve_seats(
        &self,
        id: EventId,
        count: u32,
        now: DateTime<Utc>,
    ) -> Result<Event, ApiError> {
        let entry = self.entry(id).await?;
        let mut event = entry.write().await;
        event.reserve(count, now)?;
        Ok(event.clone())
    }

    async fn release_seats(&self, id: EventId, count: u32) -> Result<Event, ApiError> {
        let entry = self.entry(id).await?;
        let mut event = entry.write().await;
        event.seats.release(count);
        event.updated_at = Utc::now();
        Ok(event.clone())
    }
}

/// In-memory [`BookingStore`].
#[derive(Debug, Default)]
pub struct MemoryBookingStore {
    bookings: RwLock<HashMap<BookingId, Arc<RwLock<Booking>>>>,
}

impl MemoryBookingStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn entry(&self, id: BookingId) -> Result<Arc<RwLock<Booking>>, ApiError> {
        let map = self.bookings.read().await;
        map.get(&id).cloned().ok_or(ApiError::BookingNotFound)
    }
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
    async fn insert_booking(&self, booking: Booking) -> Result<Booking, ApiError> {
        let mut map = self.bookings.write().await;
        if map.contains_key(&booking.id) {
            return Err(ApiError::InvalidRequest(format!(
                "booking {} already exists",
                booking.id
            )));
        }
        map.insert(booking.id, Arc::new(RwLock::new(booking.clone())));
        Ok(booking)
    }

    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>, ApiError> {
        let map = self.bookings.read().await;
        match map.get(&id) {
            Some(entry) => Ok(Some(entry.read().await.clone())),
            None => Ok(None),
        }
    }

    async fn list_bookings(
        &self,
        filter: &BookingFilter,
        page: Page,
    ) -> Result<Paged<Booking>, ApiError> {
        let map = self.bookings.read().await;
        let mut bookings = Vec::new();
        for entry in map.values() {
            let booking = entry.read().await;
            if filter.matches(&booking) {
                bookings.push(booking.clone());
            }
        }
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page.slice(bookings))
    }

    async fn revenue(&self, filter: &BookingFilter) -> Result<i64, ApiError> {
        let map = self.bookings.read().await;
        let mut total = 0_i64;
        for entry in map.values() {
            let booking = entry.read().await;
            if filter.matches(&booking) {
                total = total.saturating_add(booking.total_amount);
            }
        }
        Ok(total)
    }

    async fn update_booking(
        &self,
        id: BookingId,
        mutation: BookingMutation,
    ) -> Result<Booking, ApiError> {
        let entry = self.entry(id).await?;
        let mut booking = entry.write().await;
        let mut updated = booking.clone();
        mutation(&mut updated)?;
        updated.updated_at = Utc::now();
        *booking = updated.clone();
        Ok(updated)
    }

    async fn claim_seat_release(&self, id: BookingId) -> Result<bool, ApiError> {
        let entry = self.entry(id).await?;
        let mut booking = entry.write().await;
        if booking.seats_released {
            return Ok(false);
        }
        booking.seats_released = true;
        booking.updated_at = Utc::now();
        Ok(true)
    }

    async fn revert_seat_release(&self, id: BookingId) -> Result<(), ApiError> {
        let entry = self.entry(id).await?;
        let mut booking = entry.write().await;
        booking.seats_released = false;
        booking.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::domain::event::tests::sample_event;
    use crate::domain::{BookingRequest, UserId};

    #[tokio::test]
    async fn insert_and_get_event() {
        let store = MemoryEventStore::new();
        let event = sample_event(5, 100, Duration::days(5));
        let id = event.id;
        assert!(store.insert_event(event).await.is_ok());
        assert_eq!(store.len().await, 1);

        let Ok(Some(fetched)) = store.get_event(id).await else {
            panic!("event missing");
        };
        assert_eq!(fetched.id, id);
        assert!(matches!(store.get_event(EventId::new()).await, Ok(None)));
    }

    #[tokio::test]
    async fn reserve_missing_event_is_not_found() {
        let store = MemoryEventStore::new();
        assert!(matches!(
            store.reserve_seats(EventId::new(), 1, Utc::now()).await,
            Err(ApiError::EventNotFound)
        ));
    }

    #[tokio::test]
    async fn concurrent_reservations_never_oversell() {
        let store = Arc::new(MemoryEventStore::new());
        let event = sample_event(10, 100, Duration::days(5));
        let id = event.id;
        let _ = store.insert_event(event).await;

        let mut handles = Vec::new();
        for _ in 0..25 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.reserve_seats(id, 1, Utc::now()).await.is_ok()
            }));
        }
        let mut succeeded = 0;
        for handle in handles {
            if matches!(handle.await, Ok(true)) {
                succeeded += 1;
            }
        }
        assert_eq!(succeeded, 10);

        let Ok(Some(event)) = store.get_event(id).await else {
            panic!("event missing");
        };
        assert_eq!(event.seats.booked(), 10);
        assert_eq!(event.seats.available(), 0);
    }

    #[tokio::test]
    async fn release_clamps_at_zero() {
        let store = MemoryEventStore::new();
        let event = sample_event(5, 100, Duration::days(5));
        let id = event.id;
        let _ = store.insert_event(event).await;
        let _ = store.reserve_seats(id, 2, Utc::now()).await;

        let Ok(event) = store.release_seats(id, 5).await else {
            panic!("release failed");
        };
        assert_eq!(event.seats.booked(), 0);
        assert_eq!(event.seats.available(), 5);
    }

    #[tokio::test]
    async fn list_filters_and_sorts() {
        let store = MemoryEventStore::new();
        let later = sample_event(5, 100, Duration::days(9));
        let sooner = sample_event(5, 900, Duration::days(2));
        let mut hidden = sample_event(5, 100, Duration::days(4));
        hidden.is_active = false;
        let sooner_id = sooner.id;
        let _ = store.insert_event(later).await;
        let _ = store.insert_event(sooner).await;
        let _ = store.insert_event(hidden).await;

        let Ok(all) = store.list_events(&EventFilter::default(), Page::ALL).await else {
            panic!("list failed");
        };
        assert_eq!(all.total, 2);
        assert_eq!(all.items.first().map(|e| e.id), Some(sooner_id));

        let second = Page {
            offset: 1,
            limit: 1,
        };
        let Ok(window) = store.list_events(&EventFilter::default(), second).await else {
            panic!("list failed");
        };
        assert_eq!(window.total, 2);
        assert_eq!(window.items.len(), 1);
        assert_ne!(window.items.first().map(|e| e.id), Some(sooner_id));

        let cheap = EventFilter {
            max_price: Some(500),
            ..EventFilter::default()
        };
        let Ok(cheap) = store.list_events(&cheap, Page::ALL).await else {
            panic!("list failed");
        };
        assert_eq!(cheap.items.len(), 1);
    }

    #[tokio::test]
    async fn failed_mutation_leaves_booking_untouched() {
        let store = MemoryBookingStore::new();
        let event = sample_event(5, 100, Duration::days(5));
        let request = BookingRequest {
            event_id: event.id,
            tickets_booked: 1,
            attendee_details: Vec::new(),
            special_requests: None,
        };
        let booking = Booking::new(UserId::new(), &event, request, Utc::now());
        let id = booking.id;
        let _ = store.insert_booking(booking).await;

        let result = store
            .update_booking(
                id,
                Box::new(|b| {
                    b.qr_code = Some("x".to_string());
                    Err(ApiError::AlreadyPaid)
                }),
            )
            .await;
        assert!(result.is_err());
        let Ok(Some(stored)) = store.get_booking(id).await else {
            panic!("booking missing");
        };
        assert!(stored.qr_code.is_none());
    }

    #[tokio::test]
    async fn seat_release_is_claimed_once() {
        let store = MemoryBookingStore::new();
        let event = sample_event(5, 100, Duration::days(5));
        let request = BookingRequest {
            event_id: event.id,
            tickets_booked: 1,
            attendee_details: Vec::new(),
            special_requests: None,
        };
        let booking = Booking::new(UserId::new(), &event, request, Utc::now());
        let id = booking.id;
        let _ = store.insert_booking(booking).await;

        assert!(matches!(store.claim_seat_release(id).await, Ok(true)));
        assert!(matches!(store.claim_seat_release(id).await, Ok(false)));
        assert!(matches!(
            store.claim_seat_release(BookingId::new()).await,
            Err(ApiError::BookingNotFound)
        ));
    }
}
