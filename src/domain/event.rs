//! Event records and their seat inventory.
//!
//! [`SeatInventory`] owns the `total`/`booked` counters and recomputes
//! `available` on every mutation, so the three never drift apart.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::EventId;
use crate::error::ApiError;

const MAX_TITLE_LEN: usize = 100;
const MAX_DESCRIPTION_LEN: usize = 2000;

/// Seat counters for one event.
///
/// Invariant: `0 <= booked <= total` and `available == total - booked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeatInventory {
    total: u32,
    booked: u32,
    available: u32,
}

impl SeatInventory {
    /// Builds an inventory from stored counters.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRequest`] if `total` is zero or `booked`
    /// exceeds `total`.
    pub fn new(total: u32, booked: u32) -> Result<Self, ApiError> {
        if total == 0 {
            return Err(ApiError::InvalidRequest(
                "total seats must be at least 1".to_string(),
            ));
        }
        if booked > total {
            return Err(ApiError::InvalidRequest(format!(
                "booked seats ({booked}) exceed total seats ({total})"
            )));
        }
        Ok(Self {
            total,
            booked,
            available: total - booked,
        })
    }

    /// Total seats offered for the event.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.total
    }

    /// Seats currently held or sold.
    #[must_use]
    pub const fn booked(&self) -> u32 {
        self.booked
    }

    /// Seats still open for reservation.
    #[must_use]
    pub const fn available(&self) -> u32 {
        self.available
    }

    /// Takes `count` seats.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InsufficientSeats`] if fewer than `count` seats
    /// remain. The inventory is unchanged on error.
    pub fn reserve(&mut self, count: u32) -> Result<(), ApiError> {
        if count > self.available {
            return Err(ApiError::InsufficientSeats {
                requested: count,
                available: self.available,
            });
        }
        self.booked += count;
        self.recompute();
        Ok(())
    }

    /// Returns `count` seats to the pool, clamping `booked` at zero.
    pub fn release(&mut self, count: u32) {
        self.booked = self.booked.saturating_sub(count);
        self.recompute();
    }

    /// Changes the total seat count.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRequest`] if the new total is zero or
    /// smaller than the seats already booked.
    pub fn resize(&mut self, total: u32) -> Result<(), ApiError> {
        *self = Self::new(total, self.booked)?;
        Ok(())
    }

    fn recompute(&mut self) {
        self.available = self.total - self.booked;
    }
}

/// Fixed event categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum EventCategory {
    /// Concerts and gigs.
    Music,
    /// Conferences and meetups.
    Technology,
    /// Exhibitions and workshops.
    Art,
    /// Networking and summits.
    Business,
    /// Food festivals and tastings.
    Food,
    /// Matches and tournaments.
    Sports,
    /// Wellness sessions.
    Health,
    /// Classes and lectures.
    Education,
    /// Tours and trips.
    Travel,
    /// Shows and comedy.
    Entertainment,
}

impl EventCategory {
    /// Returns the canonical name of the category.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Music => "Music",
            Self::Technology => "Technology",
            Self::Art => "Art",
            Self::Business => "Business",
            Self::Food => "Food",
            Self::Sports => "Sports",
            Self::Health => "Health",
            Self::Education => "Education",
            Self::Travel => "Travel",
            Self::Entertainment => "Entertainment",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventCategory {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Music" => Ok(Self::Music),
            "Technology" => Ok(Self::Technology),
            "Art" => Ok(Self::Art),
            "Business" => Ok(Self::Business),
            "Food" => Ok(Self::Food),
            "Sports" => Ok(Self::Sports),
            "Health" => Ok(Self::Health),
            "Education" => Ok(Self::Education),
            "Travel" => Ok(Self::Travel),
            "Entertainment" => Ok(Self::Entertainment),
            other => Err(ApiError::InvalidRequest(format!("unknown category: {other}"))),
        }
    }
}

/// Where an event takes place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Location {
    /// Venue name.
    pub venue: String,
    /// Street address.
    pub address: String,
    /// City.
    pub city: String,
    /// State or region.
    pub state: String,
    /// Postal code.
    pub pincode: String,
}

/// An event offered for booking.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Event identifier.
    pub id: EventId,
    /// Short title.
    pub title: String,
    /// Long description.
    pub description: String,
    /// Category.
    pub category: EventCategory,
    /// Start of the event.
    pub starts_at: DateTime<Utc>,
    /// Venue and address.
    pub location: Location,
    /// Ticket price in minor currency units.
    pub price: i64,
    /// Seat counters.
    pub seats: SeatInventory,
    /// `false` once the event has been soft-deleted.
    pub is_active: bool,
    /// Highlighted on listings.
    pub featured: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// `true` when no seat is left.
    #[must_use]
    pub const fn is_sold_out(&self) -> bool {
        self.seats.available() == 0
    }

    /// `true` once the event start time is at or before `now`.
    #[must_use]
    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.starts_at <= now
    }

    /// Checks that the event can take a reservation of `count` seats at
    /// `now` and takes them.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::EventNotFound`] for inactive events,
    /// [`ApiError::EventExpired`] for started events and
    /// [`ApiError::InsufficientSeats`] when capacity is short.
    pub fn reserve(&mut self, count: u32, now: DateTime<Utc>) -> Result<(), ApiError> {
        if !self.is_active {
            return Err(ApiError::EventNotFound);
        }
        if self.has_started(now) {
            return Err(ApiError::EventExpired);
        }
        self.seats.reserve(count)?;
        self.updated_at = now;
        Ok(())
    }

    /// Applies an admin patch, recomputing derived seat counters.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRequest`] when a patched field is invalid.
    pub fn apply(&mut self, patch: EventPatch, now: DateTime<Utc>) -> Result<(), ApiError> {
        if let Some(title) = patch.title {
            validate_title(&title)?;
            self.title = title;
        }
        if let Some(description) = patch.description {
            validate_description(&description)?;
            self.description = description;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(starts_at) = patch.starts_at {
            self.starts_at = starts_at;
        }
        if let Some(location) = patch.location {
            self.location = location;
        }
        if let Some(price) = patch.price {
            validate_price(price)?;
            self.price = price;
        }
        if let Some(total) = patch.seats_total {
            self.seats.resize(total)?;
        }
        if let Some(featured) = patch.featured {
            self.featured = featured;
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
        self.updated_at = now;
        Ok(())
    }
}

/// Validated input for creating an event.
#[derive(Debug, Clone)]
pub struct NewEvent {
    /// Short title.
    pub title: String,
    /// Long description.
    pub description: String,
    /// Category.
    pub category: EventCategory,
    /// Start of the event.
    pub starts_at: DateTime<Utc>,
    /// Venue and address.
    pub location: Location,
    /// Ticket price in minor currency units.
    pub price: i64,
    /// Total seats offered.
    pub seats_total: u32,
    /// Highlighted on listings.
    pub featured: bool,
}

impl NewEvent {
    /// Validates the input and builds an active [`Event`] with no seats booked.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRequest`] for an over-long title or
    /// description, a start time not in the future, a negative price or a
    /// zero seat count.
    pub fn into_event(self, now: DateTime<Utc>) -> Result<Event, ApiError> {
        validate_title(&self.title)?;
        validate_description(&self.description)?;
        validate_price(self.price)?;
        if self.starts_at <= now {
            return Err(ApiError::InvalidRequest(
                "event date must be in the future".to_string(),
            ));
        }
        Ok(Event {
            id: EventId::new(),
            title: self.title,
            description: self.description,
            category: self.category,
            starts_at: self.starts_at,
            location: self.location,
            price: self.price,
            seats: SeatInventory::new(self.seats_total, 0)?,
            is_active: true,
            featured: self.featured,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update of an event. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct EventPatch {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New category.
    pub category: Option<EventCategory>,
    /// New start time.
    pub starts_at: Option<DateTime<Utc>>,
    /// New location.
    pub location: Option<Location>,
    /// New price in minor units.
    pub price: Option<i64>,
    /// New total seat count.
    pub seats_total: Option<u32>,
    /// New featured flag.
    pub featured: Option<bool>,
    /// New active flag.
    pub is_active: Option<bool>,
}

fn validate_title(title: &str) -> Result<(), ApiError> {
    let trimmed = title.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_TITLE_LEN {
        return Err(ApiError::InvalidRequest(format!(
            "title must be 1-{MAX_TITLE_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), ApiError> {
    if description.trim().is_empty() || description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ApiError::InvalidRequest(format!(
            "description must be 1-{MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_price(price: i64) -> Result<(), ApiError> {
    if price < 0 {
        return Err(ApiError::InvalidRequest(
            "price cannot be negative".to_string(),
        ));
    }
    Ok(())
}
