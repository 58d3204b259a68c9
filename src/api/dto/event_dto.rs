//! Event DTOs for admin management and public browsing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::common_dto::{PaginationMeta, PaginationParams};
use crate::domain::{Event, EventCategory, EventPatch, Location, NewEvent};
use crate::persistence::EventFilter;

/// Request body for `POST /events`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    /// Title (max 100 chars).
    pub title: String,
    /// Description (max 2000 chars).
    pub description: String,
    /// Category.
    pub category: EventCategory,
    /// Start time; must be in the future.
    #[serde(alias = "startsAt")]
    pub date: DateTime<Utc>,
    /// Venue and address.
    pub location: Location,
    /// Ticket price in minor units.
    pub price: i64,
    /// Total seats offered.
    pub total_seats: u32,
    /// Highlighted on listings.
    #[serde(default)]
    pub featured: bool,
}

impl From<CreateEventRequest> for NewEvent {
    fn from(req: CreateEventRequest) -> Self {
        Self {
            title: req.title,
            description: req.description,
            category: req.category,
            starts_at: req.date,
            location: req.location,
            price: req.price,
            seats_total: req.total_seats,
            featured: req.featured,
        }
    }
}

/// Request body for `PUT /events/{id}`. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New category.
    pub category: Option<EventCategory>,
    /// New start time.
    #[serde(alias = "startsAt")]
    pub date: Option<DateTime<Utc>>,
    /// New location.
    pub location: Option<Location>,
    /// New price in minor units.
    pub price: Option<i64>,
    /// New total seat count.
    pub total_seats: Option<u32>,
    /// New featured flag.
    pub featured: Option<bool>,
    /// Re-activate or deactivate.
    pub is_active: Option<bool>,
}

impl From<UpdateEventRequest> for EventPatch {
    fn from(req: UpdateEventRequest) -> Self {
        Self {
            title: req.title,
            description: req.description,
            category: req.category,
            starts_at: req.date,
            location: req.location,
            price: req.price,
            seats_total: req.total_seats,
            featured: req.featured,
            is_active: req.is_active,
        }
    }
}

/// Query parameters for `GET /events`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct EventQuery {
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Items per page (max 100).
    #[serde(alias = "limit")]
    pub per_page: Option<u32>,
    /// City substring (case-insensitive).
    pub city: Option<String>,
    /// Category.
    #[param(value_type = Option<String>)]
    pub category: Option<EventCategory>,
    /// Featured flag.
    pub featured: Option<bool>,
    /// Title or description substring (case-insensitive).
    pub search: Option<String>,
    /// Minimum price in minor units.
    pub min_price: Option<i64>,
    /// Maximum price in minor units.
    pub max_price: Option<i64>,
    /// Include events that already started.
    #[serde(default)]
    pub include_past: bool,
    /// Include deactivated events (admins only).
    #[serde(default)]
    pub include_inactive: bool,
}

impl EventQuery {
    /// Pagination part of the query.
    #[must_use]
    pub fn pagination(&self) -> PaginationParams {
        let defaults = PaginationParams::default();
        PaginationParams {
            page: self.page.unwrap_or(defaults.page),
            per_page: self.per_page.unwrap_or(defaults.per_page),
        }
    }

    /// Storage filter for the query, evaluated at `now`.
    #[must_use]
    pub fn filter(&self, now: DateTime<Utc>) -> EventFilter {
        EventFilter {
            include_inactive: self.include_inactive,
            starts_after: (!self.include_past).then_some(now),
            city: self.city.clone(),
            category: self.category,
            featured: self.featured,
            search: self.search.clone(),
            min_price: self.min_price,
            max_price: self.max_price,
        }
    }
}

/// Event with its derived flags.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    /// The event.
    #[serde(flatten)]
    pub event: Event,
    /// No seats left.
    pub is_sold_out: bool,
}

impl From<Event> for EventResponse {
    fn from(event: Event) -> Self {
        Self {
            is_sold_out: event.is_sold_out(),
            event,
        }
    }
}

/// Response body for `GET /events`.
#[derive(Debug, Serialize, ToSchema)]
pub struct EventListResponse {
    /// Events on this page, ordered by start time.
    pub data: Vec<EventResponse>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn upcoming_only_by_default() {
        let now = Utc::now();
        let filter = EventQuery::default().filter(now);
        assert_eq!(filter.starts_after, Some(now));
        assert!(!filter.include_inactive);

        let query = EventQuery {
            include_past: true,
            ..EventQuery::default()
        };
        assert_eq!(query.filter(now).starts_after, None);
    }

    #[test]
    fn limit_is_an_alias_for_per_page() {
        let Ok(query) = serde_json::from_str::<EventQuery>(r#"{"page":2,"limit":5}"#) else {
            panic!("query should parse");
        };
        let pagination = query.pagination();
        assert_eq!(pagination.page, 2);
        assert_eq!(pagination.per_page, 5);
    }
}
