//! Shared DTO types used across multiple endpoints.

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::Event;
use crate::persistence::Page;

/// Pagination parameters for list endpoints.
#[derive(Debug, Clone, Copy)]
pub struct PaginationParams {
    /// Page number (1-indexed). Defaults to 1.
    pub page: u32,
    /// Items per page (max 100). Defaults to 10.
    pub per_page: u32,
}

/// Pagination metadata included in list responses.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    /// Current page number.
    pub page: u32,
    /// Items per page.
    pub per_page: u32,
    /// Total number of items.
    pub total: u32,
    /// Total number of pages.
    pub total_pages: u32,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    10
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl PaginationParams {
    /// Clamps `per_page` to the allowed maximum of 100.
    #[must_use]
    pub fn clamped(&self) -> Self {
        Self {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, 100),
        }
    }

    /// Storage window for this page.
    #[must_use]
    pub fn window(&self) -> Page {
        let params = self.clamped();
        Page {
            offset: (params.page - 1).saturating_mul(params.per_page),
            limit: params.per_page,
        }
    }

    /// Describes this page given the number of matching rows.
    #[must_use]
    pub fn meta(&self, total: u64) -> PaginationMeta {
        let params = self.clamped();
        let total = u32::try_from(total).unwrap_or(u32::MAX);
        PaginationMeta {
            page: params.page,
            per_page: params.per_page,
            total,
            total_pages: total.div_ceil(params.per_page),
        }
    }
}

/// Compact event view embedded in booking responses.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventSummaryDto {
    /// Event id.
    pub id: uuid::Uuid,
    /// Title.
    pub title: String,
    /// Start time.
    pub starts_at: chrono::DateTime<chrono::Utc>,
    /// Venue name.
    pub venue: String,
    /// City.
    pub city: String,
    /// Ticket price in minor units.
    pub price: i64,
    /// Seats still available.
    pub seats_available: u32,
}

impl From<&Event> for EventSummaryDto {
    fn from(event: &Event) -> Self {
        Self {
            id: *event.id.as_uuid(),
            title: event.title.clone(),
            starts_at: event.starts_at,
            venue: event.location.venue.clone(),
            city: event.location.city.clone(),
            price: event.price,
            seats_available: event.seats.available(),
        }
    }
}
