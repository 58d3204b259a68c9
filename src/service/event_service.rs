//! Event catalog service: admin management and public browsing.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::{Event, EventId, EventPatch, NewEvent, Requester};
use crate::error::ApiError;
use crate::persistence::{EventFilter, EventStore, Page, Paged};

/// Orchestrates event creation, updates, soft deletion and lookups.
#[derive(Debug, Clone)]
pub struct EventService {
    events: Arc<dyn EventStore>,
}

impl EventService {
    /// Creates a new `EventService`.
    #[must_use]
    pub fn new(events: Arc<dyn EventStore>) -> Self {
        Self { events }
    }

    /// Creates an event (admin only).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Forbidden`] for non-admins and
    /// [`ApiError::InvalidRequest`] for invalid input.
    pub async fn create_event(
        &self,
        requester: &Requester,
        input: NewEvent,
    ) -> Result<Event, ApiError> {
        requester.ensure_admin()?;
        let event = input.into_event(Utc::now())?;
        let event = self.events.insert_event(event).await?;
        tracing::info!(
            event_id = %event.id,
            title = %event.title,
            seats = event.seats.total(),
            "event created"
        );
        Ok(event)
    }

    /// Applies a partial update (admin only).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Forbidden`] for non-admins,
    /// [`ApiError::EventNotFound`] for unknown ids and
    /// [`ApiError::InvalidRequest`] for invalid fields.
    pub async fn update_event(
        &self,
        requester: &Requester,
        id: EventId,
        patch: EventPatch,
    ) -> Result<Event, ApiError> {
        requester.ensure_admin()?;
        let event = self.events.update_event(id, patch, Utc::now()).await?;
        tracing::info!(event_id = %id, "event updated");
        Ok(event)
    }

    /// Soft-deletes an event (admin only). Existing bookings are untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Forbidden`] for non-admins and
    /// [`ApiError::EventNotFound`] for unknown ids.
    pub async fn deactivate_event(
        &self,
        requester: &Requester,
        id: EventId,
    ) -> Result<Event, ApiError> {
        requester.ensure_admin()?;
        let patch = EventPatch {
            is_active: Some(false),
            ..EventPatch::default()
        };
        let event = self.events.update_event(id, patch, Utc::now()).await?;
        tracing::info!(event_id = %id, "event deactivated");
        Ok(event)
    }

    /// Loads an event. Inactive events are only visible to admins.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::EventNotFound`] if the event is missing or hidden.
    pub async fn get_event(
        &self,
        requester: Option<&Requester>,
        id: EventId,
    ) -> Result<Event, ApiError> {
        let event = self
            .events
            .get_event(id)
            .await?
            .ok_or(ApiError::EventNotFound)?;
        if !event.is_active && !requester.is_some_and(Requester::is_admin) {
            return Err(ApiError::EventNotFound);
        }
        Ok(event)
    }

    /// Lists one page of events ordered by start time. Only admins may include
    /// inactive events.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Persistence`] on storage failure.
    pub async fn list_events(
        &self,
        requester: Option<&Requester>,
        mut filter: EventFilter,
        page: Page,
    ) -> Result<Paged<Event>, ApiError> {
        if !requester.is_some_and(Requester::is_admin) {
            filter.include_inactive = false;
        }
        self.events.list_events(&filter, page).await
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::domain::event::tests::sample_location;
    use crate::domain::{EventCategory, Role, UserId};
    use crate::persistence::MemoryEventStore;

    fn admin() -> Requester {
        Requester::new(UserId::new(), Role::Admin)
    }

    fn user() -> Requester {
        Requester::new(UserId::new(), Role::User)
    }

    fn new_event(title: &str, days: i64) -> NewEvent {
        NewEvent {
            title: title.to_string(),
            description: "An evening out".to_string(),
            category: EventCategory::Entertainment,
            starts_at: Utc::now() + Duration::days(days),
            location: sample_location(),
            price: 49_900,
            seats_total: 100,
            featured: false,
        }
    }

    fn service() -> EventService {
        EventService::new(Arc::new(MemoryEventStore::new()))
    }

    #[tokio::test]
    async fn only_admins_manage_events() {
        let service = service();
        let result = service.create_event(&user(), new_event("Standup", 5)).await;
        assert!(matches!(result, Err(ApiError::Forbidden)));

        let Ok(event) = service.create_event(&admin(), new_event("Standup", 5)).await else {
            panic!("admin create failed");
        };
        assert!(event.is_active);
        assert_eq!(event.seats.available(), 100);
    }

    #[tokio::test]
    async fn deactivated_events_are_hidden_from_users() {
        let service = service();
        let admin = admin();
        let Ok(event) = service.create_event(&admin, new_event("Jazz", 5)).await else {
            panic!("create failed");
        };
        let Ok(hidden) = service.deactivate_event(&admin, event.id).await else {
            panic!("deactivate failed");
        };
        assert!(!hidden.is_active);

        assert!(matches!(
            service.get_event(Some(&user()), event.id).await,
            Err(ApiError::EventNotFound)
        ));
        assert!(matches!(
            service.get_event(None, event.id).await,
            Err(ApiError::EventNotFound)
        ));
        assert!(service.get_event(Some(&admin), event.id).await.is_ok());

        let filter = EventFilter {
            include_inactive: true,
            ..EventFilter::default()
        };
        let Ok(public) = service.list_events(None, filter.clone(), Page::ALL).await else {
            panic!("list failed");
        };
        assert!(public.items.is_empty());
        assert_eq!(public.total, 0);
        let Ok(all) = service.list_events(Some(&admin), filter, Page::ALL).await else {
            panic!("list failed");
        };
        assert_eq!(all.items.len(), 1);
    }

    #[tokio::test]
    async fn shrinking_below_booked_is_rejected() {
        let service = service();
        let admin = admin();
        let Ok(event) = service.create_event(&admin, new_event("Derby", 5)).await else {
            panic!("create failed");
        };
        let patch = EventPatch {
            seats_total: Some(0),
            ..EventPatch::default()
        };
        assert!(matches!(
            service.update_event(&admin, event.id, patch).await,
            Err(ApiError::InvalidRequest(_))
        ));

        let patch = EventPatch {
            title: Some("Derby Day".to_string()),
            price: Some(59_900),
            ..EventPatch::default()
        };
        let Ok(updated) = service.update_event(&admin, event.id, patch).await else {
            panic!("update failed");
        };
        assert_eq!(updated.title, "Derby Day");
        assert_eq!(updated.price, 59_900);
    }
}
