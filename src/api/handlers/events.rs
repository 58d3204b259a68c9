//! Event handlers: admin create/update/delete, public list and get.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;

use crate::api::dto::{
    CreateEventRequest, EventListResponse, EventQuery, EventResponse, UpdateEventRequest,
};
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::app_state::AppState;
use crate::domain::{EventId, Requester};
use crate::error::{ApiError, ErrorResponse};

/// `POST /events`: Create an event (admin).
///
/// # Errors
///
/// Returns [`ApiError`] on invalid input or missing admin role.
#[utoipa::path(
    post,
    path = "/api/v1/events",
    tag = "Events",
    summary = "Create an event",
    description = "Creates an active event with all seats available. Admin only.",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created", body = EventResponse),
        (status = 400, description = "Invalid event", body = ErrorResponse),
        (status = 401, description = "No caller identity", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
    )
)]
pub async fn create_event(
    State(state): State<AppState>,
    requester: Requester,
    ApiJson(req): ApiJson<CreateEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let event = state
        .event_service
        .create_event(&requester, req.into())
        .await?;
    Ok((StatusCode::CREATED, Json(EventResponse::from(event))))
}

/// `GET /events`: List upcoming events with filters and pagination.
///
/// # Errors
///
/// Returns [`ApiError`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/events",
    tag = "Events",
    summary = "List events",
    description = "Returns active events ordered by start time. Past events are excluded unless `includePast` is set.",
    params(EventQuery),
    responses(
        (status = 200, description = "Paginated event list", body = EventListResponse),
    )
)]
pub async fn list_events(
    State(state): State<AppState>,
    requester: Option<Requester>,
    ApiQuery(query): ApiQuery<EventQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let pagination = query.pagination();
    let events = state
        .event_service
        .list_events(
            requester.as_ref(),
            query.filter(Utc::now()),
            pagination.window(),
        )
        .await?;
    Ok(Json(EventListResponse {
        data: events.items.into_iter().map(EventResponse::from).collect(),
        pagination: pagination.meta(events.total),
    }))
}

/// `GET /events/{id}`: Get one event.
///
/// # Errors
///
/// Returns [`ApiError::EventNotFound`] for unknown or hidden events.
#[utoipa::path(
    get,
    path = "/api/v1/events/{id}",
    tag = "Events",
    summary = "Get an event",
    description = "Returns one event. Deactivated events are only visible to admins.",
    params(("id" = uuid::Uuid, Path, description = "Event UUID")),
    responses(
        (status = 200, description = "Event details", body = EventResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn get_event(
    State(state): State<AppState>,
    requester: Option<Requester>,
    ApiPath(id): ApiPath<uuid::Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let event = state
        .event_service
        .get_event(requester.as_ref(), EventId::from_uuid(id))
        .await?;
    Ok(Json(EventResponse::from(event)))
}

/// `PUT /events/{id}`: Update an event (admin).
///
/// # Errors
///
/// Returns [`ApiError`] on invalid fields, unknown event or missing admin role.
#[utoipa::path(
    put,
    path = "/api/v1/events/{id}",
    tag = "Events",
    summary = "Update an event",
    description = "Applies a partial update. Seat availability is recomputed; the total cannot drop below seats already booked. Admin only.",
    params(("id" = uuid::Uuid, Path, description = "Event UUID")),
    request_body = UpdateEventRequest,
    responses(
        (status = 200, description = "Updated event", body = EventResponse),
        (status = 400, description = "Invalid update", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn update_event(
    State(state): State<AppState>,
    requester: Requester,
    ApiPath(id): ApiPath<uuid::Uuid>,
    ApiJson(req): ApiJson<UpdateEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let event = state
        .event_service
        .update_event(&requester, EventId::from_uuid(id), req.into())
        .await?;
    Ok(Json(EventResponse::from(event)))
}

/// `DELETE /events/{id}`: Deactivate an event (admin).
///
/// # Errors
///
/// Returns [`ApiError`] on unknown event or missing admin role.
#[utoipa::path(
    delete,
    path = "/api/v1/events/{id}",
    tag = "Events",
    summary = "Deactivate an event",
    description = "Soft-deletes the event. Existing bookings are kept. Admin only.",
    params(("id" = uuid::Uuid, Path, description = "Event UUID")),
    responses(
        (status = 200, description = "Deactivated event", body = EventResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn delete_event(
    State(state): State<AppState>,
    requester: Requester,
    ApiPath(id): ApiPath<uuid::Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let event = state
        .event_service
        .deactivate_event(&requester, EventId::from_uuid(id))
        .await?;
    Ok(Json(EventResponse::from(event)))
}

/// Event routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route(
            "/events/{id}",
            get(get_event).put(update_event).delete(delete_event),
        )
}
