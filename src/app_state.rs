//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::api::auth::IdentityProvider;
use crate::gateway::PaymentGateway;
use crate::persistence::{BookingStore, EventStore};
use crate::service::{BookingService, EventService, PaymentService, PaymentSettings};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Event catalog.
    pub event_service: Arc<EventService>,
    /// Booking ledger.
    pub booking_service: Arc<BookingService>,
    /// Payment reconciliation.
    pub payment_service: Arc<PaymentService>,
    /// Resolves the caller of each request.
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    /// Wires the services over the given collaborators.
    #[must_use]
    pub fn new(
        events: Arc<dyn EventStore>,
        bookings: Arc<dyn BookingStore>,
        gateway: Arc<dyn PaymentGateway>,
        payment_settings: PaymentSettings,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            event_service: Arc::new(EventService::new(Arc::clone(&events))),
            booking_service: Arc::new(BookingService::new(
                Arc::clone(&events),
                Arc::clone(&bookings),
            )),
            payment_service: Arc::new(PaymentService::new(
                events,
                bookings,
                gateway,
                payment_settings,
            )),
            identity,
        }
    }
}
