//! Domain layer: entities, identifiers and pure business rules.
//!
//! Nothing in here performs I/O. Derived values (available seats, booking
//! codes, refund amounts, ticket tokens) are computed by explicit
//! constructors and functions rather than by storage hooks.

pub mod booking;
pub mod event;
pub mod ids;
pub mod refund;
pub mod requester;
pub mod signature;
pub mod ticket;

pub use booking::{
    Attendee, Booking, BookingRequest, BookingStatus, PaymentDetails, PaymentMethod,
    PaymentStatus, RefundRecord,
};
pub use event::{Event, EventCategory, EventPatch, Location, NewEvent, SeatInventory};
pub use ids::{BookingId, EventId, UserId};
pub use requester::{Requester, Role};
