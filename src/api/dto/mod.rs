//! Data Transfer Objects for REST request/response serialization.
//!
//! JSON uses camelCase keys. Money amounts are integers in the currency's
//! minor unit.

pub mod booking_dto;
pub mod common_dto;
pub mod event_dto;
pub mod payment_dto;

pub use booking_dto::*;
pub use common_dto::*;
pub use event_dto::*;
pub use payment_dto::*;
