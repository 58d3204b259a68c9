//! # eventhive-api
//!
//! REST backend for event ticketing: seat inventory, a booking ledger,
//! payment reconciliation against an external gateway, and cancellation
//! refunds.
//!
//! Seats are held when a booking is created and only released through a
//! single once-only path, so a booking never holds seats it should not and
//! never releases them twice. Payments are accepted only after the
//! gateway's HMAC signature checks out.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── REST Handlers + Requester extractor (api/)
//!     │
//!     ├── EventService / BookingService / PaymentService (service/)
//!     ├── Entities and pure rules: seats, refunds, signatures (domain/)
//!     │
//!     ├── PaymentGateway: Razorpay | Stub (gateway/)
//!     └── EventStore + BookingStore: Memory | PostgreSQL (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod persistence;
pub mod service;
