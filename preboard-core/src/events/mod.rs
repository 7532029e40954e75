//! Event channel for work that happens after a request has been answered.
//!
//! # Event Flow
//!
//! 1. A status transition that writes `completed` emits `ReservationEvent::PaymentCompleted`
//! 2. `ConfirmationMailer` receives it, re-reads the reservation and sends the email
//!
//! Events carry identifiers rather than full rows; processors re-fetch from the store.

pub mod channels;
pub mod types;

pub use channels::{
    DEFAULT_CHANNEL_BUFFER, ReservationEventReceiver, ReservationEventSender,
    reservation_event_channel,
};

pub use types::ReservationEvent;
