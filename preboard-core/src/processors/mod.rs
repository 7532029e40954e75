//! Background processors.
//!
//! - `ConfirmationMailer`: receives `ReservationEvent::PaymentCompleted`, sends the confirmation email
//! - `ExpirySweeper`: on a configurable interval, expires abandoned reservations

pub mod confirmation_mailer;
pub mod expiry_sweeper;

pub use confirmation_mailer::{ConfirmationMailer, MailerConfig, MailerError};
pub use expiry_sweeper::{ExpirySweeper, SweeperConfig};
