//! The reservation workflow: initiate, apply gateway signals, claim.

pub mod claim;
pub mod initiation;
pub mod transitions;

pub use claim::{ClaimError, ClaimService, ClaimedReservation};
pub use initiation::{InitiatedPayment, InitiationError, InitiationService};
pub use transitions::{SignalSource, TransitionError, TransitionResult, TransitionService};
