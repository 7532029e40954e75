use super::types::ReservationEvent;
use tokio::sync::mpsc;

/// Default buffer size for event channels.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Sender handle for ReservationEvent events.
pub type ReservationEventSender = mpsc::Sender<ReservationEvent>;
/// Receiver handle for ReservationEvent events.
pub type ReservationEventReceiver = mpsc::Receiver<ReservationEvent>;

/// Create a new ReservationEvent channel.
///
/// Multiple senders can be cloned from the returned sender.
pub fn reservation_event_channel() -> (ReservationEventSender, ReservationEventReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}
