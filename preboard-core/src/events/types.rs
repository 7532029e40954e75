/// Events emitted by the reservation workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReservationEvent {
    /// Emitted exactly once per reservation, by the writer that moved it to `completed`.
    PaymentCompleted { order_reference: String },
}

impl ReservationEvent {
    pub fn order_reference(&self) -> &str {
        match self {
            ReservationEvent::PaymentCompleted { order_reference } => order_reference,
        }
    }
}
