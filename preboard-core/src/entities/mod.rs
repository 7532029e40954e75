pub mod founder;
pub mod payment_reservation;
pub mod payment_transaction;

use preboard_sdk::objects::PaymentStatus as SdkPaymentStatus;

/// Reservation status for database operations.
///
/// This is the sqlx::Type version. For API/DTO use, see `preboard_sdk::objects::PaymentStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase", type_name = "payment_status")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Expired,
    Claimed,
}

impl PaymentStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Expired => "expired",
            PaymentStatus::Claimed => "claimed",
        }
    }

    /// Statuses a row may hold for a move into `self` to be applied.
    ///
    /// Forward order is `pending → processing → failed → completed → claimed`;
    /// `expired` is only reachable from the two in-flight states.
    pub const fn predecessors(self) -> &'static [PaymentStatus] {
        match self {
            PaymentStatus::Pending => &[],
            PaymentStatus::Processing => &[PaymentStatus::Pending],
            PaymentStatus::Failed => &[PaymentStatus::Pending, PaymentStatus::Processing],
            PaymentStatus::Completed => &[
                PaymentStatus::Pending,
                PaymentStatus::Processing,
                PaymentStatus::Failed,
            ],
            PaymentStatus::Expired => &[PaymentStatus::Pending, PaymentStatus::Processing],
            PaymentStatus::Claimed => &[PaymentStatus::Completed],
        }
    }

    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        next.predecessors().contains(&self)
    }

    /// Statuses that still accept a gateway payload without a status change.
    pub const NON_FINAL: &'static [PaymentStatus] = &[
        PaymentStatus::Pending,
        PaymentStatus::Processing,
        PaymentStatus::Failed,
    ];
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<PaymentStatus> for SdkPaymentStatus {
    fn from(value: PaymentStatus) -> Self {
        match value {
            PaymentStatus::Pending => SdkPaymentStatus::Pending,
            PaymentStatus::Processing => SdkPaymentStatus::Processing,
            PaymentStatus::Completed => SdkPaymentStatus::Completed,
            PaymentStatus::Failed => SdkPaymentStatus::Failed,
            PaymentStatus::Expired => SdkPaymentStatus::Expired,
            PaymentStatus::Claimed => SdkPaymentStatus::Claimed,
        }
    }
}

impl From<SdkPaymentStatus> for PaymentStatus {
    fn from(value: SdkPaymentStatus) -> Self {
        match value {
            SdkPaymentStatus::Pending => PaymentStatus::Pending,
            SdkPaymentStatus::Processing => PaymentStatus::Processing,
            SdkPaymentStatus::Completed => PaymentStatus::Completed,
            SdkPaymentStatus::Failed => PaymentStatus::Failed,
            SdkPaymentStatus::Expired => PaymentStatus::Expired,
            SdkPaymentStatus::Claimed => PaymentStatus::Claimed,
        }
    }
}

/// Render a status set as a SQL `IN (...)` list body.
///
/// Only ever fed the static labels above, never caller input.
pub(crate) fn status_sql_list(statuses: &[PaymentStatus]) -> String {
    statuses
        .iter()
        .map(|s| format!("'{}'", s.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_only_transitions() {
        use PaymentStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Pending.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Failed));
        assert!(Failed.can_transition_to(Completed));
        assert!(Completed.can_transition_to(Claimed));

        assert!(!Completed.can_transition_to(Pending));
        assert!(!Completed.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Processing));
        assert!(!Claimed.can_transition_to(Completed));
        assert!(!Expired.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Claimed));
    }

    #[test]
    fn test_status_sql_list() {
        assert_eq!(
            status_sql_list(PaymentStatus::Completed.predecessors()),
            "'pending', 'processing', 'failed'"
        );
    }
}
