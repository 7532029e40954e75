//! Admin API request and response types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::reservation::{PaymentStatus, UtmParameters};

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Full reservation detail for the admin API (includes gateway and claim info).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminReservationResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub reservation_token: String,
    pub order_reference: String,
    pub amount: rust_decimal::Decimal,
    pub currency: String,
    pub settlement_amount: Option<rust_decimal::Decimal>,
    pub settlement_currency: Option<String>,
    pub gateway: String,
    pub gateway_order_ref: Option<String>,
    pub gateway_transaction_id: Option<String>,
    pub payment_url: Option<String>,
    pub status: PaymentStatus,
    pub user_type: String,
    pub utm: UtmParameters,
    pub created_at: i64,
    pub expires_at: i64,
    pub claimed_by_founder_id: Option<String>,
    pub claimed_at: Option<i64>,
    pub gateway_response: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 200;
const MAX_OFFSET: i64 = 100_000;

/// Query parameters for listing reservations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListReservationsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PaymentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Default for ListReservationsQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
            status: None,
            email: None,
        }
    }
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

/// Clamp limit and offset to safe maximums.
pub fn clamp_pagination(limit: i64, offset: i64) -> (i64, i64) {
    (limit.clamp(1, MAX_LIMIT), offset.clamp(0, MAX_OFFSET))
}
