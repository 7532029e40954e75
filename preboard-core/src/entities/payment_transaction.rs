use rust_decimal::Decimal;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::entities::payment_reservation::PaymentReservation;

/// Immutable audit row written when a reservation is claimed.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PaymentTransaction {
    pub id: Uuid,
    pub reservation_id: Uuid,
    pub founder_id: String,
    pub gateway: String,
    pub gateway_transaction_id: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub utm: serde_json::Value,
    pub created_at: OffsetDateTime,
}

impl PaymentTransaction {
    /// Snapshot a freshly claimed reservation.
    pub fn for_claim(reservation: &PaymentReservation, founder_id: &str, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::now_v7(),
            reservation_id: reservation.id,
            founder_id: founder_id.to_string(),
            gateway: reservation.gateway.clone(),
            gateway_transaction_id: reservation.gateway_transaction_id.clone(),
            amount: reservation.amount,
            currency: reservation.currency.clone(),
            utm: serde_json::to_value(reservation.utm()).unwrap_or(serde_json::Value::Null),
            created_at: now,
        }
    }

    pub async fn insert(
        conn: &mut sqlx::PgConnection,
        transaction: &PaymentTransaction,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO payment_transactions \
             (id, reservation_id, founder_id, gateway, gateway_transaction_id, amount, currency, utm, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(transaction.id)
        .bind(transaction.reservation_id)
        .bind(&transaction.founder_id)
        .bind(&transaction.gateway)
        .bind(&transaction.gateway_transaction_id)
        .bind(transaction.amount)
        .bind(&transaction.currency)
        .bind(&transaction.utm)
        .bind(transaction.created_at)
        .execute(conn)
        .await?;
        Ok(())
    }
}
