use crate::entities::{PaymentStatus, status_sql_list};
use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use preboard_sdk::objects::UtmParameters;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use uuid::Uuid;

/// Name of the unique constraint on `payment_reservations.reservation_token`.
pub const RESERVATION_TOKEN_CONSTRAINT: &str = "payment_reservations_reservation_token_key";

const RESERVATION_COLUMNS: &str = "\
    id, email, name, phone, reservation_token, order_reference, \
    amount, currency, settlement_amount, settlement_currency, \
    gateway, gateway_order_ref, gateway_transaction_id, payment_url, \
    status, user_type, \
    utm_source, utm_medium, utm_campaign, utm_content, utm_term, \
    gateway_response, expires_at, claimed_by_founder_id, claimed_at, \
    created_at, updated_at";

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PaymentReservation {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub reservation_token: String,
    pub order_reference: String,
    pub amount: Decimal,
    pub currency: String,
    pub settlement_amount: Option<Decimal>,
    pub settlement_currency: Option<String>,
    pub gateway: String,
    pub gateway_order_ref: Option<String>,
    pub gateway_transaction_id: Option<String>,
    pub payment_url: Option<String>,
    pub status: PaymentStatus,
    pub user_type: String,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_content: Option<String>,
    pub utm_term: Option<String>,
    pub gateway_response: Option<serde_json::Value>,
    pub expires_at: OffsetDateTime,
    pub claimed_by_founder_id: Option<String>,
    pub claimed_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Why a reservation token cannot be claimed.
///
/// Variants are listed in the order they are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum TokenRejection {
    #[error("Reservation token not found")]
    NotFound,
    #[error("Reservation has already been claimed")]
    AlreadyClaimed,
    #[error("Reservation has expired")]
    Expired,
    #[error("Payment has not been completed")]
    NotCompleted,
}

impl PaymentReservation {
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }

    /// The first reason this row cannot be claimed at `now`, if any.
    pub fn claim_rejection(&self, now: OffsetDateTime) -> Option<TokenRejection> {
        if self.claimed_by_founder_id.is_some() || self.status == PaymentStatus::Claimed {
            Some(TokenRejection::AlreadyClaimed)
        } else if self.is_expired_at(now) || self.status == PaymentStatus::Expired {
            Some(TokenRejection::Expired)
        } else if self.status != PaymentStatus::Completed {
            Some(TokenRejection::NotCompleted)
        } else {
            None
        }
    }

    pub fn is_claimable(&self, now: OffsetDateTime) -> bool {
        self.claim_rejection(now).is_none()
    }

    pub fn utm(&self) -> UtmParameters {
        UtmParameters {
            utm_source: self.utm_source.clone(),
            utm_medium: self.utm_medium.clone(),
            utm_campaign: self.utm_campaign.clone(),
            utm_content: self.utm_content.clone(),
            utm_term: self.utm_term.clone(),
        }
    }

    /// Build the stored row for a new reservation. Used by stores that do
    /// not get defaults from a database.
    pub fn from_new(new: NewPaymentReservation, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::now_v7(),
            email: new.email,
            name: new.name,
            phone: new.phone,
            reservation_token: new.reservation_token,
            order_reference: new.order_reference,
            amount: new.amount,
            currency: new.currency,
            settlement_amount: new.settlement_amount,
            settlement_currency: new.settlement_currency,
            gateway: new.gateway,
            gateway_order_ref: new.gateway_order_ref,
            gateway_transaction_id: None,
            payment_url: new.payment_url,
            status: PaymentStatus::Pending,
            user_type: new.user_type,
            utm_source: new.utm.utm_source,
            utm_medium: new.utm.utm_medium,
            utm_campaign: new.utm.utm_campaign,
            utm_content: new.utm.utm_content,
            utm_term: new.utm.utm_term,
            gateway_response: None,
            expires_at: new.expires_at,
            claimed_by_founder_id: None,
            claimed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Claim a completed, unclaimed, unexpired row inside an open transaction.
    ///
    /// Returns `None` when the guard does not match; the caller decides why.
    pub async fn claim_completed(
        conn: &mut sqlx::PgConnection,
        reservation_token: &str,
        founder_id: &str,
        now: OffsetDateTime,
    ) -> Result<Option<PaymentReservation>, sqlx::Error> {
        let sql = format!(
            "UPDATE payment_reservations \
             SET status = 'claimed', claimed_by_founder_id = $2, claimed_at = $3, updated_at = $3 \
             WHERE reservation_token = $1 \
               AND status = 'completed' \
               AND claimed_by_founder_id IS NULL \
               AND expires_at > $3 \
             RETURNING {RESERVATION_COLUMNS}"
        );
        sqlx::query_as::<_, PaymentReservation>(&sql)
            .bind(reservation_token)
            .bind(founder_id)
            .bind(now)
            .fetch_optional(conn)
            .await
    }
}

/// Data for inserting a new reservation. The row always starts `pending`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPaymentReservation {
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub reservation_token: String,
    pub order_reference: String,
    pub amount: Decimal,
    pub currency: String,
    pub settlement_amount: Option<Decimal>,
    pub settlement_currency: Option<String>,
    pub gateway: String,
    pub gateway_order_ref: Option<String>,
    pub payment_url: Option<String>,
    pub user_type: String,
    pub utm: UtmParameters,
    pub expires_at: OffsetDateTime,
}

/// A gateway-driven update applied only if the row is still in an allowed state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationTransition {
    pub order_reference: String,
    /// `None` records the payload without touching `status`.
    pub target: Option<PaymentStatus>,
    pub gateway_transaction_id: Option<String>,
    pub gateway_response: serde_json::Value,
}

impl ReservationTransition {
    pub fn allowed_from(&self) -> &'static [PaymentStatus] {
        match self.target {
            Some(target) => target.predecessors(),
            None => PaymentStatus::NON_FINAL,
        }
    }

    /// Apply to an in-memory row, mirroring the conditional SQL update.
    pub fn apply_to(&self, row: &mut PaymentReservation, now: OffsetDateTime) -> bool {
        if !self.allowed_from().contains(&row.status) {
            return false;
        }
        if let Some(target) = self.target {
            row.status = target;
        }
        if let Some(tran_ref) = &self.gateway_transaction_id {
            row.gateway_transaction_id = Some(tran_ref.clone());
        }
        row.gateway_response = Some(self.gateway_response.clone());
        row.updated_at = now;
        true
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct InsertPaymentReservation(pub NewPaymentReservation);

impl Processor<InsertPaymentReservation> for DatabaseProcessor {
    type Output = PaymentReservation;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertPaymentReservation")]
    async fn process(
        &self,
        insert: InsertPaymentReservation,
    ) -> Result<PaymentReservation, sqlx::Error> {
        let new = insert.0;
        let sql = format!(
            "INSERT INTO payment_reservations \
             (id, email, name, phone, reservation_token, order_reference, amount, currency, \
              settlement_amount, settlement_currency, gateway, gateway_order_ref, payment_url, \
              status, user_type, utm_source, utm_medium, utm_campaign, utm_content, utm_term, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, 'pending', $14, $15, $16, $17, $18, $19, $20) \
             RETURNING {RESERVATION_COLUMNS}"
        );
        sqlx::query_as::<_, PaymentReservation>(&sql)
            .bind(Uuid::now_v7())
            .bind(new.email)
            .bind(new.name)
            .bind(new.phone)
            .bind(new.reservation_token)
            .bind(new.order_reference)
            .bind(new.amount)
            .bind(new.currency)
            .bind(new.settlement_amount)
            .bind(new.settlement_currency)
            .bind(new.gateway)
            .bind(new.gateway_order_ref)
            .bind(new.payment_url)
            .bind(new.user_type)
            .bind(new.utm.utm_source)
            .bind(new.utm.utm_medium)
            .bind(new.utm.utm_campaign)
            .bind(new.utm.utm_content)
            .bind(new.utm.utm_term)
            .bind(new.expires_at)
            .fetch_one(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
pub struct GetReservationByOrderReference {
    pub order_reference: String,
}

impl Processor<GetReservationByOrderReference> for DatabaseProcessor {
    type Output = Option<PaymentReservation>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetReservationByOrderReference")]
    async fn process(
        &self,
        query: GetReservationByOrderReference,
    ) -> Result<Option<PaymentReservation>, sqlx::Error> {
        let sql =
            format!("SELECT {RESERVATION_COLUMNS} FROM payment_reservations WHERE order_reference = $1");
        sqlx::query_as::<_, PaymentReservation>(&sql)
            .bind(query.order_reference)
            .fetch_optional(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
pub struct GetReservationByToken {
    pub reservation_token: String,
}

impl Processor<GetReservationByToken> for DatabaseProcessor {
    type Output = Option<PaymentReservation>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetReservationByToken")]
    async fn process(
        &self,
        query: GetReservationByToken,
    ) -> Result<Option<PaymentReservation>, sqlx::Error> {
        let sql = format!(
            "SELECT {RESERVATION_COLUMNS} FROM payment_reservations WHERE reservation_token = $1"
        );
        sqlx::query_as::<_, PaymentReservation>(&sql)
            .bind(query.reservation_token)
            .fetch_optional(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
/// Conditionally apply a gateway signal.
///
/// The `WHERE status IN (...)` guard makes late or duplicate signals no-ops,
/// so the webhook and the browser return can race safely. Returns the updated
/// row only when this call performed the write.
pub struct ApplyReservationTransition(pub ReservationTransition);

impl Processor<ApplyReservationTransition> for DatabaseProcessor {
    type Output = Option<PaymentReservation>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ApplyReservationTransition")]
    async fn process(
        &self,
        update: ApplyReservationTransition,
    ) -> Result<Option<PaymentReservation>, sqlx::Error> {
        let transition = update.0;
        let allowed = status_sql_list(transition.allowed_from());
        if allowed.is_empty() {
            return Ok(None);
        }
        let sql = format!(
            "UPDATE payment_reservations \
             SET status = COALESCE($2, status), \
                 gateway_transaction_id = COALESCE($3, gateway_transaction_id), \
                 gateway_response = $4, \
                 updated_at = now() \
             WHERE order_reference = $1 AND status IN ({allowed}) \
             RETURNING {RESERVATION_COLUMNS}"
        );
        sqlx::query_as::<_, PaymentReservation>(&sql)
            .bind(transition.order_reference)
            .bind(transition.target)
            .bind(transition.gateway_transaction_id)
            .bind(transition.gateway_response)
            .fetch_optional(&self.pool)
            .await
    }
}

#[derive(Debug, Clone, Default)]
/// List reservations with pagination and optional filters, newest first.
pub struct ListPaymentReservations {
    pub limit: i64,
    pub offset: i64,
    pub status: Option<PaymentStatus>,
    pub email: Option<String>,
}

impl Processor<ListPaymentReservations> for DatabaseProcessor {
    type Output = Vec<PaymentReservation>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListPaymentReservations")]
    async fn process(
        &self,
        query: ListPaymentReservations,
    ) -> Result<Vec<PaymentReservation>, sqlx::Error> {
        let sql = format!(
            "SELECT {RESERVATION_COLUMNS} FROM payment_reservations \
             WHERE ($1::payment_status IS NULL OR status = $1) \
               AND ($2::text IS NULL OR email = lower($2)) \
             ORDER BY created_at DESC \
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, PaymentReservation>(&sql)
            .bind(query.status)
            .bind(query.email)
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
/// Mark in-flight reservations past their expiry as `expired`.
pub struct ExpireAbandonedReservations {
    pub now: OffsetDateTime,
}

impl Processor<ExpireAbandonedReservations> for DatabaseProcessor {
    type Output = u64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ExpireAbandonedReservations")]
    async fn process(&self, query: ExpireAbandonedReservations) -> Result<u64, sqlx::Error> {
        let allowed = status_sql_list(PaymentStatus::Expired.predecessors());
        let sql = format!(
            "UPDATE payment_reservations \
             SET status = 'expired', updated_at = $1 \
             WHERE status IN ({allowed}) AND expires_at <= $1"
        );
        let result = sqlx::query(&sql).bind(query.now).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
