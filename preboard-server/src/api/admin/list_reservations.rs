use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use preboard_core::store::ReservationFilter;
use preboard_sdk::objects::admin::{ListReservationsQuery, clamp_pagination};

use crate::api::extractors::AdminAuth;
use crate::state::AppState;

use super::{AdminApiError, reservation_to_admin_response};

/// `GET /reservations`, newest first. Filterable by status and email.
pub async fn list_reservations(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Query(query): Query<ListReservationsQuery>,
) -> Result<impl IntoResponse, AdminApiError> {
    let (limit, offset) = clamp_pagination(query.limit, query.offset);

    let records = state
        .store
        .list(ReservationFilter {
            limit,
            offset,
            status: query.status.map(Into::into),
            email: query.email.map(|e| e.trim().to_ascii_lowercase()),
        })
        .await
        .map_err(AdminApiError::Store)?;

    let response: Vec<_> = records
        .iter()
        .map(|r| reservation_to_admin_response(r, false))
        .collect();
    Ok(Json(response))
}
