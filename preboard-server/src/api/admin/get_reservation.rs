use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::api::extractors::AdminAuth;
use crate::state::AppState;

use super::{AdminApiError, reservation_to_admin_response};

/// `GET /reservations/{order_reference}`
pub async fn get_reservation(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(order_reference): Path<String>,
) -> Result<impl IntoResponse, AdminApiError> {
    let record = state
        .store
        .find_by_order_reference(&order_reference)
        .await
        .map_err(AdminApiError::Store)?
        .ok_or(AdminApiError::NotFound)?;

    Ok(Json(reservation_to_admin_response(&record, true)))
}
