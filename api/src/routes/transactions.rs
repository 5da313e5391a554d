use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use domain::{ErrorBody, TransactionHistoryResponse};
use tracing::warn;
use uuid::Uuid;

use crate::{current_user::CurrentUser, services::HistoryError, state::AppState};

type ErrorResponse = (StatusCode, Json<ErrorBody>);

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/addresses/:address_id/transactions",
        get(get_transactions),
    )
}

async fn get_transactions(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(address_id): Path<Uuid>,
) -> Result<Json<TransactionHistoryResponse>, ErrorResponse> {
    let Some(tracked) = state
        .address_repo
        .find_by_id(user.user_id(), address_id)
        .await
    else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ErrorBody::new("Address not found.")),
        ));
    };

    match state.history.build_history(&tracked).await {
        Ok(report) => Ok(Json(TransactionHistoryResponse {
            address: tracked.address,
            chain: tracked.chain,
            transactions: report.transactions,
            total_transactions: report.total_discovered,
            message: report.message,
        })),
        Err(HistoryError::RateLimited) => Err((
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorBody::new(
                "Rate limit exceeded. Please try again later or add a valid API key.",
            )),
        )),
        Err(HistoryError::InvalidAddress(chain)) => Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorBody::new(format!("Invalid {chain} address format"))),
        )),
        Err(HistoryError::Upstream(err)) => {
            warn!(
                error = %err,
                chain = %tracked.chain,
                address = %tracked.address,
                "history lookup failed upstream"
            );
            Err((
                StatusCode::BAD_GATEWAY,
                Json(ErrorBody::new("Unable to fetch transaction data")),
            ))
        }
    }
}
