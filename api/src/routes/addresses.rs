use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
};
use domain::{AddAddressRequest, AddressResponse, ErrorBody};
use uuid::Uuid;

use crate::{current_user::CurrentUser, repositories::AddressError, state::AppState};

type ErrorResponse = (StatusCode, Json<ErrorBody>);

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/addresses", get(list_addresses).post(add_address))
        .route("/addresses/:address_id", delete(remove_address))
}

async fn list_addresses(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Json<Vec<AddressResponse>> {
    let addresses = state.address_repo.list_by_user(user.user_id()).await;
    Json(addresses.into_iter().map(AddressResponse::from).collect())
}

async fn add_address(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<AddAddressRequest>,
) -> Result<(StatusCode, Json<AddressResponse>), ErrorResponse> {
    let address = payload.address.trim();
    if address.is_empty() {
        return Err(bad_request("Blockchain and address are required."));
    }
    if !payload.chain.is_valid_address_format(address) {
        return Err(bad_request(format!(
            "Invalid {} address format",
            payload.chain
        )));
    }

    match state
        .address_repo
        .add(user.user_id(), payload.chain, address)
        .await
    {
        Ok(tracked) => Ok((StatusCode::CREATED, Json(AddressResponse::from(tracked)))),
        Err(AddressError::Duplicate) => {
            Err(bad_request("Address already exists in your portfolio."))
        }
    }
}

async fn remove_address(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(address_id): Path<Uuid>,
) -> Result<StatusCode, ErrorResponse> {
    if state.address_repo.remove(user.user_id(), address_id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((
            StatusCode::NOT_FOUND,
            Json(ErrorBody::new("Address not found.")),
        ))
    }
}

fn bad_request(message: impl Into<String>) -> ErrorResponse {
    (StatusCode::BAD_REQUEST, Json(ErrorBody::new(message)))
}
