use axum::{Json, Router, extract::State, routing::get};
use chrono::Utc;
use domain::PortfolioResponse;

use crate::{current_user::CurrentUser, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/portfolio", get(get_portfolio))
}

/// Always 200: per-address failures live inside the lines.
async fn get_portfolio(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Json<PortfolioResponse> {
    let addresses = state.address_repo.list_by_user(user.user_id()).await;
    let summary = state.portfolio.build_portfolio(&addresses).await;
    Json(PortfolioResponse {
        portfolio: summary.lines,
        total_portfolio_value_usd: summary.total_value_usd,
        last_updated: Utc::now(),
    })
}
