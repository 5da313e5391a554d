use std::sync::Arc;

use explorer::ExplorerApi;

use crate::{
    config::AppConfig,
    repositories::AddressRepository,
    services::{HistoryBuilder, PortfolioAggregator},
};

#[allow(dead_code)]
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub explorer: Arc<dyn ExplorerApi>,
    pub address_repo: Arc<dyn AddressRepository>,
    pub portfolio: Arc<PortfolioAggregator>,
    pub history: Arc<HistoryBuilder>,
}

// Ensure critical dependencies uphold Send/Sync for Axum state usage.
#[allow(dead_code)]
fn _assert_state_types_are_send_sync()
where
    AppConfig: Send + Sync + 'static,
    dyn ExplorerApi: Send + Sync,
    dyn AddressRepository: Send + Sync,
    PortfolioAggregator: Send + Sync,
    HistoryBuilder: Send + Sync,
{
}

#[allow(dead_code)]
fn _assert_state_bounds() {
    fn assert_bounds<T: Clone + Send + Sync + 'static>() {}
    assert_bounds::<AppState>();
}
