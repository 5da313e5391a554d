use std::sync::Arc;

use anyhow::Result;
use explorer::{BlockchairClient, ExplorerConfig};

use crate::{
    config::AppConfig,
    repositories::InMemoryAddressRepository,
    services::{FallbackPriceTable, HistoryBuilder, PortfolioAggregator},
    state::AppState,
};

pub fn build_state(config: &AppConfig) -> Result<AppState> {
    let explorer = Arc::new(BlockchairClient::new(ExplorerConfig {
        api_base: config.explorer_api_base.clone(),
        api_key: config.explorer_api_key.clone(),
        request_timeout: config.explorer_timeout,
    })?);

    let address_repo = Arc::new(InMemoryAddressRepository::new());
    let fallback_prices = FallbackPriceTable::new(config.fallback_prices.clone());
    let portfolio = Arc::new(PortfolioAggregator::new(
        explorer.clone(),
        fallback_prices,
    ));
    let history = Arc::new(HistoryBuilder::new(
        explorer.clone(),
        config.history_tx_limit,
        config.history_fetch_concurrency,
    ));

    Ok(AppState {
        config: config.clone(),
        explorer,
        address_repo,
        portfolio,
        history,
    })
}
