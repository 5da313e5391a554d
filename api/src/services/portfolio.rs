use std::sync::Arc;

use domain::{PortfolioLine, TrackedAddress};
use explorer::{DashboardOptions, ExplorerApi};
use metrics::counter;
use tracing::{debug, warn};

use crate::services::prices::{FallbackPriceTable, PriceResolver};

const NO_DATA_MESSAGE: &str = "No data available for this address";
const FETCH_FAILED_MESSAGE: &str = "Unable to fetch data for this address";

#[derive(Debug, Clone)]
pub struct PortfolioSummary {
    pub lines: Vec<PortfolioLine>,
    pub total_value_usd: f64,
}

/// Values every tracked address against the explorer. Read-only and
/// idempotent; failures are isolated per address.
pub struct PortfolioAggregator {
    explorer: Arc<dyn ExplorerApi>,
    fallback_prices: FallbackPriceTable,
}

impl PortfolioAggregator {
    pub fn new(explorer: Arc<dyn ExplorerApi>, fallback_prices: FallbackPriceTable) -> Self {
        Self {
            explorer,
            fallback_prices,
        }
    }

    /// One aggregation pass. Output order matches input order; the total
    /// accumulates successful lines only. Addresses are walked sequentially
    /// so the per-pass price memo stays a plain map.
    pub async fn build_portfolio(&self, addresses: &[TrackedAddress]) -> PortfolioSummary {
        let mut resolver = PriceResolver::new(self.explorer.as_ref(), &self.fallback_prices);
        let mut lines = Vec::with_capacity(addresses.len());
        let mut total_value_usd = 0.0;

        for tracked in addresses {
            let dashboard = self
                .explorer
                .address_dashboard(tracked.chain, &tracked.address, DashboardOptions::default())
                .await;
            let line = match dashboard {
                Ok(Some(dashboard)) => {
                    let balance = tracked.chain.to_main_unit(dashboard.balance_raw);
                    let price = resolver.resolve(tracked.chain).await;
                    let value = balance * price;
                    total_value_usd += value;
                    debug!(
                        chain = %tracked.chain,
                        address = %tracked.address,
                        balance,
                        price,
                        value,
                        "address valued"
                    );
                    counter!("portfolio_lines_total", "outcome" => "ok").increment(1);
                    PortfolioLine::valued(tracked, dashboard.balance_raw, balance, price, value)
                }
                Ok(None) => {
                    counter!("portfolio_lines_total", "outcome" => "no_data").increment(1);
                    PortfolioLine::failed(tracked, NO_DATA_MESSAGE)
                }
                Err(err) => {
                    warn!(
                        error = %err,
                        chain = %tracked.chain,
                        address = %tracked.address,
                        "address dashboard fetch failed"
                    );
                    counter!("portfolio_lines_total", "outcome" => "error").increment(1);
                    PortfolioLine::failed(tracked, FETCH_FAILED_MESSAGE)
                }
            };
            lines.push(line);
        }

        PortfolioSummary {
            lines,
            total_value_usd,
        }
    }
}
