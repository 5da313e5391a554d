use std::collections::HashMap;

use domain::Chain;
use explorer::ExplorerApi;
use tracing::{debug, warn};

/// Static USD prices used when the live stats endpoint is unavailable.
/// Configuration, not business logic: overrides come from the
/// `FALLBACK_PRICES` env entry.
#[derive(Debug, Clone)]
pub struct FallbackPriceTable {
    prices: HashMap<Chain, f64>,
}

impl FallbackPriceTable {
    const DEFAULTS: [(Chain, f64); 5] = [
        (Chain::Bitcoin, 110_000.0),
        (Chain::Ethereum, 3_000.0),
        (Chain::Dogecoin, 0.18),
        (Chain::Litecoin, 100.0),
        (Chain::BitcoinCash, 400.0),
    ];

    pub fn new(overrides: HashMap<Chain, f64>) -> Self {
        let mut prices: HashMap<Chain, f64> = Self::DEFAULTS.into_iter().collect();
        prices.extend(overrides);
        Self { prices }
    }

    pub fn price_for(&self, chain: Chain) -> f64 {
        self.prices.get(&chain).copied().unwrap_or_default()
    }
}

impl Default for FallbackPriceTable {
    fn default() -> Self {
        Self::new(HashMap::new())
    }
}

/// Resolves one USD price per chain for a single aggregation pass. The memo
/// lives and dies with the pass, so there is no cross-request staleness and
/// no shared cache to lock.
pub struct PriceResolver<'a> {
    explorer: &'a dyn ExplorerApi,
    fallback: &'a FallbackPriceTable,
    memo: HashMap<Chain, f64>,
}

impl<'a> PriceResolver<'a> {
    pub fn new(explorer: &'a dyn ExplorerApi, fallback: &'a FallbackPriceTable) -> Self {
        Self {
            explorer,
            fallback,
            memo: HashMap::new(),
        }
    }

    /// Never fails: any upstream problem falls back to the static table.
    /// Each chain hits the stats endpoint at most once per pass.
    pub async fn resolve(&mut self, chain: Chain) -> f64 {
        if let Some(price) = self.memo.get(&chain) {
            return *price;
        }
        let price = match self.explorer.chain_stats(chain).await {
            Ok(stats) => {
                debug!(chain = %chain, price = stats.market_price_usd, "live price fetched");
                stats.market_price_usd
            }
            Err(err) => {
                let fallback = self.fallback.price_for(chain);
                warn!(
                    error = %err,
                    chain = %chain,
                    fallback,
                    "live price fetch failed, using fallback table"
                );
                fallback
            }
        };
        self.memo.insert(chain, price);
        price
    }
}
