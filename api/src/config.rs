use std::{collections::HashMap, env, time::Duration};

use anyhow::{Context, Result};
use domain::Chain;

#[derive(Clone)]
pub struct AppConfig {
    pub explorer_api_base: String,
    pub explorer_api_key: Option<String>,
    pub explorer_timeout: Duration,
    pub history_tx_limit: usize,
    pub history_fetch_concurrency: usize,
    pub fallback_prices: HashMap<Chain, f64>,
    pub frontend_origins: Vec<String>,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let explorer_timeout = parse_duration_seconds("EXPLORER_TIMEOUT_SECS", 15);
        let history_tx_limit = parse_usize("HISTORY_TX_LIMIT", 10);
        let history_fetch_concurrency = parse_usize("HISTORY_FETCH_CONCURRENCY", 4);
        let frontend_origins = parse_origins();

        // A placeholder key from a copied .env template is the same as no
        // key at all.
        let explorer_api_key = env::var("EXPLORER_API_KEY")
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty() && key != "your_explorer_api_key_here");

        Ok(Self {
            explorer_api_base: env::var("EXPLORER_API_BASE")
                .unwrap_or_else(|_| "https://api.blockchair.com".to_string()),
            explorer_api_key,
            explorer_timeout,
            history_tx_limit,
            history_fetch_concurrency,
            fallback_prices: parse_fallback_prices("FALLBACK_PRICES"),
            frontend_origins,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8081".to_string())
                .parse()
                .context("PORT must be a valid u16")?,
        })
    }
}

fn parse_origins() -> Vec<String> {
    if let Ok(list) = env::var("FRONTEND_ORIGINS") {
        split_origins(&list)
    } else if let Ok(origin) = env::var("FRONTEND_ORIGIN") {
        split_origins(&origin)
    } else {
        vec!["http://localhost:3000".to_string()]
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|item| {
            let trimmed = item.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

fn parse_duration_seconds(key: &str, default: u64) -> Duration {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(default))
}

fn parse_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

fn parse_fallback_prices(key: &str) -> HashMap<Chain, f64> {
    let raw = match env::var(key) {
        Ok(v) => v,
        Err(_) => return HashMap::new(),
    };
    parse_price_overrides(&raw)
}

/// `bitcoin=110000,ethereum=3000` style overrides for the static fallback
/// price table. Unknown slugs and unparseable prices are skipped.
fn parse_price_overrides(raw: &str) -> HashMap<Chain, f64> {
    raw.split(',')
        .filter_map(|item| {
            let (slug, value) = item.split_once('=')?;
            let chain = Chain::from_slug(slug.trim())?;
            let price = value.trim().parse::<f64>().ok()?;
            Some((chain, price))
        })
        .collect()
}
