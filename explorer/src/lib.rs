//! Client for the third-party block-explorer API. One URL template serves
//! all five chains; payload shapes differ per chain family, so decoding is
//! deliberately lenient and the callers decide what absence means.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use domain::Chain;
use reqwest::Client;
pub use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub type ExplorerResult<T> = Result<T, ExplorerError>;

/// Upstream status 430 is the explorer's rate-limit signal and is kept
/// separate from the generic status bucket.
const RATE_LIMIT_STATUS: u16 = 430;

#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error("explorer rate limited")]
    RateLimited,
    #[error("explorer returned status {0}")]
    Upstream(StatusCode),
    #[error("explorer request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed explorer payload: {0}")]
    MalformedPayload(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainStats {
    pub market_price_usd: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DashboardOptions {
    /// Ask the upstream to embed transaction details (account-style chains).
    pub transaction_details: bool,
    pub limit: Option<usize>,
}

/// Summary payload for one address: balance plus recent transaction ids.
/// `call_ids` carries the alternate `calls` field the account-style chain
/// sometimes populates instead of `transactions`.
#[derive(Debug, Clone, Default)]
pub struct AddressDashboard {
    pub balance_raw: f64,
    pub transaction_ids: Vec<String>,
    pub call_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TransactionDetail {
    #[serde(default)]
    pub transaction: TransactionSummary,
    #[serde(default)]
    pub inputs: Vec<TxSlot>,
    #[serde(default)]
    pub outputs: Vec<TxSlot>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TransactionSummary {
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub recipient: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub value: f64,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub block_id: Option<i64>,
}

impl TransactionSummary {
    /// Upstream timestamps arrive as `YYYY-MM-DD HH:MM:SS` (UTC) or, for
    /// some chains, RFC 3339.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let raw = self.time.as_deref()?;
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
            return Some(naive.and_utc());
        }
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|parsed| parsed.with_timezone(&Utc))
    }
}

/// One input or output leg of a UTXO transaction.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TxSlot {
    #[serde(default)]
    pub spending_address: Option<String>,
    #[serde(default)]
    pub recipient: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub value: f64,
}

/// Boundary to the explorer. Object-safe so services and tests can swap the
/// HTTP implementation for a scripted one.
#[async_trait]
pub trait ExplorerApi: Send + Sync {
    async fn chain_stats(&self, chain: Chain) -> ExplorerResult<ChainStats>;

    /// `Ok(None)` means the upstream has no record of the address; callers
    /// treat that as empty data, not an error.
    async fn address_dashboard(
        &self,
        chain: Chain,
        address: &str,
        opts: DashboardOptions,
    ) -> ExplorerResult<Option<AddressDashboard>>;

    async fn transaction_detail(
        &self,
        chain: Chain,
        tx_id: &str,
    ) -> ExplorerResult<Option<TransactionDetail>>;

    /// Secondary discovery path: a plain list of transaction ids with no
    /// structured detail attached.
    async fn raw_address_transactions(
        &self,
        chain: Chain,
        address: &str,
        limit: usize,
    ) -> ExplorerResult<Vec<String>>;
}

#[derive(Debug, Clone)]
pub struct ExplorerConfig {
    pub api_base: String,
    pub api_key: Option<String>,
    pub request_timeout: Duration,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.blockchair.com".to_string(),
            api_key: None,
            request_timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Clone)]
pub struct BlockchairClient {
    client: Client,
    config: ExplorerConfig,
}

impl BlockchairClient {
    pub fn new(config: ExplorerConfig) -> ExplorerResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, chain: Chain, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.api_base.trim_end_matches('/'),
            chain.slug(),
            path
        )
    }

    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> ExplorerResult<Value> {
        let mut request = self.client.get(url).query(query);
        if let Some(key) = &self.config.api_key {
            request = request.query(&[("key", key.as_str())]);
        }
        debug!(%url, "explorer request");
        let response = request.send().await?;
        let status = response.status();
        if status.as_u16() == RATE_LIMIT_STATUS {
            return Err(ExplorerError::RateLimited);
        }
        if !status.is_success() {
            return Err(ExplorerError::Upstream(status));
        }
        Ok(response.json::<Value>().await?)
    }

    fn dashboard_query(chain: Chain, opts: DashboardOptions) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if opts.transaction_details {
            query.push(("transaction_details", "true".to_string()));
        }
        if let Some(limit) = opts.limit {
            // UTXO dashboards take a `txs,utxos` pair; account dashboards a
            // plain count.
            if chain.is_account_style() {
                query.push(("limit", limit.to_string()));
            } else {
                query.push(("limit", format!("{limit},0")));
            }
        }
        query
    }
}

#[async_trait]
impl ExplorerApi for BlockchairClient {
    async fn chain_stats(&self, chain: Chain) -> ExplorerResult<ChainStats> {
        let url = self.endpoint(chain, "stats");
        let body = self.get_json(&url, &[]).await?;
        parse_stats(&body)
    }

    async fn address_dashboard(
        &self,
        chain: Chain,
        address: &str,
        opts: DashboardOptions,
    ) -> ExplorerResult<Option<AddressDashboard>> {
        let url = self.endpoint(chain, &format!("dashboards/address/{address}"));
        let query = Self::dashboard_query(chain, opts);
        match self.get_json(&url, &query).await {
            Ok(body) => parse_dashboard(address, &body),
            Err(ExplorerError::Upstream(status)) if status == StatusCode::NOT_FOUND => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn transaction_detail(
        &self,
        chain: Chain,
        tx_id: &str,
    ) -> ExplorerResult<Option<TransactionDetail>> {
        let url = self.endpoint(chain, &format!("dashboards/transaction/{tx_id}"));
        match self.get_json(&url, &[]).await {
            Ok(body) => parse_transaction_detail(tx_id, &body),
            Err(ExplorerError::Upstream(status)) if status == StatusCode::NOT_FOUND => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn raw_address_transactions(
        &self,
        chain: Chain,
        address: &str,
        limit: usize,
    ) -> ExplorerResult<Vec<String>> {
        // The account-style chain has no raw list endpoint; a plain
        // dashboard re-fetch is the closest the upstream offers.
        let (url, query) = if chain.is_account_style() {
            (
                self.endpoint(chain, &format!("dashboards/address/{address}")),
                Vec::new(),
            )
        } else {
            (
                self.endpoint(chain, &format!("addresses/{address}/transactions")),
                vec![("limit", limit.to_string())],
            )
        };
        match self.get_json(&url, &query).await {
            Ok(body) => {
                if chain.is_account_style() {
                    Ok(parse_dashboard(address, &body)?
                        .map(|dashboard| dashboard.transaction_ids)
                        .unwrap_or_default())
                } else {
                    Ok(parse_raw_transaction_list(&body))
                }
            }
            Err(ExplorerError::Upstream(status)) if status == StatusCode::NOT_FOUND => {
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }
}

fn parse_stats(body: &Value) -> ExplorerResult<ChainStats> {
    let data = body
        .get("data")
        .ok_or(ExplorerError::MalformedPayload("stats missing data object"))?;
    let market_price_usd = data
        .get("market_price_usd")
        .and_then(Value::as_f64)
        .ok_or(ExplorerError::MalformedPayload("stats missing market_price_usd"))?;
    Ok(ChainStats { market_price_usd })
}

fn parse_dashboard(address: &str, body: &Value) -> ExplorerResult<Option<AddressDashboard>> {
    let data = body
        .get("data")
        .ok_or(ExplorerError::MalformedPayload("dashboard missing data object"))?;
    let entry = match data.get(address) {
        Some(entry) if !entry.is_null() => entry,
        _ => return Ok(None),
    };
    let summary = entry
        .get("address")
        .ok_or(ExplorerError::MalformedPayload("dashboard missing address summary"))?;
    let balance_raw = summary
        .get("balance")
        .map(lenient_number)
        .unwrap_or_default();
    Ok(Some(AddressDashboard {
        balance_raw,
        transaction_ids: id_strings(entry.get("transactions")),
        call_ids: id_strings(entry.get("calls")),
    }))
}

fn parse_transaction_detail(tx_id: &str, body: &Value) -> ExplorerResult<Option<TransactionDetail>> {
    let data = body
        .get("data")
        .ok_or(ExplorerError::MalformedPayload("detail missing data object"))?;
    let entry = match data.get(tx_id) {
        Some(entry) if !entry.is_null() => entry,
        _ => return Ok(None),
    };
    serde_json::from_value(entry.clone())
        .map(Some)
        .map_err(|_| ExplorerError::MalformedPayload("detail entry has unexpected shape"))
}

fn parse_raw_transaction_list(body: &Value) -> Vec<String> {
    id_strings(body.get("data"))
}

/// The upstream lists transaction ids either as bare strings or as objects
/// carrying a hash field, depending on chain and endpoint.
fn id_strings(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(id) => Some(id.clone()),
            Value::Object(fields) => fields
                .get("hash")
                .or_else(|| fields.get("transaction_hash"))
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        })
        .collect()
}

/// Numeric fields arrive as JSON numbers or decimal strings depending on
/// the chain; anything unreadable counts as zero.
fn lenient_number(value: &Value) -> f64 {
    match value {
        Value::Number(number) => number.as_f64().unwrap_or_default(),
        Value::String(text) => text.parse().unwrap_or_default(),
        _ => 0.0,
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(lenient_number(&value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_stats_price() {
        let body = json!({"data": {"market_price_usd": 64250.5, "blocks": 850000}});
        let stats = parse_stats(&body).unwrap();
        assert_eq!(stats.market_price_usd, 64250.5);

        let missing = json!({"data": {"blocks": 850000}});
        assert!(matches!(
            parse_stats(&missing),
            Err(ExplorerError::MalformedPayload(_))
        ));
    }

    #[test]
    fn parses_dashboard_with_string_balance() {
        let body = json!({
            "data": {
                "0xabc": {
                    "address": {"balance": "2000000000000000000"},
                    "calls": ["0xdead", "0xbeef"]
                }
            }
        });
        let dashboard = parse_dashboard("0xabc", &body).unwrap().unwrap();
        assert_eq!(dashboard.balance_raw, 2e18);
        assert!(dashboard.transaction_ids.is_empty());
        assert_eq!(dashboard.call_ids, vec!["0xdead", "0xbeef"]);
    }

    #[test]
    fn dashboard_without_address_entry_is_none() {
        let body = json!({"data": {}});
        assert!(parse_dashboard("1BoatSLRHtKNngkdXEeobR76b53LETtpyT", &body)
            .unwrap()
            .is_none());
    }

    #[test]
    fn dashboard_id_lists_accept_hash_objects() {
        let body = json!({
            "data": {
                "addr": {
                    "address": {"balance": 5000},
                    "transactions": [
                        "plainhash",
                        {"hash": "objecthash"},
                        {"transaction_hash": "otherhash"},
                        42
                    ]
                }
            }
        });
        let dashboard = parse_dashboard("addr", &body).unwrap().unwrap();
        assert_eq!(
            dashboard.transaction_ids,
            vec!["plainhash", "objecthash", "otherhash"]
        );
        assert_eq!(dashboard.balance_raw, 5000.0);
    }

    #[test]
    fn parses_utxo_transaction_detail() {
        let body = json!({
            "data": {
                "txid1": {
                    "transaction": {"time": "2024-03-01 08:30:00", "block_id": 832000},
                    "inputs": [{"spending_address": "addr1", "value": 700}],
                    "outputs": [{"recipient": "addr2", "value": 650}]
                }
            }
        });
        let detail = parse_transaction_detail("txid1", &body).unwrap().unwrap();
        assert_eq!(detail.inputs.len(), 1);
        assert_eq!(detail.inputs[0].value, 700.0);
        assert_eq!(detail.outputs[0].recipient.as_deref(), Some("addr2"));
        assert_eq!(detail.transaction.block_id, Some(832000));
        let ts = detail.transaction.timestamp().unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-03-01T08:30:00+00:00");
    }

    #[test]
    fn missing_detail_entry_is_none() {
        let body = json!({"data": {}});
        assert!(parse_transaction_detail("txid1", &body).unwrap().is_none());
        let null_entry = json!({"data": {"txid1": null}});
        assert!(parse_transaction_detail("txid1", &null_entry)
            .unwrap()
            .is_none());
    }

    #[test]
    fn raw_list_is_plain_data_array() {
        let body = json!({"data": ["a", "b", "c"]});
        assert_eq!(parse_raw_transaction_list(&body), vec!["a", "b", "c"]);
        let not_a_list = json!({"data": {"unexpected": true}});
        assert!(parse_raw_transaction_list(&not_a_list).is_empty());
    }
}
