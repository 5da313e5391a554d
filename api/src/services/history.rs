use std::sync::Arc;

use chrono::Utc;
use domain::{Chain, NormalizedTransaction, TrackedAddress, TxDirection};
use explorer::{
    AddressDashboard, DashboardOptions, ExplorerApi, ExplorerError, TransactionDetail,
};
use futures::{StreamExt, stream};
use thiserror::Error;
use tracing::{debug, warn};

use crate::services::classifier;

const NO_HISTORY_MESSAGE: &str =
    "No transaction data available - this address may not have any transactions or may be inactive";

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("rate limit exceeded")]
    RateLimited,
    #[error("invalid {0} address format")]
    InvalidAddress(Chain),
    #[error("unable to fetch transaction data")]
    Upstream(#[source] ExplorerError),
}

/// Terminal result of one history request: entries, or an empty list with
/// an explanatory message when the upstream has no record.
#[derive(Debug, Clone)]
pub struct HistoryReport {
    pub transactions: Vec<NormalizedTransaction>,
    pub total_discovered: usize,
    pub message: Option<String>,
}

impl HistoryReport {
    fn empty() -> Self {
        Self {
            transactions: Vec::new(),
            total_discovered: 0,
            message: None,
        }
    }

    fn empty_with_message(message: &str) -> Self {
        Self {
            message: Some(message.to_string()),
            ..Self::empty()
        }
    }
}

/// Stages of one history request. Degraded paths are ordinary transitions,
/// which keeps each of them testable on its own.
enum Stage {
    DashboardLookup,
    IdExtraction(AddressDashboard),
    RawFallback,
    DetailFetch(Vec<String>),
    Done(HistoryReport),
}

/// Reconstructs a bounded, normalized ledger for one tracked address.
pub struct HistoryBuilder {
    explorer: Arc<dyn ExplorerApi>,
    tx_limit: usize,
    fetch_concurrency: usize,
}

impl HistoryBuilder {
    pub fn new(explorer: Arc<dyn ExplorerApi>, tx_limit: usize, fetch_concurrency: usize) -> Self {
        Self {
            explorer,
            tx_limit: tx_limit.max(1),
            fetch_concurrency: fetch_concurrency.max(1),
        }
    }

    pub async fn build_history(
        &self,
        tracked: &TrackedAddress,
    ) -> Result<HistoryReport, HistoryError> {
        let mut stage = Stage::DashboardLookup;
        loop {
            stage = match stage {
                Stage::DashboardLookup => self.lookup_dashboard(tracked).await?,
                Stage::IdExtraction(dashboard) => Self::extract_ids(tracked.chain, dashboard),
                Stage::RawFallback => self.raw_fallback(tracked).await,
                Stage::DetailFetch(ids) => Stage::Done(self.fetch_details(tracked, ids).await),
                Stage::Done(report) => return Ok(report),
            };
        }
    }

    async fn lookup_dashboard(&self, tracked: &TrackedAddress) -> Result<Stage, HistoryError> {
        let opts = DashboardOptions {
            transaction_details: tracked.chain.is_account_style(),
            limit: Some(self.tx_limit),
        };
        match self
            .explorer
            .address_dashboard(tracked.chain, &tracked.address, opts)
            .await
        {
            Ok(Some(dashboard)) => Ok(Stage::IdExtraction(dashboard)),
            Ok(None) => {
                // Distinguish a structurally bad account address from one
                // the upstream simply hasn't seen.
                if tracked.chain.is_account_style()
                    && !tracked.chain.is_valid_address_format(&tracked.address)
                {
                    return Err(HistoryError::InvalidAddress(tracked.chain));
                }
                Ok(Stage::Done(HistoryReport::empty_with_message(
                    NO_HISTORY_MESSAGE,
                )))
            }
            Err(ExplorerError::RateLimited) => Err(HistoryError::RateLimited),
            Err(err) => Err(HistoryError::Upstream(err)),
        }
    }

    fn extract_ids(chain: Chain, dashboard: AddressDashboard) -> Stage {
        let mut ids = dashboard.transaction_ids;
        if ids.is_empty() && chain.is_account_style() {
            // The account chain sometimes reports activity under `calls`.
            ids = dashboard.call_ids;
        }
        if ids.is_empty() {
            Stage::RawFallback
        } else {
            Stage::DetailFetch(ids)
        }
    }

    /// Secondary discovery. Ids found here skip the detail fetch and come
    /// back as placeholders: degraded fidelity, not an error.
    async fn raw_fallback(&self, tracked: &TrackedAddress) -> Stage {
        match self
            .explorer
            .raw_address_transactions(tracked.chain, &tracked.address, self.tx_limit)
            .await
        {
            Ok(ids) if !ids.is_empty() => {
                debug!(
                    chain = %tracked.chain,
                    address = %tracked.address,
                    count = ids.len(),
                    "raw transaction list fallback used"
                );
                let total_discovered = ids.len();
                let transactions = ids
                    .into_iter()
                    .take(self.tx_limit)
                    .map(placeholder_entry)
                    .collect();
                Stage::Done(HistoryReport {
                    transactions,
                    total_discovered,
                    message: None,
                })
            }
            Ok(_) => Stage::Done(HistoryReport::empty()),
            Err(err) => {
                warn!(
                    error = %err,
                    chain = %tracked.chain,
                    address = %tracked.address,
                    "raw transaction list fetch failed"
                );
                Stage::Done(HistoryReport::empty())
            }
        }
    }

    /// Fetch details for the first `tx_limit` ids, bounded-concurrent and
    /// order-preserving. A failing or absent detail yields a placeholder at
    /// its slot; it never aborts the batch.
    async fn fetch_details(&self, tracked: &TrackedAddress, ids: Vec<String>) -> HistoryReport {
        let total_discovered = ids.len();
        let chain = tracked.chain;
        let subject = tracked.address.as_str();
        let transactions = stream::iter(ids.into_iter().take(self.tx_limit))
            .map(|tx_id| {
                let explorer = self.explorer.clone();
                async move {
                    match explorer.transaction_detail(chain, &tx_id).await {
                        Ok(Some(detail)) => normalized_entry(chain, tx_id, &detail, subject),
                        Ok(None) => placeholder_entry(tx_id),
                        Err(err) => {
                            warn!(error = %err, tx_id = %tx_id, "transaction detail fetch failed");
                            placeholder_entry(tx_id)
                        }
                    }
                }
            })
            .buffered(self.fetch_concurrency)
            .collect::<Vec<_>>()
            .await;

        HistoryReport {
            transactions,
            total_discovered,
            message: None,
        }
    }
}

fn normalized_entry(
    chain: Chain,
    tx_id: String,
    detail: &TransactionDetail,
    subject: &str,
) -> NormalizedTransaction {
    let class = classifier::classify(chain, detail, subject);
    NormalizedTransaction {
        tx_id,
        direction: class.direction,
        amount: class.amount,
        date: detail.transaction.timestamp().unwrap_or_else(Utc::now),
        block_height: detail.transaction.block_id.unwrap_or(0),
    }
}

fn placeholder_entry(tx_id: String) -> NormalizedTransaction {
    NormalizedTransaction {
        tx_id,
        direction: TxDirection::Unknown,
        amount: 0.0,
        date: Utc::now(),
        block_height: 0,
    }
}
