use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The closed set of supported chains. Anything else is rejected at the
/// HTTP boundary before it can reach the aggregation core.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Chain {
    Bitcoin,
    Ethereum,
    Dogecoin,
    Litecoin,
    BitcoinCash,
}

impl Chain {
    pub const ALL: [Chain; 5] = [
        Chain::Bitcoin,
        Chain::Ethereum,
        Chain::Dogecoin,
        Chain::Litecoin,
        Chain::BitcoinCash,
    ];

    /// Upstream URL path segment for this chain.
    pub fn slug(self) -> &'static str {
        match self {
            Chain::Bitcoin => "bitcoin",
            Chain::Ethereum => "ethereum",
            Chain::Dogecoin => "dogecoin",
            Chain::Litecoin => "litecoin",
            Chain::BitcoinCash => "bitcoin-cash",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Chain> {
        Chain::ALL.into_iter().find(|chain| chain.slug() == slug)
    }

    /// Ethereum carries explicit sender/recipient fields; the other four
    /// chains derive direction from UTXO input/output matching.
    pub fn is_account_style(self) -> bool {
        matches!(self, Chain::Ethereum)
    }

    /// Smallest-unit-per-main-unit divisor (satoshi-style 1e8, wei 1e18).
    pub fn divisor(self) -> f64 {
        if self.is_account_style() {
            1e18
        } else {
            1e8
        }
    }

    /// Convert a smallest-unit amount into the chain's main unit.
    pub fn to_main_unit(self, raw: f64) -> f64 {
        raw / self.divisor()
    }

    /// Structural plausibility check only. Ethereum addresses have a fixed
    /// shape; the UTXO chains use several encodings so only obvious garbage
    /// is rejected for them.
    pub fn is_valid_address_format(self, address: &str) -> bool {
        match self {
            Chain::Ethereum => {
                address.len() == 42
                    && address.starts_with("0x")
                    && address[2..].bytes().all(|b| b.is_ascii_hexdigit())
            }
            _ => {
                (20..=90).contains(&address.len())
                    && address
                        .bytes()
                        .all(|b| b.is_ascii_alphanumeric() || b == b':')
            }
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// A wallet address registered by a user.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TrackedAddress {
    pub id: Uuid,
    pub user_id: Uuid,
    pub chain: Chain,
    pub address: String,
}

/// Direction of a transaction relative to the subject address. Amounts are
/// always non-negative; the sign lives here.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TxDirection {
    Send,
    Receive,
    Unknown,
}

/// One normalized entry of an address's reconstructed ledger. Recomputed on
/// every request, never persisted.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct NormalizedTransaction {
    pub tx_id: String,
    #[serde(rename = "type")]
    pub direction: TxDirection,
    pub amount: f64,
    pub date: DateTime<Utc>,
    pub block_height: i64,
}

/// Per-address result of one aggregation pass. Exactly one of the valued
/// fields or `error` is present, carried by the outcome enum.
#[derive(Debug, Serialize, Clone)]
pub struct PortfolioLine {
    pub id: Uuid,
    pub chain: Chain,
    pub address: String,
    #[serde(flatten)]
    pub outcome: LineOutcome,
}

#[derive(Debug, Serialize, Clone)]
#[serde(untagged)]
pub enum LineOutcome {
    Valued {
        balance_raw: f64,
        balance: f64,
        current_price: f64,
        estimated_value_usd: f64,
    },
    Failed {
        error: String,
    },
}

impl PortfolioLine {
    pub fn valued(
        tracked: &TrackedAddress,
        balance_raw: f64,
        balance: f64,
        current_price: f64,
        estimated_value_usd: f64,
    ) -> Self {
        Self {
            id: tracked.id,
            chain: tracked.chain,
            address: tracked.address.clone(),
            outcome: LineOutcome::Valued {
                balance_raw,
                balance,
                current_price,
                estimated_value_usd,
            },
        }
    }

    pub fn failed(tracked: &TrackedAddress, error: impl Into<String>) -> Self {
        Self {
            id: tracked.id,
            chain: tracked.chain,
            address: tracked.address.clone(),
            outcome: LineOutcome::Failed {
                error: error.into(),
            },
        }
    }

    pub fn estimated_value_usd(&self) -> Option<f64> {
        match &self.outcome {
            LineOutcome::Valued {
                estimated_value_usd,
                ..
            } => Some(*estimated_value_usd),
            LineOutcome::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AddAddressRequest {
    pub chain: Chain,
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct AddressResponse {
    pub id: Uuid,
    pub chain: Chain,
    pub address: String,
}

impl From<TrackedAddress> for AddressResponse {
    fn from(tracked: TrackedAddress) -> Self {
        Self {
            id: tracked.id,
            chain: tracked.chain,
            address: tracked.address,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PortfolioResponse {
    pub portfolio: Vec<PortfolioLine>,
    pub total_portfolio_value_usd: f64,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct TransactionHistoryResponse {
    pub address: String,
    pub chain: Chain,
    pub transactions: Vec<NormalizedTransaction>,
    pub total_transactions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_slugs_round_trip() {
        for chain in Chain::ALL {
            assert_eq!(Chain::from_slug(chain.slug()), Some(chain));
        }
        assert_eq!(Chain::from_slug("solana"), None);
        assert_eq!(Chain::from_slug(""), None);
    }

    #[test]
    fn chain_serde_uses_kebab_case_slugs() {
        let json = serde_json::to_string(&Chain::BitcoinCash).unwrap();
        assert_eq!(json, "\"bitcoin-cash\"");
        let parsed: Chain = serde_json::from_str("\"dogecoin\"").unwrap();
        assert_eq!(parsed, Chain::Dogecoin);
        assert!(serde_json::from_str::<Chain>("\"tron\"").is_err());
    }

    #[test]
    fn to_main_unit_inverts_divisor() {
        for chain in Chain::ALL {
            let raw = 123_456_789.0;
            let main = chain.to_main_unit(raw);
            assert!((main * chain.divisor() - raw).abs() < 1e-6);
        }
        assert_eq!(Chain::Bitcoin.to_main_unit(100_000_000.0), 1.0);
        assert_eq!(Chain::Ethereum.to_main_unit(2e18), 2.0);
    }

    #[test]
    fn ethereum_address_format() {
        let valid = format!("0x{}", "a1".repeat(20));
        assert!(Chain::Ethereum.is_valid_address_format(&valid));
        assert!(!Chain::Ethereum.is_valid_address_format("0x1234"));
        assert!(!Chain::Ethereum.is_valid_address_format(&format!("0x{}", "zz".repeat(20))));
        assert!(!Chain::Ethereum.is_valid_address_format(&format!("1x{}", "a1".repeat(20))));
    }

    #[test]
    fn utxo_address_format_rejects_garbage() {
        assert!(Chain::Bitcoin.is_valid_address_format("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4"));
        assert!(Chain::BitcoinCash
            .is_valid_address_format("bitcoincash:qpm2qsznhks23z7629mms6s4cwef74vcwvy22gdx6a"));
        assert!(!Chain::Bitcoin.is_valid_address_format(""));
        assert!(!Chain::Bitcoin.is_valid_address_format("has spaces in it which is wrong"));
    }

    #[test]
    fn portfolio_line_outcome_is_exclusive() {
        let tracked = TrackedAddress {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            chain: Chain::Bitcoin,
            address: "addr".repeat(6),
        };
        let valued = PortfolioLine::valued(&tracked, 1e8, 1.0, 50_000.0, 50_000.0);
        assert_eq!(valued.estimated_value_usd(), Some(50_000.0));
        let body = serde_json::to_value(&valued).unwrap();
        assert!(body.get("error").is_none());
        assert_eq!(body["estimated_value_usd"], 50_000.0);

        let failed = PortfolioLine::failed(&tracked, "boom");
        assert_eq!(failed.estimated_value_usd(), None);
        let body = serde_json::to_value(&failed).unwrap();
        assert!(body.get("estimated_value_usd").is_none());
        assert_eq!(body["error"], "boom");
    }
}
