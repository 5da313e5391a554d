pub mod classifier;
pub mod history;
pub mod portfolio;
pub mod prices;

pub use classifier::{Classification, classify};
pub use history::{HistoryBuilder, HistoryError, HistoryReport};
pub use portfolio::{PortfolioAggregator, PortfolioSummary};
pub use prices::{FallbackPriceTable, PriceResolver};
