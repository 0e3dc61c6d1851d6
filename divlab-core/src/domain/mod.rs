//! Domain types for DivLab

pub mod dividend;
pub mod price;
pub mod trade;

pub use dividend::{ensure_distinct, DividendEvent};
pub use price::{PricePoint, PriceSeries};
pub use trade::{Trade, TradeParameters};

use chrono::NaiveDate;
use thiserror::Error;

/// Violations of the domain invariants, raised at construction time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error("price series for '{ticker}' is not strictly increasing at {date}")]
    UnorderedSeries { ticker: String, date: NaiveDate },

    #[error("dividend for '{ticker}' on {ex_date} has negative amount {amount}")]
    NegativeDividend {
        ticker: String,
        ex_date: NaiveDate,
        amount: f64,
    },

    #[error("duplicate dividend for '{ticker}' on {ex_date}")]
    DuplicateDividend { ticker: String, ex_date: NaiveDate },
}
