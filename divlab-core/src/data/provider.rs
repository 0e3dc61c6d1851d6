//! Market-data provider trait and structured error types.
//!
//! The MarketDataProvider trait abstracts over data sources (Yahoo Finance,
//! in-memory fixtures) so the engine never depends on a particular vendor and
//! tests run without network access.

use crate::domain::{DividendEvent, DomainError, PriceSeries};
use chrono::NaiveDate;
use thiserror::Error;

/// Structured error types for data operations.
///
/// These are designed to be displayable in CLI output as-is.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {ticker}")]
    SymbolNotFound { ticker: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("invalid data: {0}")]
    Invalid(#[from] DomainError),

    #[error("data error: {0}")]
    Other(String),
}

/// Source of daily closes, dividend schedules and intraday momentum.
///
/// Implementations fetch; they don't cache. Caching is layered on top with
/// [`super::cache::CachedProvider`].
pub trait MarketDataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Daily closes with `start <= date <= end`. May be empty.
    fn price_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, DataError>;

    /// Full dividend history, ascending by ex-date. May be empty.
    fn dividend_history(&self, ticker: &str) -> Result<Vec<DividendEvent>, DataError>;

    /// Fractional change over the trailing `window` intraday samples.
    ///
    /// `Ok(None)` when fewer than `window + 1` samples exist.
    fn intraday_momentum(&self, ticker: &str, window: usize) -> Result<Option<f64>, DataError>;
}

impl<P: MarketDataProvider + ?Sized> MarketDataProvider for &P {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn price_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, DataError> {
        (**self).price_history(ticker, start, end)
    }

    fn dividend_history(&self, ticker: &str) -> Result<Vec<DividendEvent>, DataError> {
        (**self).dividend_history(ticker)
    }

    fn intraday_momentum(&self, ticker: &str, window: usize) -> Result<Option<f64>, DataError> {
        (**self).intraday_momentum(ticker, window)
    }
}

/// Fractional change between the sample `window` steps back and the last one.
pub fn trailing_change(samples: &[f64], window: usize) -> Option<f64> {
    if window == 0 || samples.len() < window + 1 {
        return None;
    }
    let last = samples[samples.len() - 1];
    let anchor = samples[samples.len() - 1 - window];
    if !anchor.is_finite() || !last.is_finite() || anchor == 0.0 {
        return None;
    }
    Some((last - anchor) / anchor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_change_basic() {
        let samples = [99.0, 100.0, 100.5, 101.0];
        let change = trailing_change(&samples, 2).unwrap();
        assert!((change - 0.01).abs() < 1e-12);
    }

    #[test]
    fn trailing_change_needs_enough_samples() {
        assert_eq!(trailing_change(&[1.0, 2.0], 2), None);
        assert_eq!(trailing_change(&[1.0, 2.0], 0), None);
        assert_eq!(trailing_change(&[0.0, 2.0], 1), None);
    }
}
