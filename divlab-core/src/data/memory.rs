//! In-memory provider for fixtures and offline runs.

use super::provider::{trailing_change, DataError, MarketDataProvider};
use crate::domain::{DividendEvent, PriceSeries};
use chrono::NaiveDate;
use std::collections::HashMap;

/// Serves prebuilt series. Unknown tickers get empty data, not errors, the
/// same way a vendor answers for a ticker that never paid a dividend.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    prices: HashMap<String, PriceSeries>,
    dividends: HashMap<String, Vec<DividendEvent>>,
    intraday: HashMap<String, Vec<f64>>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prices(mut self, series: PriceSeries) -> Self {
        self.prices.insert(series.ticker().to_string(), series);
        self
    }

    pub fn with_dividends(mut self, ticker: &str, mut events: Vec<DividendEvent>) -> Self {
        events.sort_by_key(|e| e.ex_date);
        self.dividends.insert(ticker.to_string(), events);
        self
    }

    pub fn with_intraday(mut self, ticker: &str, samples: Vec<f64>) -> Self {
        self.intraday.insert(ticker.to_string(), samples);
        self
    }
}

impl MarketDataProvider for InMemoryProvider {
    fn name(&self) -> &str {
        "in_memory"
    }

    fn price_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, DataError> {
        match self.prices.get(ticker) {
            Some(series) => Ok(PriceSeries::new(ticker, series.slice(start, end).to_vec())?),
            None => Ok(PriceSeries::empty(ticker)),
        }
    }

    fn dividend_history(&self, ticker: &str) -> Result<Vec<DividendEvent>, DataError> {
        Ok(self.dividends.get(ticker).cloned().unwrap_or_default())
    }

    fn intraday_momentum(&self, ticker: &str, window: usize) -> Result<Option<f64>, DataError> {
        Ok(self
            .intraday
            .get(ticker)
            .and_then(|samples| trailing_change(samples, window)))
    }
}
