//! Universe loading for the runner.
//!
//! Each ticker is fetched exactly once per run: its dividend history is cut
//! to the lookback window, then one padded price window covering every event
//! is requested. The resulting [`Universe`] is immutable and shared by the
//! backtest and every sweep cell.
//!
//! Per-ticker problems (no dividends, no events in the window, no prices, a
//! vendor error for that symbol) skip the ticker and are recorded. Only a
//! tripped circuit breaker aborts the load, since every later request would
//! fail the same way.

use chrono::NaiveDate;
use divlab_core::data::{DataError, MarketDataProvider};
use divlab_core::domain::{ensure_distinct, DividendEvent, PriceSeries};
use divlab_core::events::extract_events;
use divlab_core::trade_builder::price_window;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("data provider unavailable: {0}")]
    ProviderUnavailable(#[source] DataError),
}

/// Options controlling what gets loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    pub years_back: u32,
    /// Largest buy offset any evaluation will use; sizes the price padding.
    pub max_buy_offset_days: u32,
    pub as_of: NaiveDate,
}

/// Why a ticker was left out of the universe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    NoDividends,
    NoEventsInWindow,
    /// The padded price window leaves the representable calendar.
    WindowOutOfRange,
    NoPrices,
    Fetch { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedTicker {
    pub ticker: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// Prices and in-window dividend events for one ticker.
#[derive(Debug, Clone, PartialEq)]
pub struct TickerData {
    pub ticker: String,
    pub prices: PriceSeries,
    /// Ascending by ex-date.
    pub events: Vec<DividendEvent>,
}

/// All per-ticker data for one run, in the caller's ticker order.
#[derive(Debug, Clone, PartialEq)]
pub struct Universe {
    pub as_of: NaiveDate,
    pub years_back: u32,
    tickers: Vec<TickerData>,
    skipped: Vec<SkippedTicker>,
}

impl Universe {
    pub fn new(
        as_of: NaiveDate,
        years_back: u32,
        tickers: Vec<TickerData>,
        skipped: Vec<SkippedTicker>,
    ) -> Self {
        Self {
            as_of,
            years_back,
            tickers,
            skipped,
        }
    }

    pub fn tickers(&self) -> &[TickerData] {
        &self.tickers
    }

    pub fn skipped(&self) -> &[SkippedTicker] {
        &self.skipped
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }

    pub fn event_count(&self) -> usize {
        self.tickers.iter().map(|t| t.events.len()).sum()
    }

    /// BLAKE3 over every loaded close and dividend, for run fingerprinting.
    pub fn dataset_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for t in &self.tickers {
            hasher.update(t.ticker.as_bytes());
            for p in t.prices.points() {
                hasher.update(p.date.to_string().as_bytes());
                hasher.update(&p.close.to_le_bytes());
            }
            for e in &t.events {
                hasher.update(e.ex_date.to_string().as_bytes());
                hasher.update(&e.amount.to_le_bytes());
            }
        }
        hasher.finalize().to_hex().to_string()
    }
}

/// Fetch every ticker once and assemble the run's universe.
pub fn load_universe<P: MarketDataProvider + ?Sized>(
    provider: &P,
    tickers: &[String],
    opts: &LoadOptions,
) -> Result<Universe, LoadError> {
    let mut loaded = Vec::with_capacity(tickers.len());
    let mut skipped = Vec::new();

    for ticker in tickers {
        match load_ticker(provider, ticker, opts) {
            Ok(data) => {
                log::info!(
                    "{ticker}: {} events, {} sessions",
                    data.events.len(),
                    data.prices.len()
                );
                loaded.push(data);
            }
            Err(Skip::Reason(reason)) => {
                log::warn!("skipping {ticker}: {reason:?}");
                skipped.push(SkippedTicker {
                    ticker: ticker.clone(),
                    reason,
                });
            }
            Err(Skip::Fatal(e)) => return Err(LoadError::ProviderUnavailable(e)),
        }
    }

    Ok(Universe::new(opts.as_of, opts.years_back, loaded, skipped))
}

enum Skip {
    Reason(SkipReason),
    Fatal(DataError),
}

impl From<DataError> for Skip {
    fn from(e: DataError) -> Self {
        match e {
            DataError::CircuitBreakerTripped => Skip::Fatal(e),
            other => Skip::Reason(SkipReason::Fetch {
                message: other.to_string(),
            }),
        }
    }
}

fn load_ticker<P: MarketDataProvider + ?Sized>(
    provider: &P,
    ticker: &str,
    opts: &LoadOptions,
) -> Result<TickerData, Skip> {
    let history = provider.dividend_history(ticker)?;
    if history.is_empty() {
        return Err(Skip::Reason(SkipReason::NoDividends));
    }

    if let Err(e) = ensure_distinct(&history) {
        log::warn!("{e}; keeping the first event per ex-date");
    }

    let events = extract_events(&history, opts.years_back, opts.as_of);
    if events.is_empty() {
        return Err(Skip::Reason(SkipReason::NoEventsInWindow));
    }
    let Some((start, end)) = price_window(&events, opts.max_buy_offset_days) else {
        return Err(Skip::Reason(SkipReason::WindowOutOfRange));
    };

    let prices = provider.price_history(ticker, start, end)?;
    if prices.is_empty() {
        return Err(Skip::Reason(SkipReason::NoPrices));
    }

    Ok(TickerData {
        ticker: ticker.to_string(),
        prices,
        events,
    })
}
