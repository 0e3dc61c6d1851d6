//! Time-bounded in-memory cache over any market-data provider.
//!
//! Price windows are keyed by `(ticker, start, end)` and dividend histories by
//! ticker. Entries older than the TTL are refetched. Intraday momentum is never
//! cached: the regime reading must be fresh on every run.

use super::provider::{DataError, MarketDataProvider};
use crate::domain::{DividendEvent, PriceSeries};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default time-to-live for cached series.
pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);

type PriceKey = (String, NaiveDate, NaiveDate);

#[derive(Debug)]
struct Entry<T> {
    stored_at: Instant,
    value: T,
}

#[derive(Debug)]
struct TtlMap<K, V> {
    entries: Mutex<HashMap<K, Entry<V>>>,
}

impl<K: Eq + Hash, V: Clone> TtlMap<K, V> {
    fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn get(&self, key: &K, ttl: Duration) -> Option<V> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .get(key)
            .filter(|entry| entry.stored_at.elapsed() < ttl)
            .map(|entry| entry.value.clone())
    }

    fn put(&self, key: K, value: V) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            key,
            Entry {
                stored_at: Instant::now(),
                value,
            },
        );
    }

    fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn clear(&self) {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

/// Provider wrapper that memoises price and dividend fetches for a TTL.
#[derive(Debug)]
pub struct CachedProvider<P> {
    inner: P,
    ttl: Duration,
    prices: TtlMap<PriceKey, PriceSeries>,
    dividends: TtlMap<String, Vec<DividendEvent>>,
}

impl<P: MarketDataProvider> CachedProvider<P> {
    pub fn new(inner: P) -> Self {
        Self::with_ttl(inner, DEFAULT_TTL)
    }

    pub fn with_ttl(inner: P, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            prices: TtlMap::new(),
            dividends: TtlMap::new(),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Number of cached entries (price windows + dividend histories).
    pub fn len(&self) -> usize {
        self.prices.len() + self.dividends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.prices.clear();
        self.dividends.clear();
    }
}

impl<P: MarketDataProvider> MarketDataProvider for CachedProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn price_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, DataError> {
        let key = (ticker.to_string(), start, end);
        if let Some(series) = self.prices.get(&key, self.ttl) {
            log::debug!("price cache hit for {ticker} {start}..{end}");
            return Ok(series);
        }
        let series = self.inner.price_history(ticker, start, end)?;
        self.prices.put(key, series.clone());
        Ok(series)
    }

    fn dividend_history(&self, ticker: &str) -> Result<Vec<DividendEvent>, DataError> {
        let key = ticker.to_string();
        if let Some(events) = self.dividends.get(&key, self.ttl) {
            log::debug!("dividend cache hit for {ticker}");
            return Ok(events);
        }
        let events = self.inner.dividend_history(ticker)?;
        self.dividends.put(key, events.clone());
        Ok(events)
    }

    fn intraday_momentum(&self, ticker: &str, window: usize) -> Result<Option<f64>, DataError> {
        self.inner.intraday_momentum(ticker, window)
    }
}
