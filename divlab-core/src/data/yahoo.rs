//! Yahoo Finance data provider.
//!
//! Uses the v8 chart API for all three feeds:
//! - daily closes (`interval=1d`)
//! - dividend schedule (`events=div`, full range)
//! - intraday closes for the momentum reading (`range=1d&interval=5m`)
//!
//! Yahoo has no official API and changes format without notice, so every
//! parse failure surfaces as `ResponseFormatChanged` rather than a panic.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{trailing_change, DataError, MarketDataProvider};
use crate::domain::{DividendEvent, PricePoint, PriceSeries};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
    events: Option<ChartEvents>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct ChartEvents {
    dividends: Option<HashMap<String, DividendData>>,
}

#[derive(Debug, Deserialize)]
struct DividendData {
    amount: f64,
    date: i64,
}

/// Yahoo Finance provider with retry and circuit-breaker protection.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooProvider {
    pub fn new(circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        })
    }

    fn daily_url(ticker: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = day_start_ts(start);
        let end_ts = day_start_ts(end) + 86_399;
        format!("{BASE_URL}/{ticker}?period1={start_ts}&period2={end_ts}&interval=1d")
    }

    fn dividends_url(ticker: &str) -> String {
        format!("{BASE_URL}/{ticker}?range=max&interval=1mo&events=div")
    }

    fn intraday_url(ticker: &str) -> String {
        format!("{BASE_URL}/{ticker}?range=1d&interval=5m")
    }

    fn first_result(ticker: &str, resp: ChartResponse) -> Result<ChartData, DataError> {
        let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
            Some(err) if err.code == "Not Found" => DataError::SymbolNotFound {
                ticker: ticker.to_string(),
            },
            Some(err) => {
                DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
            }
            None => DataError::ResponseFormatChanged("empty result with no error".into()),
        })?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))
    }

    /// Timestamped closes, skipping null samples (halts, holidays).
    fn parse_closes(data: &ChartData) -> Result<Vec<(NaiveDate, f64)>, DataError> {
        let Some(timestamps) = data.timestamp.as_ref() else {
            // Yahoo omits the timestamp array when the range has no sessions
            return Ok(Vec::new());
        };
        let quote = data
            .indicators
            .quote
            .first()
            .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;

        let mut closes = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let Some(close) = quote.close.get(i).copied().flatten() else {
                continue;
            };
            closes.push((ts_to_date(ts)?, close));
        }
        Ok(closes)
    }

    fn parse_prices(ticker: &str, data: &ChartData) -> Result<PriceSeries, DataError> {
        let points = Self::parse_closes(data)?
            .into_iter()
            .map(|(date, close)| PricePoint::new(date, close))
            .collect();
        Ok(PriceSeries::from_unsorted(ticker, points))
    }

    fn parse_dividends(ticker: &str, data: &ChartData) -> Result<Vec<DividendEvent>, DataError> {
        let Some(dividends) = data.events.as_ref().and_then(|e| e.dividends.as_ref()) else {
            return Ok(Vec::new());
        };
        let mut events = dividends
            .values()
            .map(|div| Ok(DividendEvent::new(ticker, ts_to_date(div.date)?, div.amount)?))
            .collect::<Result<Vec<_>, DataError>>()?;
        events.sort_by_key(|e| e.ex_date);
        events.dedup_by_key(|e| e.ex_date);
        Ok(events)
    }

    /// Execute a single chart request with retry and circuit breaker logic.
    fn fetch_chart(&self, ticker: &str, url: &str) -> Result<ChartData, DataError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(DataError::CircuitBreakerTripped);
        }

        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                log::debug!("retrying {ticker} in {delay:?} (attempt {attempt})");
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(DataError::CircuitBreakerTripped);
            }

            match self.client.get(url).send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::FORBIDDEN {
                        self.circuit_breaker.trip();
                        return Err(DataError::CircuitBreakerTripped);
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        self.circuit_breaker.record_failure();
                        let retry_after = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(60);
                        last_error = Some(DataError::RateLimited {
                            retry_after_secs: retry_after,
                        });
                        continue;
                    }

                    if status == reqwest::StatusCode::NOT_FOUND {
                        return Err(DataError::SymbolNotFound {
                            ticker: ticker.to_string(),
                        });
                    }

                    if !status.is_success() {
                        self.circuit_breaker.record_failure();
                        last_error = Some(DataError::Other(format!("HTTP {status} for {ticker}")));
                        continue;
                    }

                    let chart: ChartResponse = resp.json().map_err(|e| {
                        DataError::ResponseFormatChanged(format!(
                            "failed to parse response for {ticker}: {e}"
                        ))
                    })?;

                    let data = Self::first_result(ticker, chart)?;
                    self.circuit_breaker.record_success();
                    return Ok(data);
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                        continue;
                    }
                    return Err(DataError::NetworkUnreachable(e.to_string()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }
}

impl MarketDataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn price_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, DataError> {
        let data = self.fetch_chart(ticker, &Self::daily_url(ticker, start, end))?;
        let series = Self::parse_prices(ticker, &data)?;
        Ok(PriceSeries::new(ticker, series.slice(start, end).to_vec())?)
    }

    fn dividend_history(&self, ticker: &str) -> Result<Vec<DividendEvent>, DataError> {
        let data = self.fetch_chart(ticker, &Self::dividends_url(ticker))?;
        Self::parse_dividends(ticker, &data)
    }

    fn intraday_momentum(&self, ticker: &str, window: usize) -> Result<Option<f64>, DataError> {
        let data = self.fetch_chart(ticker, &Self::intraday_url(ticker))?;
        let closes: Vec<f64> = Self::parse_closes(&data)?
            .into_iter()
            .map(|(_, close)| close)
            .collect();
        Ok(trailing_change(&closes, window))
    }
}

fn day_start_ts(date: NaiveDate) -> i64 {
    date.and_time(chrono::NaiveTime::MIN).and_utc().timestamp()
}

fn ts_to_date(ts: i64) -> Result<NaiveDate, DataError> {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.date_naive())
        .ok_or_else(|| DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}")))
}
