//! Shared offline fixtures for runner integration tests.

#![allow(dead_code)]

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use divlab_core::data::InMemoryProvider;
use divlab_core::domain::{DividendEvent, PricePoint, PriceSeries};

pub fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub const AS_OF: &str = "2024-12-31";

/// Weekday closes over 2023–2024 with a deterministic wave and drift.
pub fn series(ticker: &str, base: f64, phase: f64) -> PriceSeries {
    let start = d("2023-01-02");
    let points = (0..730)
        .map(|i| start + Duration::days(i))
        .filter(|date| !matches!(date.weekday(), Weekday::Sat | Weekday::Sun))
        .enumerate()
        .map(|(i, date)| {
            let x = i as f64;
            PricePoint::new(date, base + 2.0 * (x / 9.0 + phase).sin() + 0.01 * x)
        })
        .collect();
    PriceSeries::new(ticker, points).unwrap()
}

fn quarterly(ticker: &str, dates: &[&str], amount: f64) -> Vec<DividendEvent> {
    dates
        .iter()
        .map(|s| DividendEvent::new(ticker, d(s), amount).unwrap())
        .collect()
}

/// MO and T pay quarterly; NODIV never pays.
pub fn provider() -> InMemoryProvider {
    InMemoryProvider::new()
        .with_prices(series("MO", 42.0, 0.0))
        .with_prices(series("T", 17.0, 1.3))
        .with_prices(series("NODIV", 100.0, 0.5))
        .with_dividends(
            "MO",
            quarterly(
                "MO",
                &[
                    "2023-03-23", "2023-06-14", "2023-09-14", "2023-12-21",
                    "2024-03-22", "2024-06-14", "2024-09-16", "2024-12-26",
                ],
                0.98,
            ),
        )
        .with_dividends(
            "T",
            quarterly(
                "T",
                &[
                    "2023-01-06", "2023-04-06", "2023-07-07", "2023-10-06",
                    "2024-01-09", "2024-04-09", "2024-07-10", "2024-10-10",
                ],
                0.2775,
            ),
        )
        .with_intraday("SPY", vec![500.0, 499.0, 497.0, 495.0])
}
