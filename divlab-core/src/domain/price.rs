//! PriceSeries — the closing-price history of one ticker.

use super::DomainError;
use crate::calendar;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Close of a single trading session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// Date-indexed closes for one ticker, strictly increasing by date.
///
/// The ordering invariant is checked once in [`PriceSeries::new`]; every
/// lookup after that relies on it for binary search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    ticker: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series, rejecting duplicate or out-of-order dates.
    pub fn new(ticker: impl Into<String>, points: Vec<PricePoint>) -> Result<Self, DomainError> {
        let ticker = ticker.into();
        for pair in points.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(DomainError::UnorderedSeries {
                    ticker,
                    date: pair[1].date,
                });
            }
        }
        Ok(Self { ticker, points })
    }

    /// Build a series from unsorted points: sorts by date and keeps the last
    /// close seen for a repeated date.
    pub fn from_unsorted(ticker: impl Into<String>, mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|p| p.date);
        let mut deduped: Vec<PricePoint> = Vec::with_capacity(points.len());
        for point in points {
            match deduped.last_mut() {
                Some(last) if last.date == point.date => *last = point,
                _ => deduped.push(point),
            }
        }
        Self {
            ticker: ticker.into(),
            points: deduped,
        }
    }

    pub fn empty(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            points: Vec::new(),
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    pub fn last_close(&self) -> Option<f64> {
        self.points.last().map(|p| p.close)
    }

    /// The trading-day index of this series.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.points.iter().map(|p| p.date)
    }

    /// Close on exactly `date`, if it was a trading day.
    pub fn close_on(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|i| self.points[i].close)
    }

    /// Nearest trading day at or before `target`.
    pub fn align(&self, target: NaiveDate) -> Option<NaiveDate> {
        calendar::align_points(target, &self.points).map(|p| p.date)
    }

    /// Points with `start <= date <= end`.
    pub fn slice(&self, start: NaiveDate, end: NaiveDate) -> &[PricePoint] {
        let lo = self.points.partition_point(|p| p.date < start);
        let hi = self.points.partition_point(|p| p.date <= end);
        if lo >= hi {
            return &[];
        }
        &self.points[lo..hi]
    }
}
