//! Dividend event extraction over a lookback horizon.

use crate::domain::DividendEvent;
use chrono::{Months, NaiveDate};

/// Start of the lookback window: `as_of` minus whole calendar years.
///
/// Uses month arithmetic, so a window anchored on Feb 29 clamps to Feb 28
/// instead of drifting by a day per leap year.
pub fn lookback_start(as_of: NaiveDate, lookback_years: u32) -> NaiveDate {
    as_of
        .checked_sub_months(Months::new(lookback_years.saturating_mul(12)))
        .unwrap_or(NaiveDate::MIN)
}

/// Events with an ex-date strictly after `as_of - lookback_years`, ascending.
///
/// A repeated (ticker, ex-date) keeps only its first occurrence, so one
/// payout is never traded twice.
pub fn extract_events(
    history: &[DividendEvent],
    lookback_years: u32,
    as_of: NaiveDate,
) -> Vec<DividendEvent> {
    let cutoff = lookback_start(as_of, lookback_years);
    let mut events: Vec<DividendEvent> = history
        .iter()
        .filter(|e| e.ex_date > cutoff)
        .cloned()
        .collect();
    events.sort_by(|a, b| {
        a.ex_date
            .cmp(&b.ex_date)
            .then_with(|| a.ticker.cmp(&b.ticker))
    });
    events.dedup_by(|later, first| {
        later.ticker == first.ticker && later.ex_date == first.ex_date
    });
    events
}

/// Total dividends with ex-date in `(from, to]`.
pub fn dividends_between(history: &[DividendEvent], from: NaiveDate, to: NaiveDate) -> f64 {
    history
        .iter()
        .filter(|e| e.ex_date > from && e.ex_date <= to)
        .map(|e| e.amount)
        .sum()
}
