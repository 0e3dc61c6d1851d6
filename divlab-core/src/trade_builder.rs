//! Trade construction around a single dividend event.
//!
//! For each event the raw buy and sell dates are `ex_date - offset` in
//! calendar days. Both are aligned to the last session at or before them,
//! and the closes on those sessions become the entry and exit prices.
//!
//! Failures here are local to one event. Callers count and skip them; they
//! never abort a run.

use crate::domain::{DividendEvent, PriceSeries, Trade, TradeParameters};
use crate::returns::compute_returns;
use chrono::{Days, NaiveDate};
use thiserror::Error;

/// Calendar days of price history fetched before `earliest_ex - buy_offset`.
pub const PRE_WINDOW_PADDING_DAYS: u64 = 15;

/// Calendar days of price history fetched after the latest ex-date.
pub const POST_WINDOW_PADDING_DAYS: u64 = 5;

/// Which leg of the round trip an alignment refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    Buy,
    Sell,
}

impl std::fmt::Display for Leg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Leg::Buy => write!(f, "buy"),
            Leg::Sell => write!(f, "sell"),
        }
    }
}

/// Why a trade could not be built for one event.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TradeError {
    #[error("{ticker}: no {leg} session at or before {target}")]
    Unaligned {
        ticker: String,
        leg: Leg,
        target: NaiveDate,
    },

    #[error("{ticker}: invalid price {price} on {date}")]
    InvalidPrice {
        ticker: String,
        date: NaiveDate,
        price: f64,
    },
}

/// Build the trade for one event and parameter pair.
///
/// If both legs align to the same session the trade is still produced; its
/// price return is zero and only the dividend contributes.
pub fn build_trade(
    ticker: &str,
    series: &PriceSeries,
    event: &DividendEvent,
    params: TradeParameters,
    include_dividend: bool,
) -> Result<Trade, TradeError> {
    let raw_buy = days_before(event.ex_date, params.buy_offset_days());
    let raw_sell = days_before(event.ex_date, params.sell_offset_days());

    let (entry_date, entry_price) = resolve_leg(ticker, series, raw_buy, Leg::Buy)?;
    let (exit_date, exit_price) = resolve_leg(ticker, series, raw_sell, Leg::Sell)?;

    let returns = compute_returns(entry_price, exit_price, event.amount, include_dividend)
        .map_err(|e| {
            let bad_entry = !entry_price.is_finite() || entry_price <= 0.0;
            TradeError::InvalidPrice {
                ticker: ticker.to_string(),
                date: if bad_entry { entry_date } else { exit_date },
                price: e.price,
            }
        })?;

    Ok(Trade {
        ticker: ticker.to_string(),
        ex_date: event.ex_date,
        entry_date,
        exit_date,
        entry_price,
        exit_price,
        dividend: event.amount,
        price_return: returns.price_return,
        total_return: returns.total_return,
    })
}

/// `date - days`, saturating at the start of the calendar. A saturated
/// target precedes any price history and therefore fails to align.
fn days_before(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_sub_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MIN)
}

fn resolve_leg(
    ticker: &str,
    series: &PriceSeries,
    target: NaiveDate,
    leg: Leg,
) -> Result<(NaiveDate, f64), TradeError> {
    let unaligned = || TradeError::Unaligned {
        ticker: ticker.to_string(),
        leg,
        target,
    };
    let date = series.align(target).ok_or_else(unaligned)?;
    let close = series.close_on(date).ok_or_else(unaligned)?;
    Ok((date, close))
}

/// Price-history window that gives the aligner sessions on both ends of the
/// event range: `[earliest - (buy_offset + 15), latest + 5]` calendar days.
///
/// Returns `None` for an empty event list or a window that would leave the
/// representable calendar.
pub fn price_window(
    events: &[DividendEvent],
    max_buy_offset_days: u32,
) -> Option<(NaiveDate, NaiveDate)> {
    let earliest = events.iter().map(|e| e.ex_date).min()?;
    let latest = events.iter().map(|e| e.ex_date).max()?;
    let lead = u64::from(max_buy_offset_days) + PRE_WINDOW_PADDING_DAYS;
    Some((
        earliest.checked_sub_days(Days::new(lead))?,
        latest.checked_add_days(Days::new(POST_WINDOW_PADDING_DAYS))?,
    ))
}
