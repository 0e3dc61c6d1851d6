//! Single-parameter backtest over a loaded universe.
//!
//! Trades are built ticker by ticker (universe order, events ascending),
//! passed through the regime filter and pooled into one equity curve.
//! Unalignable events and bad prices skip only the affected trade.

use divlab_core::domain::{Trade, TradeParameters};
use divlab_core::equity::{build_curve, CurveReport};
use divlab_core::trade_builder::{build_trade, TradeError};
use serde::{Deserialize, Serialize};

use crate::config::RunSettings;
use crate::data_loader::Universe;
use crate::report::{summarize_by_ticker, TickerSummary};

/// Trades dropped during construction, by cause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipCounts {
    pub unaligned: usize,
    pub invalid_price: usize,
}

impl SkipCounts {
    pub fn total(&self) -> usize {
        self.unaligned + self.invalid_price
    }

    /// One warning per run for bad closes; per-trade detail stays at debug.
    pub(crate) fn warn_invalid_prices(&self, params: TradeParameters) {
        if self.invalid_price > 0 {
            log::warn!(
                "buy={} sell={}: {} trades skipped on invalid prices (RUST_LOG=debug for detail)",
                params.buy_offset_days(),
                params.sell_offset_days(),
                self.invalid_price
            );
        }
    }
}

/// Result of one backtest: either trades with their statistics, or a
/// distinct empty state.
#[derive(Debug, Clone, PartialEq)]
pub enum BacktestOutcome {
    Trades {
        /// Trade log in pooling order (ticker, then ex-date).
        trades: Vec<Trade>,
        report: CurveReport,
        per_ticker: Vec<TickerSummary>,
        skips: SkipCounts,
    },
    Empty {
        skips: SkipCounts,
    },
}

impl BacktestOutcome {
    pub fn is_empty(&self) -> bool {
        matches!(self, BacktestOutcome::Empty { .. })
    }

    pub fn skips(&self) -> SkipCounts {
        match self {
            BacktestOutcome::Trades { skips, .. } | BacktestOutcome::Empty { skips } => *skips,
        }
    }

    pub fn report(&self) -> Option<&CurveReport> {
        match self {
            BacktestOutcome::Trades { report, .. } => Some(report),
            BacktestOutcome::Empty { .. } => None,
        }
    }
}

/// Build, filter and pool the trades for one parameter pair.
pub fn collect_trades(
    universe: &Universe,
    params: TradeParameters,
    settings: &RunSettings,
) -> (Vec<Trade>, SkipCounts) {
    let mut trades = Vec::new();
    let mut skips = SkipCounts::default();

    for data in universe.tickers() {
        for event in &data.events {
            match build_trade(
                &data.ticker,
                &data.prices,
                event,
                params,
                settings.include_dividend,
            ) {
                Ok(trade) => trades.push(trade),
                Err(e @ TradeError::Unaligned { .. }) => {
                    log::debug!("{e}");
                    skips.unaligned += 1;
                }
                Err(e @ TradeError::InvalidPrice { .. }) => {
                    log::debug!("{e}");
                    skips.invalid_price += 1;
                }
            }
        }
    }

    (settings.regime.apply(trades), skips)
}

/// Run the full pipeline for one parameter pair.
pub fn run_backtest(
    universe: &Universe,
    params: TradeParameters,
    settings: &RunSettings,
) -> BacktestOutcome {
    let (trades, skips) = collect_trades(universe, params, settings);
    skips.warn_invalid_prices(params);

    match build_curve(
        &trades,
        settings.starting_capital,
        f64::from(settings.years_back),
    ) {
        Some(report) => {
            let per_ticker = summarize_by_ticker(&trades);
            BacktestOutcome::Trades {
                trades,
                report,
                per_ticker,
                skips,
            }
        }
        None => BacktestOutcome::Empty { skips },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use divlab_core::domain::{DividendEvent, PricePoint, PriceSeries};
    use divlab_core::regime::{MarketMode, RegimeFilter};

    use crate::data_loader::TickerData;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn universe() -> Universe {
        let prices = PriceSeries::new(
            "XOM",
            vec![
                PricePoint::new(d("2024-05-01"), 100.0),
                PricePoint::new(d("2024-05-08"), 102.0),
                PricePoint::new(d("2024-05-10"), 103.0),
                PricePoint::new(d("2024-05-13"), 101.0),
                PricePoint::new(d("2024-08-01"), 110.0),
                PricePoint::new(d("2024-08-08"), 108.0),
            ],
        )
        .unwrap();
        let events = vec![
            // before the first session for a 10-day buy offset
            DividendEvent::new("XOM", d("2024-05-05"), 0.95).unwrap(),
            DividendEvent::new("XOM", d("2024-05-15"), 0.95).unwrap(),
            DividendEvent::new("XOM", d("2024-08-12"), 0.95).unwrap(),
        ];
        Universe::new(
            d("2024-12-31"),
            1,
            vec![TickerData {
                ticker: "XOM".into(),
                prices,
                events,
            }],
            Vec::new(),
        )
    }

    #[test]
    fn unaligned_events_are_counted_not_fatal() {
        let params = TradeParameters::new(10, 2).unwrap();
        let settings = RunSettings::new(true, 10_000.0, 1);
        let outcome = run_backtest(&universe(), params, &settings);

        assert_eq!(outcome.skips().unaligned, 1);
        let BacktestOutcome::Trades {
            trades, per_ticker, ..
        } = outcome
        else {
            panic!("expected trades");
        };
        assert_eq!(trades.len(), 2);
        // ex 05-15: buy target 05-05 aligns back to 05-01, sell target 05-13 is a session
        assert_eq!(trades[0].entry_date, d("2024-05-01"));
        assert_eq!(trades[0].exit_date, d("2024-05-13"));
        assert_eq!(per_ticker[0].trades, 2);
    }

    #[test]
    fn defensive_mode_drops_losers() {
        let params = TradeParameters::new(10, 2).unwrap();
        let settings = RunSettings::new(false, 10_000.0, 1);
        let (all, _) = collect_trades(&universe(), params, &settings);
        assert!(all.iter().any(|t| t.total_return < 0.0));

        let defensive = settings.with_regime(RegimeFilter::new(MarketMode::RiskOff));
        let (kept, _) = collect_trades(&universe(), params, &defensive);
        assert!(kept.iter().all(|t| t.total_return >= 0.0));
        assert!(kept.len() < all.len());
    }

    #[test]
    fn no_events_is_empty() {
        let empty = Universe::new(d("2024-12-31"), 1, Vec::new(), Vec::new());
        let outcome = run_backtest(
            &empty,
            TradeParameters::new(5, 1).unwrap(),
            &RunSettings::new(true, 10_000.0, 1),
        );
        assert!(outcome.is_empty());
        assert!(outcome.report().is_none());
        assert_eq!(outcome.skips().total(), 0);
    }
}
