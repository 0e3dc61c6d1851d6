//! Parameter sweep over (buy offset, sell offset) pairs.
//!
//! Every pair of the grid runs the full pipeline over the same immutable
//! universe. Cells are independent, so they are evaluated with rayon; the
//! results keep grid order and the best pair is picked sequentially
//! afterwards, which makes parallel and serial sweeps identical.
//!
//! Tie-break: the first pair in ascending (buy, sell) order with the maximum
//! total return wins.

use std::ops::RangeInclusive;

use chrono::NaiveDate;
use divlab_core::domain::{Trade, TradeParameters};
use divlab_core::equity::{build_curve, CurveReport, SummaryStats};
use divlab_core::regime::MarketMode;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::backtest::{collect_trades, SkipCounts};
use crate::config::{RunId, RunSettings};
use crate::data_loader::Universe;
use crate::runner::RunError;

/// Inclusive offset ranges. Pairs with `sell >= buy` are never generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamGrid {
    pub buy: RangeInclusive<u32>,
    pub sell: RangeInclusive<u32>,
}

impl ParamGrid {
    pub fn new(buy: RangeInclusive<u32>, sell: RangeInclusive<u32>) -> Self {
        Self { buy, sell }
    }

    /// Valid pairs, ascending by buy then sell.
    pub fn pairs(&self) -> Vec<TradeParameters> {
        self.buy
            .clone()
            .flat_map(|buy| {
                self.sell
                    .clone()
                    .filter_map(move |sell| TradeParameters::new(buy, sell))
            })
            .collect()
    }

    /// Largest buy offset, for sizing the price window.
    pub fn max_buy_offset(&self) -> u32 {
        *self.buy.end()
    }
}

/// One scored cell of the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepResult {
    pub params: TradeParameters,
    pub trade_count: usize,
    /// Compounded return as a fraction (`final_multiplier - 1`).
    pub total_return: f64,
}

/// Scored cells in grid order plus the winning pair's full curve.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepOutcome {
    pub best: TradeParameters,
    pub best_report: CurveReport,
    /// Trades the best pair lost to alignment or bad prices.
    pub best_skips: SkipCounts,
    pub results: Vec<SweepResult>,
    pub pairs_evaluated: usize,
}

/// Score one cell. `None` when the pair produced no trades.
fn score(
    universe: &Universe,
    params: TradeParameters,
    settings: &RunSettings,
) -> Option<SweepResult> {
    let (trades, _) = collect_trades(universe, params, settings);
    let report = build_curve(
        &trades,
        settings.starting_capital,
        f64::from(settings.years_back),
    )?;
    Some(SweepResult {
        params,
        trade_count: report.stats.trade_count,
        total_return: report.stats.total_return,
    })
}

/// Index of the strictly greatest total return; earliest on ties.
pub fn select_best(results: &[SweepResult]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, r) in results.iter().enumerate() {
        match best {
            Some(b) if r.total_return > results[b].total_return => best = Some(i),
            None if r.total_return.is_finite() => best = Some(i),
            _ => {}
        }
    }
    best
}

/// Evaluate every grid pair and pick the best.
pub fn optimize(
    universe: &Universe,
    grid: &ParamGrid,
    settings: &RunSettings,
) -> Result<SweepOutcome, RunError> {
    let pairs = grid.pairs();
    log::info!(
        "sweeping {} pairs over {} tickers",
        pairs.len(),
        universe.tickers().len()
    );

    let results: Vec<SweepResult> = pairs
        .par_iter()
        .map(|&params| score(universe, params, settings))
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect();

    let best_idx = select_best(&results).ok_or(RunError::NoValidParameters {
        pairs_evaluated: pairs.len(),
    })?;
    let best = results[best_idx].params;

    let (trades, best_skips) = collect_trades(universe, best, settings);
    best_skips.warn_invalid_prices(best);
    let best_report = build_curve(
        &trades,
        settings.starting_capital,
        f64::from(settings.years_back),
    )
    .ok_or(RunError::NoValidParameters {
        pairs_evaluated: pairs.len(),
    })?;

    Ok(SweepOutcome {
        best,
        best_report,
        best_skips,
        results,
        pairs_evaluated: pairs.len(),
    })
}

/// Everything the optimizer reports to its caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub schema_version: u32,
    pub as_of: NaiveDate,
    pub years_back: u32,
    pub include_dividend: bool,
    pub market_mode: MarketMode,
    pub best_params: TradeParameters,
    pub stats: SummaryStats,
    /// Scored cells in grid order.
    pub sweep: Vec<SweepResult>,
    /// Best pair's trades in entry-date order.
    pub best_trades: Vec<Trade>,
    pub capital_curve: Vec<(NaiveDate, f64)>,
    pub cagr: f64,
    pub max_drawdown: f64,
    pub dataset_hash: String,
    /// Config fingerprint, set when the run was driven by a [`RunConfig`].
    ///
    /// [`RunConfig`]: crate::config::RunConfig
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,
}

/// Sweep and package the result for display and export.
pub fn run_optimization(
    universe: &Universe,
    grid: &ParamGrid,
    settings: &RunSettings,
) -> Result<OptimizationReport, RunError> {
    let outcome = optimize(universe, grid, settings)?;
    let CurveReport {
        trades,
        curve,
        stats,
    } = outcome.best_report;

    log::info!(
        "best pair buy={} sell={} total return {:.2}%",
        outcome.best.buy_offset_days(),
        outcome.best.sell_offset_days(),
        stats.total_return * 100.0
    );

    Ok(OptimizationReport {
        schema_version: crate::SCHEMA_VERSION,
        as_of: universe.as_of,
        years_back: settings.years_back,
        include_dividend: settings.include_dividend,
        market_mode: settings.regime.mode,
        best_params: outcome.best,
        capital_curve: curve.capital(settings.starting_capital),
        cagr: stats.cagr,
        max_drawdown: stats.max_drawdown,
        stats,
        sweep: outcome.results,
        best_trades: trades,
        dataset_hash: universe.dataset_hash(),
        run_id: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(buy: u32, sell: u32, total_return: f64) -> SweepResult {
        SweepResult {
            params: TradeParameters::new(buy, sell).unwrap(),
            trade_count: 1,
            total_return,
        }
    }

    #[test]
    fn pairs_respect_constraint_and_order() {
        let grid = ParamGrid::new(1..=3, 0..=2);
        let pairs: Vec<(u32, u32)> = grid
            .pairs()
            .iter()
            .map(|p| (p.buy_offset_days(), p.sell_offset_days()))
            .collect();
        assert_eq!(pairs, vec![(1, 0), (2, 0), (2, 1), (3, 0), (3, 1), (3, 2)]);
    }

    #[test]
    fn empty_grid_when_no_sell_below_buy() {
        let grid = ParamGrid::new(1..=2, 5..=8);
        assert!(grid.pairs().is_empty());
    }

    #[test]
    fn select_best_prefers_earliest_on_tie() {
        let results = vec![result(2, 0, 0.05), result(3, 0, 0.08), result(3, 1, 0.08)];
        assert_eq!(select_best(&results), Some(1));
        assert_eq!(select_best(&[]), None);
    }

    #[test]
    fn best_pair_reports_its_invalid_prices() {
        use crate::data_loader::TickerData;
        use divlab_core::domain::{DividendEvent, PricePoint, PriceSeries};

        let start = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let points = (0..31)
            .map(|i| {
                let date = start + chrono::Duration::days(i);
                // zero closes on May 7-9 poison every buy leg of the May 10 event
                let close = if (6..=8).contains(&i) { 0.0 } else { 100.0 + i as f64 };
                PricePoint::new(date, close)
            })
            .collect();
        let events = vec![
            DividendEvent::new("XOM", start + chrono::Duration::days(9), 0.9).unwrap(),
            DividendEvent::new("XOM", start + chrono::Duration::days(24), 0.9).unwrap(),
        ];
        let universe = Universe::new(
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            1,
            vec![TickerData {
                ticker: "XOM".into(),
                prices: PriceSeries::new("XOM", points).unwrap(),
                events,
            }],
            Vec::new(),
        );

        let settings = RunSettings::new(true, 10_000.0, 1);
        let outcome = optimize(&universe, &ParamGrid::new(1..=3, 0..=0), &settings).unwrap();
        assert_eq!(outcome.pairs_evaluated, 3);
        assert_eq!(outcome.best_skips.invalid_price, 1);
        assert_eq!(outcome.best_report.stats.trade_count, 1);
    }

    #[test]
    fn select_best_handles_all_negative() {
        let results = vec![result(2, 0, -0.10), result(3, 0, -0.02), result(4, 0, -0.05)];
        assert_eq!(select_best(&results), Some(1));
    }
}
