//! Parameter sweep: grid constraint, determinism, tie-breaking, empty grids.

mod common;

use common::{d, provider, AS_OF};
use divlab_core::domain::TradeParameters;
use divlab_core::regime::{MarketMode, RegimeFilter};
use divlab_runner::{
    load_universe, optimize, run_backtest, run_optimization, LoadOptions, ParamGrid, RunConfig,
    RunError, RunSettings, SkipReason, Universe,
};

fn universe(max_buy: u32) -> Universe {
    let tickers: Vec<String> = ["MO", "NODIV", "T"].map(String::from).to_vec();
    let opts = LoadOptions {
        years_back: 2,
        max_buy_offset_days: max_buy,
        as_of: d(AS_OF),
    };
    load_universe(&provider(), &tickers, &opts).unwrap()
}

fn settings() -> RunSettings {
    RunSettings::new(true, 10_000.0, 2)
}

#[test]
fn scenario_d_grid_pairs() {
    let mut config = RunConfig::for_tickers(&["MO"]);
    config.sweep.buy_min = 1;
    config.sweep.buy_max = 3;
    config.sweep.sell_min = 0;
    config.sweep.sell_max = 2;

    let pairs: Vec<(u32, u32)> = config
        .param_grid()
        .unwrap()
        .pairs()
        .iter()
        .map(|p| (p.buy_offset_days(), p.sell_offset_days()))
        .collect();
    assert_eq!(pairs, vec![(1, 0), (2, 0), (2, 1), (3, 0), (3, 1), (3, 2)]);
}

#[test]
fn scenario_e_ticker_without_dividends_is_skipped() {
    let universe = universe(10);
    assert_eq!(universe.tickers().len(), 2);
    assert_eq!(universe.skipped().len(), 1);
    assert_eq!(universe.skipped()[0].ticker, "NODIV");
    assert_eq!(universe.skipped()[0].reason, SkipReason::NoDividends);

    let outcome = optimize(&universe, &ParamGrid::new(1..=10, 0..=5), &settings()).unwrap();
    assert!(!outcome.results.is_empty());
}

#[test]
fn sweep_rows_respect_grid_constraint_and_order() {
    let universe = universe(15);
    let outcome = optimize(&universe, &ParamGrid::new(1..=15, 0..=10), &settings()).unwrap();

    for r in &outcome.results {
        assert!(r.params.sell_offset_days() < r.params.buy_offset_days());
    }
    let keys: Vec<(u32, u32)> = outcome
        .results
        .iter()
        .map(|r| (r.params.buy_offset_days(), r.params.sell_offset_days()))
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
}

#[test]
fn sweep_is_deterministic_and_matches_serial_backtests() {
    let universe = universe(12);
    let grid = ParamGrid::new(2..=12, 0..=6);

    let first = optimize(&universe, &grid, &settings()).unwrap();
    let second = optimize(&universe, &grid, &settings()).unwrap();
    assert_eq!(first.best, second.best);
    assert_eq!(first.results, second.results);

    // serial reference: first pair with the maximum total return
    let mut best: Option<(TradeParameters, f64)> = None;
    for params in grid.pairs() {
        if let Some(report) = run_backtest(&universe, params, &settings()).report() {
            let total = report.stats.total_return;
            if best.map_or(true, |(_, b)| total > b) {
                best = Some((params, total));
            }
        }
    }
    let (params, total) = best.unwrap();
    assert_eq!(first.best, params);
    assert_eq!(first.best_report.stats.total_return, total);
}

#[test]
fn best_is_the_maximum_row() {
    let universe = universe(20);
    let report = run_optimization(&universe, &ParamGrid::new(1..=20, 0..=10), &settings()).unwrap();

    let max = report
        .sweep
        .iter()
        .map(|r| r.total_return)
        .fold(f64::NEG_INFINITY, f64::max);
    let winner = report
        .sweep
        .iter()
        .find(|r| r.total_return == max)
        .unwrap();
    assert_eq!(winner.params, report.best_params);
    assert_eq!(report.stats.total_return, max);
    assert_eq!(report.capital_curve.len(), report.best_trades.len());
    assert_eq!(report.schema_version, divlab_runner::SCHEMA_VERSION);
}

#[test]
fn grid_without_valid_pairs_is_no_valid_parameters() {
    let universe = universe(5);
    let err = optimize(&universe, &ParamGrid::new(1..=2, 5..=8), &settings()).unwrap_err();
    assert!(matches!(err, RunError::NoValidParameters { pairs_evaluated: 0 }));
}

#[test]
fn grid_without_trades_is_no_valid_parameters() {
    let empty = Universe::new(d(AS_OF), 2, Vec::new(), Vec::new());
    let err = optimize(&empty, &ParamGrid::new(1..=5, 0..=3), &settings()).unwrap_err();
    assert!(matches!(err, RunError::NoValidParameters { pairs_evaluated: 14 }));
}

#[test]
fn defensive_mode_keeps_only_non_losing_trades() {
    let universe = universe(10);
    let defensive = settings().with_regime(RegimeFilter::new(MarketMode::RiskOff));
    let report = run_optimization(&universe, &ParamGrid::new(1..=10, 0..=5), &defensive).unwrap();

    assert_eq!(report.market_mode, MarketMode::RiskOff);
    assert!(report.best_trades.iter().all(|t| t.total_return >= 0.0));
    assert_eq!(report.max_drawdown, 0.0);
}
