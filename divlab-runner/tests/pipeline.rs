//! End-to-end runs through the configured entry points, offline.

mod common;

use common::{d, provider, AS_OF};
use common::series;
use divlab_core::data::{CachedProvider, InMemoryProvider};
use divlab_core::domain::DividendEvent;
use divlab_core::regime::MarketMode;
use divlab_runner::export::{load_artifacts, save_artifacts};
use divlab_runner::{
    run_configured_backtest, run_configured_optimization, run_configured_ranking,
    BacktestOutcome, ConfigError, RunConfig, RunError,
};

fn config(tickers: &[&str]) -> RunConfig {
    let mut config = RunConfig::for_tickers(tickers);
    config.years_back = 2;
    config.as_of = Some(d(AS_OF));
    config.sweep.buy_max = 10;
    config.sweep.sell_max = 4;
    config
}

#[test]
fn backtest_pools_tickers_in_order() {
    let (universe, mode, outcome) =
        run_configured_backtest(&provider(), &config(&["T", "NODIV", "MO"]), d("2030-01-01"))
            .unwrap();

    assert_eq!(mode, MarketMode::Neutral);
    assert_eq!(universe.as_of, d(AS_OF));

    let BacktestOutcome::Trades {
        trades,
        report,
        per_ticker,
        ..
    } = outcome
    else {
        panic!("expected trades");
    };
    assert_eq!(trades[0].ticker, "T");
    let tickers: Vec<&str> = per_ticker.iter().map(|s| s.ticker.as_str()).collect();
    assert_eq!(tickers, vec!["T", "MO"]);

    // curve is in entry-date order even though the log is grouped by ticker
    let dates: Vec<_> = report.curve.points.iter().map(|p| p.date).collect();
    let mut sorted = dates.clone();
    sorted.sort();
    assert_eq!(dates, sorted);
    assert_eq!(report.stats.trade_count, trades.len());
}

#[test]
fn backtest_outside_lookback_is_empty() {
    let mut config = config(&["MO", "T"]);
    config.years_back = 1;
    config.as_of = Some(d("2030-06-30"));
    let (universe, _, outcome) =
        run_configured_backtest(&provider(), &config, d("2030-06-30")).unwrap();
    assert!(universe.is_empty());
    assert!(outcome.is_empty());
}

#[test]
fn regime_momentum_feeds_the_sweep() {
    let mut config = config(&["MO", "T"]);
    config.regime.enabled = true;
    config.regime.window = 3;
    let (_, report) = run_configured_optimization(&provider(), &config, d(AS_OF)).unwrap();

    // 500 → 495 over three samples is a 1% drop
    assert_eq!(report.market_mode, MarketMode::RiskOff);
    assert!(report.best_trades.iter().all(|t| t.total_return >= 0.0));
}

#[test]
fn cached_provider_gives_identical_reports() {
    let cached = CachedProvider::new(provider());
    let config = config(&["MO", "T"]);

    let (_, a) = run_configured_optimization(&cached, &config, d(AS_OF)).unwrap();
    let (_, b) = run_configured_optimization(&cached, &config, d(AS_OF)).unwrap();
    let (_, direct) = run_configured_optimization(&provider(), &config, d(AS_OF)).unwrap();

    assert_eq!(a, b);
    assert_eq!(a, direct);
    assert_eq!(a.run_id, Some(config.run_id().unwrap()));
    assert!(!cached.is_empty());
}

#[test]
fn artifacts_round_trip() {
    let (_, report) = run_configured_optimization(&provider(), &config(&["MO", "T"]), d(AS_OF))
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let run_dir = save_artifacts(&report, dir.path()).unwrap();

    for file in ["report.json", "sweep.csv", "trades.csv", "equity.csv"] {
        assert!(run_dir.join(file).exists(), "missing {file}");
    }
    let sweep_csv = std::fs::read_to_string(run_dir.join("sweep.csv")).unwrap();
    assert_eq!(sweep_csv.lines().count(), report.sweep.len() + 1);

    let loaded = load_artifacts(&run_dir).unwrap();
    assert_eq!(loaded.best_params, report.best_params);
    assert_eq!(loaded.sweep.len(), report.sweep.len());
    assert_eq!(loaded.best_trades.len(), report.best_trades.len());
    assert_eq!(loaded.dataset_hash, report.dataset_hash);
}

#[test]
fn ranking_uses_configured_weights() {
    let mut config = config(&["MO", "T", "NODIV"]);
    config.rotation.lookback_sessions = 20;
    let report = run_configured_ranking(&provider(), &config, d(AS_OF)).unwrap();

    assert_eq!(report.ranked.len(), 3);
    assert!(report.skipped.is_empty());
    for pair in report.ranked.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    let nodiv = report.ranked.iter().find(|c| c.ticker == "NODIV").unwrap();
    assert_eq!(nodiv.metrics.income_yield, 0.0);
}

#[test]
fn oversized_buy_offset_aborts_before_loading() {
    let mut config = config(&["MO"]);
    config.backtest.buy_days = u32::MAX;
    config.backtest.sell_days = 0;
    assert!(matches!(
        run_configured_backtest(&provider(), &config, d(AS_OF)),
        Err(RunError::Config(ConfigError::OffsetTooLarge { .. }))
    ));
}

#[test]
fn repeated_ex_date_trades_once() {
    let event = DividendEvent::new("MO", d("2024-02-15"), 0.98).unwrap();
    let provider = InMemoryProvider::new()
        .with_prices(series("MO", 42.0, 0.0))
        .with_dividends("MO", vec![event.clone(), event]);
    let mut config = config(&["MO"]);
    config.backtest.buy_days = 5;
    config.backtest.sell_days = 1;

    let (universe, _, outcome) = run_configured_backtest(&provider, &config, d(AS_OF)).unwrap();
    assert_eq!(universe.event_count(), 1);
    let BacktestOutcome::Trades { trades, .. } = outcome else {
        panic!("expected trades");
    };
    assert_eq!(trades.len(), 1);
}
