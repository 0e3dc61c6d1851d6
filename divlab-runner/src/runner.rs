//! Run orchestration: config → regime → universe → pipeline.
//!
//! Three entry points, one per CLI subcommand:
//! - `run_configured_backtest()`: single (buy, sell) pair.
//! - `run_configured_optimization()`: full grid sweep.
//! - `run_configured_ranking()`: income-rotation candidate ranking.
//!
//! Each validates the config before touching the provider, resolves the
//! market mode once, and loads the universe once.

use chrono::NaiveDate;
use divlab_core::data::MarketDataProvider;
use divlab_core::regime::{classify, MarketMode, RegimeFilter};
use thiserror::Error;

use crate::backtest::{run_backtest, BacktestOutcome};
use crate::config::{ConfigError, RegimeSection, RunConfig};
use crate::data_loader::{load_universe, LoadError, LoadOptions, Universe};
use crate::ranking::{rank_candidates, RankingReport};
use crate::sweep::{run_optimization, OptimizationReport};

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("data error: {0}")]
    Data(#[from] LoadError),

    #[error("no valid parameter pair produced trades ({pairs_evaluated} pairs evaluated); widen the buy/sell ranges")]
    NoValidParameters { pairs_evaluated: usize },
}

/// Market mode for this run.
///
/// A disabled regime section is `Neutral`. A fixed `mode` wins over the
/// momentum fetch. A failed or insufficient momentum reading falls back to
/// `Neutral` with a warning; it never aborts the run.
pub fn resolve_market_mode<P: MarketDataProvider + ?Sized>(
    provider: &P,
    regime: &RegimeSection,
) -> MarketMode {
    if !regime.enabled {
        return MarketMode::Neutral;
    }
    if let Some(mode) = regime.mode {
        return mode;
    }
    match provider.intraday_momentum(&regime.ticker, regime.window) {
        Ok(Some(momentum)) => {
            let mode = classify(momentum);
            log::info!(
                "{} momentum {:+.3}% → {mode}",
                regime.ticker,
                momentum * 100.0
            );
            mode
        }
        Ok(None) => {
            log::warn!(
                "not enough intraday samples for {}; using NEUTRAL",
                regime.ticker
            );
            MarketMode::Neutral
        }
        Err(e) => {
            log::warn!("momentum fetch for {} failed: {e}; using NEUTRAL", regime.ticker);
            MarketMode::Neutral
        }
    }
}

fn load<P: MarketDataProvider + ?Sized>(
    provider: &P,
    config: &RunConfig,
    max_buy_offset_days: u32,
    today: NaiveDate,
) -> Result<Universe, RunError> {
    let opts = LoadOptions {
        years_back: config.years_back,
        max_buy_offset_days,
        as_of: config.as_of_or(today),
    };
    Ok(load_universe(provider, &config.tickers, &opts)?)
}

/// Validate, load and backtest the configured (buy, sell) pair.
pub fn run_configured_backtest<P: MarketDataProvider + ?Sized>(
    provider: &P,
    config: &RunConfig,
    today: NaiveDate,
) -> Result<(Universe, MarketMode, BacktestOutcome), RunError> {
    config.validate()?;
    let params = config.trade_parameters()?;

    let mode = resolve_market_mode(provider, &config.regime);
    let universe = load(provider, config, params.buy_offset_days(), today)?;
    let settings = config.settings().with_regime(RegimeFilter::new(mode));

    let outcome = run_backtest(&universe, params, &settings);
    Ok((universe, mode, outcome))
}

/// Validate, load once and sweep the configured grid.
pub fn run_configured_optimization<P: MarketDataProvider + ?Sized>(
    provider: &P,
    config: &RunConfig,
    today: NaiveDate,
) -> Result<(Universe, OptimizationReport), RunError> {
    config.validate()?;
    let grid = config.param_grid()?;

    let mode = resolve_market_mode(provider, &config.regime);
    let universe = load(provider, config, grid.max_buy_offset(), today)?;
    let settings = config.settings().with_regime(RegimeFilter::new(mode));

    let mut report = run_optimization(&universe, &grid, &settings)?;
    let run_id = config.run_id()?;
    log::info!("run {run_id} dataset {}", report.dataset_hash);
    report.run_id = Some(run_id);
    Ok((universe, report))
}

/// Validate and rank the configured tickers as rotation candidates.
pub fn run_configured_ranking<P: MarketDataProvider + ?Sized>(
    provider: &P,
    config: &RunConfig,
    today: NaiveDate,
) -> Result<RankingReport, RunError> {
    config.validate()?;
    let scorer = config.rotation.scorer();
    Ok(rank_candidates(
        provider,
        &config.tickers,
        config.rotation.lookback_sessions,
        &scorer,
        config.as_of_or(today),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use divlab_core::data::InMemoryProvider;

    fn regime(enabled: bool, mode: Option<MarketMode>) -> RegimeSection {
        RegimeSection {
            enabled,
            ticker: "SPY".into(),
            window: 2,
            mode,
        }
    }

    #[test]
    fn disabled_regime_is_neutral() {
        let provider = InMemoryProvider::new().with_intraday("SPY", vec![100.0, 90.0, 80.0]);
        assert_eq!(
            resolve_market_mode(&provider, &regime(false, None)),
            MarketMode::Neutral
        );
    }

    #[test]
    fn momentum_drives_mode() {
        let provider = InMemoryProvider::new().with_intraday("SPY", vec![100.0, 99.0, 98.0]);
        assert_eq!(
            resolve_market_mode(&provider, &regime(true, None)),
            MarketMode::RiskOff
        );
    }

    #[test]
    fn fixed_mode_wins_and_missing_samples_fall_back() {
        let provider = InMemoryProvider::new();
        assert_eq!(
            resolve_market_mode(&provider, &regime(true, Some(MarketMode::RiskOn))),
            MarketMode::RiskOn
        );
        assert_eq!(
            resolve_market_mode(&provider, &regime(true, None)),
            MarketMode::Neutral
        );
    }

    #[test]
    fn structural_errors_abort_before_fetch() {
        let provider = InMemoryProvider::new();
        let config = RunConfig::for_tickers::<&str>(&[]);
        let today = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        assert!(matches!(
            run_configured_backtest(&provider, &config, today),
            Err(RunError::Config(ConfigError::NoTickers))
        ));
    }
}
