//! DivLab Runner — run orchestration, parameter sweep, summaries, export.
//!
//! This crate builds on `divlab-core` to provide:
//! - TOML run configuration with validation and content-hashed run IDs
//! - Universe loading (each ticker fetched once per run)
//! - Single backtest with skip accounting and per-ticker summaries
//! - Parallel (buy, sell) parameter sweep with deterministic tie-breaking
//! - Income-rotation candidate ranking
//! - CSV and JSON export

pub mod backtest;
pub mod config;
pub mod data_loader;
pub mod export;
pub mod ranking;
pub mod report;
pub mod runner;
pub mod sweep;

pub use backtest::{collect_trades, run_backtest, BacktestOutcome, SkipCounts};
pub use config::{ConfigError, RunConfig, RunId, RunSettings};
pub use data_loader::{load_universe, LoadError, LoadOptions, SkipReason, TickerData, Universe};
pub use ranking::{rank_candidates, RankingReport};
pub use report::{summarize_by_ticker, TickerSummary};
pub use runner::{
    resolve_market_mode, run_configured_backtest, run_configured_optimization,
    run_configured_ranking, RunError, SCHEMA_VERSION,
};
pub use sweep::{
    optimize, run_optimization, select_best, OptimizationReport, ParamGrid, SweepOutcome,
    SweepResult,
};
