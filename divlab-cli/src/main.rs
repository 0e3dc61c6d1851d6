//! DivLab CLI — dividend-capture backtest, optimize and rank commands.
//!
//! Commands:
//! - `backtest` — evaluate one (buy, sell) offset pair over the tickers
//! - `optimize` — sweep a grid of offset pairs and report the best
//! - `rank` — score a basket of income candidates
//!
//! Every command accepts a TOML config (`--config`); flags override it.
//! Logging goes through `RUST_LOG` (default `info`).

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use divlab_core::data::{CachedProvider, CircuitBreaker, YahooProvider};
use divlab_core::regime::MarketMode;
use divlab_runner::config::parse_ticker_list;
use divlab_runner::export::{
    export_equity_csv, export_sweep_csv, export_trades_csv, save_artifacts, write_csv,
};
use divlab_runner::{
    run_configured_backtest, run_configured_optimization, run_configured_ranking,
    BacktestOutcome, OptimizationReport, RankingReport, RunConfig, RunError, TickerSummary,
    Universe,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "divlab",
    about = "DivLab CLI — dividend-capture backtesting engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest one buy/sell offset pair.
    Backtest {
        #[command(flatten)]
        common: CommonArgs,

        /// Calendar days before the ex-date to buy.
        #[arg(long)]
        buy_days: Option<u32>,

        /// Calendar days before the ex-date to sell (must be below --buy-days).
        #[arg(long)]
        sell_days: Option<u32>,

        /// Write the trade log CSV here.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write the equity curve CSV here.
        #[arg(long)]
        equity_output: Option<PathBuf>,
    },
    /// Sweep buy/sell offsets and report the most profitable pair.
    Optimize {
        #[command(flatten)]
        common: CommonArgs,

        #[arg(long)]
        buy_min: Option<u32>,

        #[arg(long)]
        buy_max: Option<u32>,

        #[arg(long)]
        sell_min: Option<u32>,

        #[arg(long)]
        sell_max: Option<u32>,

        /// Write the sweep table CSV here.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Save report.json, sweep.csv, trades.csv and equity.csv under this directory.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Sweep rows to print, best first.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Rank income candidates by momentum, volatility and yield.
    Rank {
        #[command(flatten)]
        common: CommonArgs,

        /// Sessions of history for momentum and volatility.
        #[arg(long)]
        lookback: Option<usize>,

        #[arg(long)]
        momentum_weight: Option<f64>,

        #[arg(long)]
        volatility_weight: Option<f64>,

        #[arg(long)]
        income_weight: Option<f64>,

        /// Print the ranking as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Comma-separated tickers, e.g. "MO, T, O, XOM".
    #[arg(long)]
    tickers: Option<String>,

    /// Years of dividend history to evaluate.
    #[arg(long)]
    years_back: Option<u32>,

    /// Exclude the dividend from trade returns.
    #[arg(long, default_value_t = false)]
    no_dividend: bool,

    /// Starting capital for the capital curve.
    #[arg(long)]
    capital: Option<f64>,

    /// Reference date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    as_of: Option<NaiveDate>,

    /// Gate trades on the market regime of --regime-ticker.
    #[arg(long, default_value_t = false)]
    regime: bool,

    #[arg(long)]
    regime_ticker: Option<String>,

    /// Trailing 5-minute samples for the momentum reading.
    #[arg(long)]
    regime_window: Option<usize>,

    /// Fixed market mode instead of a live momentum reading.
    #[arg(long, value_enum)]
    regime_mode: Option<ModeArg>,

    /// Response cache lifetime in minutes.
    #[arg(long, default_value_t = 15)]
    cache_ttl_minutes: u64,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Aggressive,
    Neutral,
    Defensive,
}

impl From<ModeArg> for MarketMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Aggressive => MarketMode::RiskOn,
            ModeArg::Neutral => MarketMode::Neutral,
            ModeArg::Defensive => MarketMode::RiskOff,
        }
    }
}

impl CommonArgs {
    /// Config file (or defaults) with flags applied on top.
    fn to_config(&self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_file(path)?,
            None => RunConfig::for_tickers::<&str>(&[]),
        };
        if let Some(tickers) = &self.tickers {
            config.tickers = parse_ticker_list(tickers);
        }
        if let Some(years) = self.years_back {
            config.years_back = years;
        }
        if self.no_dividend {
            config.include_dividend = false;
        }
        if let Some(capital) = self.capital {
            config.starting_capital = capital;
        }
        if self.as_of.is_some() {
            config.as_of = self.as_of;
        }
        if self.regime || self.regime_mode.is_some() {
            config.regime.enabled = true;
        }
        if let Some(ticker) = &self.regime_ticker {
            config.regime.ticker = ticker.trim().to_uppercase();
        }
        if let Some(window) = self.regime_window {
            config.regime.window = window;
        }
        if let Some(mode) = self.regime_mode {
            config.regime.mode = Some(mode.into());
        }
        Ok(config)
    }

    fn provider(&self) -> Result<CachedProvider<YahooProvider>> {
        let circuit_breaker = Arc::new(CircuitBreaker::default_provider());
        let yahoo = YahooProvider::new(circuit_breaker)?;
        Ok(CachedProvider::with_ttl(
            yahoo,
            std::time::Duration::from_secs(self.cache_ttl_minutes * 60),
        ))
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let today = chrono::Local::now().date_naive();

    match cli.command {
        Commands::Backtest {
            common,
            buy_days,
            sell_days,
            output,
            equity_output,
        } => {
            let mut config = common.to_config()?;
            if let Some(buy) = buy_days {
                config.backtest.buy_days = buy;
            }
            if let Some(sell) = sell_days {
                config.backtest.sell_days = sell;
            }
            run_backtest_cmd(&common, &config, today, output, equity_output)
        }
        Commands::Optimize {
            common,
            buy_min,
            buy_max,
            sell_min,
            sell_max,
            output,
            output_dir,
            top,
        } => {
            let mut config = common.to_config()?;
            let sweep = &mut config.sweep;
            sweep.buy_min = buy_min.unwrap_or(sweep.buy_min);
            sweep.buy_max = buy_max.unwrap_or(sweep.buy_max);
            sweep.sell_min = sell_min.unwrap_or(sweep.sell_min);
            sweep.sell_max = sell_max.unwrap_or(sweep.sell_max);
            run_optimize_cmd(&common, &config, today, output, output_dir, top)
        }
        Commands::Rank {
            common,
            lookback,
            momentum_weight,
            volatility_weight,
            income_weight,
            json,
        } => {
            let mut config = common.to_config()?;
            let rotation = &mut config.rotation;
            rotation.lookback_sessions = lookback.unwrap_or(rotation.lookback_sessions);
            rotation.momentum_weight = momentum_weight.unwrap_or(rotation.momentum_weight);
            rotation.volatility_weight = volatility_weight.unwrap_or(rotation.volatility_weight);
            rotation.income_weight = income_weight.unwrap_or(rotation.income_weight);
            run_rank_cmd(&common, &config, today, json)
        }
    }
}

fn run_backtest_cmd(
    common: &CommonArgs,
    config: &RunConfig,
    today: NaiveDate,
    output: Option<PathBuf>,
    equity_output: Option<PathBuf>,
) -> Result<()> {
    let provider = common.provider()?;
    let (universe, mode, outcome) = run_configured_backtest(&provider, config, today)?;

    println!("Market mode: {mode}");
    print_skipped(&universe);

    match outcome {
        BacktestOutcome::Empty { skips } => {
            println!(
                "No trades found ({} unaligned, {} invalid prices). Try different settings or tickers.",
                skips.unaligned, skips.invalid_price
            );
        }
        BacktestOutcome::Trades {
            trades,
            report,
            per_ticker,
            skips,
        } => {
            let s = &report.stats;
            println!("{} trades found", s.trade_count);
            println!("  Win rate:       {:.1}%", s.win_rate * 100.0);
            println!("  Avg return:     {:.2}%", s.mean_return_pct);
            println!("  Median return:  {:.2}%", s.median_return_pct);
            println!("  Total return:   {:.2}%", s.total_return * 100.0);
            println!("  Final capital:  ${:.2}", s.final_capital);
            println!("  CAGR:           {:.2}%", s.cagr * 100.0);
            println!("  Max drawdown:   {:.2}%", s.max_drawdown * 100.0);
            if skips.total() > 0 {
                println!(
                    "  Skipped:        {} unaligned, {} invalid prices",
                    skips.unaligned, skips.invalid_price
                );
            }
            println!();
            print_ticker_summary(&per_ticker);

            if let Some(path) = output {
                write_csv(&path, &export_trades_csv(&trades)?)?;
                println!("Trade log saved to: {}", path.display());
            }
            if let Some(path) = equity_output {
                write_csv(&path, &export_equity_csv(&report.curve, s.starting_capital)?)?;
                println!("Equity curve saved to: {}", path.display());
            }
        }
    }
    Ok(())
}

fn run_optimize_cmd(
    common: &CommonArgs,
    config: &RunConfig,
    today: NaiveDate,
    output: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    top: usize,
) -> Result<()> {
    let provider = common.provider()?;
    let (universe, report) = match run_configured_optimization(&provider, config, today) {
        Ok(r) => r,
        Err(e @ RunError::NoValidParameters { .. }) => {
            println!("{e}");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    print_skipped(&universe);
    print_optimization(&report, top);

    if let Some(path) = output {
        write_csv(&path, &export_sweep_csv(&report.sweep)?)?;
        println!("Sweep table saved to: {}", path.display());
    }
    if let Some(dir) = output_dir {
        let run_dir = save_artifacts(&report, &dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn run_rank_cmd(common: &CommonArgs, config: &RunConfig, today: NaiveDate, json: bool) -> Result<()> {
    let provider = common.provider()?;
    let report = run_configured_ranking(&provider, config, today)?;

    if json {
        let out =
            serde_json::to_string_pretty(&report).context("failed to serialize ranking")?;
        println!("{out}");
        return Ok(());
    }
    print_ranking(&report);
    Ok(())
}

fn print_skipped(universe: &Universe) {
    for s in universe.skipped() {
        println!("Skipped {}: {:?}", s.ticker, s.reason);
    }
}

fn print_ticker_summary(rows: &[TickerSummary]) {
    println!("{:<8} {:>7} {:>10} {:>12}", "Ticker", "Trades", "Win Rate", "Avg Return");
    println!("{}", "-".repeat(40));
    for r in rows {
        println!(
            "{:<8} {:>7} {:>9.2}% {:>11.2}%",
            r.ticker, r.trades, r.win_rate_pct, r.avg_return_pct
        );
    }
}

fn print_optimization(report: &OptimizationReport, top: usize) {
    let s = &report.stats;
    println!("Market mode: {}", report.market_mode);
    println!(
        "Best pair: buy {} days / sell {} days before ex-date",
        report.best_params.buy_offset_days(),
        report.best_params.sell_offset_days()
    );
    println!("  Trades:         {}", s.trade_count);
    println!("  Total return:   {:.2}%", s.total_return * 100.0);
    println!("  Final capital:  ${:.2}", s.final_capital);
    println!("  CAGR:           {:.2}%", report.cagr * 100.0);
    println!("  Max drawdown:   {:.2}%", report.max_drawdown * 100.0);
    if let Some(run_id) = &report.run_id {
        println!("  Run id:         {}", &run_id[..12.min(run_id.len())]);
    }
    println!();

    let mut rows = report.sweep.clone();
    rows.sort_by(|a, b| b.total_return.total_cmp(&a.total_return));
    println!("{:>8} {:>9} {:>7} {:>14}", "Buy", "Sell", "Trades", "Total Return");
    println!("{}", "-".repeat(41));
    for r in rows.iter().take(top) {
        println!(
            "{:>8} {:>9} {:>7} {:>13.2}%",
            r.params.buy_offset_days(),
            r.params.sell_offset_days(),
            r.trade_count,
            r.total_return * 100.0
        );
    }
}

fn print_ranking(report: &RankingReport) {
    println!("Scored with {} over {} sessions", report.scorer, report.lookback_sessions);
    println!(
        "{:<4} {:<8} {:>9} {:>11} {:>9} {:>9}",
        "#", "Ticker", "Momentum", "Volatility", "Yield", "Score"
    );
    println!("{}", "-".repeat(55));
    for (i, c) in report.ranked.iter().enumerate() {
        println!(
            "{:<4} {:<8} {:>8.2}% {:>10.2}% {:>8.2}% {:>9.4}",
            i + 1,
            c.ticker,
            c.metrics.momentum * 100.0,
            c.metrics.volatility * 100.0,
            c.metrics.income_yield * 100.0,
            c.score
        );
    }
    for s in &report.skipped {
        println!("Skipped {}: {:?}", s.ticker, s.reason);
    }
}
