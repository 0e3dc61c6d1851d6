//! Serializable run configuration.
//!
//! A run is described by one TOML file (or the equivalent CLI flags). Every
//! section has defaults, so a file containing only `tickers = [...]` is a
//! complete configuration.

use std::path::Path;

use chrono::NaiveDate;
use divlab_core::domain::TradeParameters;
use divlab_core::regime::{MarketMode, RegimeFilter};
use divlab_core::rotation::{
    WeightedScore, DEFAULT_INCOME_WEIGHT, DEFAULT_LOOKBACK_SESSIONS, DEFAULT_MOMENTUM_WEIGHT,
    DEFAULT_VOLATILITY_WEIGHT,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sweep::ParamGrid;

/// Unique identifier for a run (content-addressable hash).
pub type RunId = String;

/// Largest accepted buy or sell offset: ten years of calendar days.
pub const MAX_OFFSET_DAYS: u32 = 3650;

/// Structural problems that abort a run before any data is fetched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no tickers supplied")]
    NoTickers,

    #[error("sell offset ({sell}) must be smaller than buy offset ({buy})")]
    SellNotBeforeBuy { buy: u32, sell: u32 },

    #[error("inverted {name} range: {min}..={max}")]
    InvertedRange { name: &'static str, min: u32, max: u32 },

    #[error("{name} offset {value} exceeds the maximum of {max} days")]
    OffsetTooLarge { name: &'static str, value: u32, max: u32 },

    #[error("buy range must include at least one positive offset")]
    NonPositiveBuyRange,

    #[error("years_back must be at least 1")]
    ZeroYears,

    #[error("starting capital must be positive and finite, got {0}")]
    InvalidCapital(f64),

    #[error("regime window must be at least 1 sample")]
    ZeroRegimeWindow,

    #[error("rotation lookback must be at least 1 session")]
    ZeroLookback,

    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Complete configuration for a backtest, optimization or ranking run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Symbols to evaluate, in report order.
    pub tickers: Vec<String>,

    #[serde(default = "default_years_back")]
    pub years_back: u32,

    #[serde(default = "default_true")]
    pub include_dividend: bool,

    #[serde(default = "default_starting_capital")]
    pub starting_capital: f64,

    /// Reference date for the lookback window. `None` means today.
    #[serde(default)]
    pub as_of: Option<NaiveDate>,

    #[serde(default)]
    pub backtest: BacktestSection,

    #[serde(default)]
    pub sweep: SweepSection,

    #[serde(default)]
    pub regime: RegimeSection,

    #[serde(default)]
    pub rotation: RotationSection,
}

/// Offsets for a single backtest.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct BacktestSection {
    pub buy_days: u32,
    pub sell_days: u32,
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            buy_days: 10,
            sell_days: 3,
        }
    }
}

/// Inclusive offset ranges for the parameter sweep.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SweepSection {
    pub buy_min: u32,
    pub buy_max: u32,
    pub sell_min: u32,
    pub sell_max: u32,
}

impl Default for SweepSection {
    fn default() -> Self {
        Self {
            buy_min: 1,
            buy_max: 30,
            sell_min: 0,
            sell_max: 10,
        }
    }
}

/// Optional market-regime gate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RegimeSection {
    pub enabled: bool,
    /// Index whose intraday momentum decides the mode.
    pub ticker: String,
    /// Trailing intraday samples used for the momentum reading.
    pub window: usize,
    /// Fixed mode, bypassing the momentum fetch.
    pub mode: Option<MarketMode>,
}

impl Default for RegimeSection {
    fn default() -> Self {
        Self {
            enabled: false,
            ticker: "SPY".into(),
            window: 12,
            mode: None,
        }
    }
}

/// Candidate ranking weights.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RotationSection {
    pub momentum_weight: f64,
    pub volatility_weight: f64,
    pub income_weight: f64,
    pub lookback_sessions: usize,
}

impl Default for RotationSection {
    fn default() -> Self {
        Self {
            momentum_weight: DEFAULT_MOMENTUM_WEIGHT,
            volatility_weight: DEFAULT_VOLATILITY_WEIGHT,
            income_weight: DEFAULT_INCOME_WEIGHT,
            lookback_sessions: DEFAULT_LOOKBACK_SESSIONS,
        }
    }
}

impl RotationSection {
    pub fn scorer(&self) -> WeightedScore {
        WeightedScore {
            momentum_weight: self.momentum_weight,
            volatility_weight: self.volatility_weight,
            income_weight: self.income_weight,
        }
    }
}

fn default_years_back() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

fn default_starting_capital() -> f64 {
    10_000.0
}

/// Per-run knobs shared by the backtest and every sweep cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSettings {
    pub include_dividend: bool,
    pub starting_capital: f64,
    pub years_back: u32,
    pub regime: RegimeFilter,
}

impl RunSettings {
    pub fn new(include_dividend: bool, starting_capital: f64, years_back: u32) -> Self {
        Self {
            include_dividend,
            starting_capital,
            years_back,
            regime: RegimeFilter::new(MarketMode::Neutral),
        }
    }

    pub fn with_regime(mut self, regime: RegimeFilter) -> Self {
        self.regime = regime;
        self
    }
}

impl RunConfig {
    /// Minimal config with defaults for everything but the tickers.
    pub fn for_tickers<S: AsRef<str>>(tickers: &[S]) -> Self {
        Self {
            tickers: normalize_tickers(tickers),
            years_back: default_years_back(),
            include_dividend: true,
            starting_capital: default_starting_capital(),
            as_of: None,
            backtest: BacktestSection::default(),
            sweep: SweepSection::default(),
            regime: RegimeSection::default(),
            rotation: RotationSection::default(),
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let mut config: RunConfig = toml::from_str(s)?;
        config.tickers = normalize_tickers(&config.tickers);
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks shared by every run mode.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tickers.is_empty() {
            return Err(ConfigError::NoTickers);
        }
        if self.years_back == 0 {
            return Err(ConfigError::ZeroYears);
        }
        if !self.starting_capital.is_finite() || self.starting_capital <= 0.0 {
            return Err(ConfigError::InvalidCapital(self.starting_capital));
        }
        if self.regime.enabled && self.regime.mode.is_none() && self.regime.window == 0 {
            return Err(ConfigError::ZeroRegimeWindow);
        }
        if self.rotation.lookback_sessions == 0 {
            return Err(ConfigError::ZeroLookback);
        }
        Ok(())
    }

    /// Offsets for a single backtest; rejects `sell >= buy`.
    pub fn trade_parameters(&self) -> Result<TradeParameters, ConfigError> {
        let BacktestSection {
            buy_days,
            sell_days,
        } = self.backtest;
        check_offset("buy", buy_days)?;
        TradeParameters::new(buy_days, sell_days).ok_or(ConfigError::SellNotBeforeBuy {
            buy: buy_days,
            sell: sell_days,
        })
    }

    /// Sweep grid; rejects inverted and all-zero buy ranges.
    pub fn param_grid(&self) -> Result<ParamGrid, ConfigError> {
        let s = self.sweep;
        if s.buy_min > s.buy_max {
            return Err(ConfigError::InvertedRange {
                name: "buy",
                min: s.buy_min,
                max: s.buy_max,
            });
        }
        if s.sell_min > s.sell_max {
            return Err(ConfigError::InvertedRange {
                name: "sell",
                min: s.sell_min,
                max: s.sell_max,
            });
        }
        if s.buy_max == 0 {
            return Err(ConfigError::NonPositiveBuyRange);
        }
        check_offset("buy", s.buy_max)?;
        check_offset("sell", s.sell_max)?;
        Ok(ParamGrid::new(s.buy_min..=s.buy_max, s.sell_min..=s.sell_max))
    }

    pub fn settings(&self) -> RunSettings {
        RunSettings::new(self.include_dividend, self.starting_capital, self.years_back)
    }

    pub fn as_of_or(&self, today: NaiveDate) -> NaiveDate {
        self.as_of.unwrap_or(today)
    }

    /// Computes a deterministic hash ID for this configuration.
    ///
    /// Two runs with identical configs get the same RunId.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

fn check_offset(name: &'static str, value: u32) -> Result<(), ConfigError> {
    if value > MAX_OFFSET_DAYS {
        return Err(ConfigError::OffsetTooLarge {
            name,
            value,
            max: MAX_OFFSET_DAYS,
        });
    }
    Ok(())
}

/// Trim, uppercase and de-duplicate, keeping first-seen order.
pub fn normalize_tickers<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for t in raw {
        let t = t.as_ref().trim().to_uppercase();
        if !t.is_empty() && !out.contains(&t) {
            out.push(t);
        }
    }
    out
}

/// Parse a comma-separated ticker list such as `"MO, T, O, XOM"`.
pub fn parse_ticker_list(input: &str) -> Vec<String> {
    normalize_tickers(&input.split(',').collect::<Vec<_>>())
}
