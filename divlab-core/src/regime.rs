//! Market regime classification and the defensive trade filter.
//!
//! The mode is computed once per run from a freshly supplied momentum reading
//! and passed explicitly to whatever needs it. Nothing here holds state.

use crate::domain::Trade;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Momentum above this is risk-on.
pub const RISK_ON_THRESHOLD: f64 = 0.003;

/// Momentum below this is risk-off.
pub const RISK_OFF_THRESHOLD: f64 = -0.003;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketMode {
    RiskOn,
    Neutral,
    RiskOff,
}

impl fmt::Display for MarketMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketMode::RiskOn => write!(f, "AGGRESSIVE"),
            MarketMode::Neutral => write!(f, "NEUTRAL"),
            MarketMode::RiskOff => write!(f, "DEFENSIVE"),
        }
    }
}

/// Classify a fractional momentum reading (0.003 = +0.3%).
///
/// Both thresholds are inclusive to `Neutral`. A NaN reading is `Neutral`.
pub fn classify(momentum: f64) -> MarketMode {
    if momentum > RISK_ON_THRESHOLD {
        MarketMode::RiskOn
    } else if momentum < RISK_OFF_THRESHOLD {
        MarketMode::RiskOff
    } else {
        MarketMode::Neutral
    }
}

/// Trade predicate driven by the current mode.
///
/// In `RiskOff` mode losing trades are dropped before compounding, so the
/// curve only contains trades a defensive operator would have kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegimeFilter {
    pub mode: MarketMode,
}

impl RegimeFilter {
    pub fn new(mode: MarketMode) -> Self {
        Self { mode }
    }

    pub fn from_momentum(momentum: f64) -> Self {
        Self::new(classify(momentum))
    }

    pub fn is_defensive(&self) -> bool {
        self.mode == MarketMode::RiskOff
    }

    pub fn admits(&self, trade: &Trade) -> bool {
        !(self.is_defensive() && trade.total_return < 0.0)
    }

    /// Keep admitted trades, preserving order.
    pub fn apply(&self, trades: Vec<Trade>) -> Vec<Trade> {
        if !self.is_defensive() {
            return trades;
        }
        trades.into_iter().filter(|t| self.admits(t)).collect()
    }
}
