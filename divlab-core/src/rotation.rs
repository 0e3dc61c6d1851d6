//! Income-rotation scoring.
//!
//! Candidates are described by three trailing measures (momentum, volatility,
//! income yield) and ranked by a pluggable scoring function. The weighted
//! linear score is the default; its coefficients are named fields so a
//! configuration can change them without touching the ranking code.

use crate::domain::{DividendEvent, PriceSeries};
use crate::events::dividends_between;
use chrono::Months;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MOMENTUM_WEIGHT: f64 = 0.5;
pub const DEFAULT_VOLATILITY_WEIGHT: f64 = 0.3;
pub const DEFAULT_INCOME_WEIGHT: f64 = 0.2;

/// Sessions of history used for momentum and volatility by default.
pub const DEFAULT_LOOKBACK_SESSIONS: usize = 20;

/// Trailing measures for one candidate. All values are fractions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandidateMetrics {
    /// Close-to-close change over the lookback.
    pub momentum: f64,
    /// Sample standard deviation of daily returns over the lookback.
    pub volatility: f64,
    /// Trailing twelve-month dividends over the last close.
    pub income_yield: f64,
}

impl CandidateMetrics {
    /// Derive the measures from a price series and its dividend history.
    ///
    /// Needs `lookback_sessions + 1` closes; returns `None` otherwise or when
    /// the anchor close is not positive.
    pub fn from_series(
        series: &PriceSeries,
        dividends: &[DividendEvent],
        lookback_sessions: usize,
    ) -> Option<Self> {
        let points = series.points();
        if lookback_sessions == 0 || points.len() < lookback_sessions + 1 {
            return None;
        }
        let window = &points[points.len() - lookback_sessions - 1..];
        let anchor = window[0].close;
        let last = window[window.len() - 1];
        if anchor <= 0.0 || last.close <= 0.0 {
            return None;
        }

        let momentum = (last.close - anchor) / anchor;

        let daily: Vec<f64> = window
            .windows(2)
            .filter(|w| w[0].close > 0.0)
            .map(|w| (w[1].close - w[0].close) / w[0].close)
            .collect();
        let volatility = sample_std(&daily);

        let year_ago = last.date.checked_sub_months(Months::new(12))?;
        let income_yield = dividends_between(dividends, year_ago, last.date) / last.close;

        Some(Self {
            momentum,
            volatility,
            income_yield,
        })
    }
}

/// Turns candidate measures into a single comparable score.
pub trait ScoringFunction: Send + Sync {
    fn name(&self) -> &str;

    fn score(&self, metrics: &CandidateMetrics) -> f64;
}

/// `momentum × w_m − volatility × w_v + income × w_i`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedScore {
    pub momentum_weight: f64,
    pub volatility_weight: f64,
    pub income_weight: f64,
}

impl Default for WeightedScore {
    fn default() -> Self {
        Self {
            momentum_weight: DEFAULT_MOMENTUM_WEIGHT,
            volatility_weight: DEFAULT_VOLATILITY_WEIGHT,
            income_weight: DEFAULT_INCOME_WEIGHT,
        }
    }
}

impl ScoringFunction for WeightedScore {
    fn name(&self) -> &str {
        "weighted_score"
    }

    fn score(&self, m: &CandidateMetrics) -> f64 {
        m.momentum * self.momentum_weight - m.volatility * self.volatility_weight
            + m.income_yield * self.income_weight
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub ticker: String,
    pub metrics: CandidateMetrics,
    pub score: f64,
}

/// Rank candidates by descending score. Equal scores keep input order.
pub fn rank(
    candidates: Vec<(String, CandidateMetrics)>,
    scorer: &dyn ScoringFunction,
) -> Vec<RankedCandidate> {
    let mut ranked: Vec<RankedCandidate> = candidates
        .into_iter()
        .map(|(ticker, metrics)| RankedCandidate {
            score: scorer.score(&metrics),
            ticker,
            metrics,
        })
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}

fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
