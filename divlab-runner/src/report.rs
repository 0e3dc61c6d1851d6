//! Per-ticker performance summary.

use divlab_core::domain::Trade;
use divlab_core::equity::{mean, win_rate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerSummary {
    pub ticker: String,
    pub trades: usize,
    /// Percent of trades with a positive total return, 2 dp.
    pub win_rate_pct: f64,
    /// Mean total return in percent, 2 dp.
    pub avg_return_pct: f64,
}

/// Group trades by ticker, in first-seen order.
pub fn summarize_by_ticker(trades: &[Trade]) -> Vec<TickerSummary> {
    let mut order: Vec<&str> = Vec::new();
    for t in trades {
        if !order.contains(&t.ticker.as_str()) {
            order.push(&t.ticker);
        }
    }

    order
        .into_iter()
        .map(|ticker| {
            let group: Vec<Trade> = trades
                .iter()
                .filter(|t| t.ticker == ticker)
                .cloned()
                .collect();
            let returns: Vec<f64> = group.iter().map(|t| t.total_return).collect();
            TickerSummary {
                ticker: ticker.to_string(),
                trades: group.len(),
                win_rate_pct: round_dp(win_rate(&group) * 100.0, 2),
                avg_return_pct: round_dp(mean(&returns) * 100.0, 2),
            }
        })
        .collect()
}

/// Round half away from zero to `dp` decimal places.
pub fn round_dp(value: f64, dp: i32) -> f64 {
    let factor = 10f64.powi(dp);
    (value * factor).round() / factor
}
