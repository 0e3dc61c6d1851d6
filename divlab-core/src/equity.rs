//! Equity curve and summary statistics — pure functions over a trade list.
//!
//! Trades are ordered by entry date (stable, so trades of several tickers
//! opened on the same day keep their input order) and compounded into a
//! multiplier series starting from 1.0.

use crate::domain::Trade;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One point of the compounded equity curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub multiplier: f64,
}

/// Cumulative multiplier per trade, in entry-date order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EquityCurve {
    pub points: Vec<EquityPoint>,
}

impl EquityCurve {
    /// Final multiplier; 1.0 for an empty curve.
    pub fn final_multiplier(&self) -> f64 {
        self.points.last().map(|p| p.multiplier).unwrap_or(1.0)
    }

    pub fn multipliers(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.multiplier).collect()
    }

    /// Capital value at each point for a given starting amount.
    pub fn capital(&self, starting_capital: f64) -> Vec<(NaiveDate, f64)> {
        self.points
            .iter()
            .map(|p| (p.date, starting_capital * p.multiplier))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Aggregate statistics for a non-empty trade list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub trade_count: usize,
    /// Fraction of trades with a positive total return.
    pub win_rate: f64,
    /// Mean total return, in percent.
    pub mean_return_pct: f64,
    /// Median total return, in percent.
    pub median_return_pct: f64,
    pub final_multiplier: f64,
    /// `final_multiplier - 1`.
    pub total_return: f64,
    pub starting_capital: f64,
    pub final_capital: f64,
    pub cagr: f64,
    /// Worst peak-to-trough decline as a negative fraction.
    pub max_drawdown: f64,
}

/// Curve, stats and the trades in the order they were compounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveReport {
    pub trades: Vec<Trade>,
    pub curve: EquityCurve,
    pub stats: SummaryStats,
}

/// Sort, compound and summarise. `None` when there are no trades: an empty
/// run has no statistics, not zero-valued ones.
pub fn build_curve(trades: &[Trade], starting_capital: f64, years_back: f64) -> Option<CurveReport> {
    if trades.is_empty() {
        return None;
    }

    let sorted = sort_by_entry(trades);
    let curve = compound(&sorted);
    let multipliers = curve.multipliers();
    let returns: Vec<f64> = sorted.iter().map(|t| t.total_return).collect();

    let final_multiplier = curve.final_multiplier();
    let final_capital = starting_capital * final_multiplier;

    let stats = SummaryStats {
        trade_count: sorted.len(),
        win_rate: win_rate(&sorted),
        mean_return_pct: mean(&returns) * 100.0,
        median_return_pct: median(&returns) * 100.0,
        final_multiplier,
        total_return: final_multiplier - 1.0,
        starting_capital,
        final_capital,
        cagr: cagr(starting_capital, final_capital, years_back),
        max_drawdown: max_drawdown(&multipliers),
    };

    Some(CurveReport {
        trades: sorted,
        curve,
        stats,
    })
}

/// Stable sort by entry date.
pub fn sort_by_entry(trades: &[Trade]) -> Vec<Trade> {
    let mut sorted = trades.to_vec();
    sorted.sort_by_key(|t| t.entry_date);
    sorted
}

/// Compound trades in the given order.
pub fn compound(trades: &[Trade]) -> EquityCurve {
    let mut multiplier = 1.0;
    let points = trades
        .iter()
        .map(|t| {
            multiplier *= 1.0 + t.total_return;
            EquityPoint {
                date: t.entry_date,
                multiplier,
            }
        })
        .collect();
    EquityCurve { points }
}

/// Total compounded return without building the curve.
pub fn compounded_return(trades: &[Trade]) -> f64 {
    trades.iter().fold(1.0, |acc, t| acc * (1.0 + t.total_return)) - 1.0
}

// ─── Individual metric functions ────────────────────────────────────

/// Fraction of trades with a positive total return.
pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

/// Compound annual growth rate over `years` calendar years.
///
/// Returns 0.0 when the inputs cannot produce a real number.
pub fn cagr(starting_capital: f64, final_capital: f64, years: f64) -> f64 {
    if starting_capital <= 0.0 || final_capital <= 0.0 || years <= 0.0 {
        return 0.0;
    }
    (final_capital / starting_capital).powf(1.0 / years) - 1.0
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
///
/// The running peak starts at the first point of the curve.
pub fn max_drawdown(curve: &[f64]) -> f64 {
    let Some(&first) = curve.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;

    for &value in curve {
        if value > peak {
            peak = value;
        }
        if peak > 0.0 {
            let dd = value / peak - 1.0;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median; the average of the two middle values for even lengths.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn trade(ticker: &str, entry: &str, total_return: f64) -> Trade {
        Trade {
            ticker: ticker.into(),
            ex_date: d(entry),
            entry_date: d(entry),
            exit_date: d(entry),
            entry_price: 100.0,
            exit_price: 100.0 * (1.0 + total_return),
            dividend: 0.0,
            price_return: total_return,
            total_return,
        }
    }

    // ── Curve ──

    #[test]
    fn compounding_known_sequence() {
        let trades = vec![
            trade("MO", "2024-01-02", 0.10),
            trade("MO", "2024-02-02", -0.05),
            trade("MO", "2024-03-02", 0.02),
        ];
        let report = build_curve(&trades, 10_000.0, 1.0).unwrap();
        let m = report.curve.multipliers();
        assert!((m[0] - 1.10).abs() < 1e-12);
        assert!((m[1] - 1.045).abs() < 1e-12);
        assert!((m[2] - 1.0659).abs() < 1e-12);
        let expected_dd = 1.045 / 1.10 - 1.0;
        assert!((report.stats.max_drawdown - expected_dd).abs() < 1e-12);
        assert!((report.stats.max_drawdown + 0.04545).abs() < 1e-5);
    }

    #[test]
    fn sorts_by_entry_date_stably() {
        let trades = vec![
            trade("O", "2024-03-01", 0.01),
            trade("MO", "2024-01-01", 0.02),
            trade("T", "2024-03-01", 0.03),
            trade("XOM", "2024-01-01", 0.04),
        ];
        let report = build_curve(&trades, 1.0, 1.0).unwrap();
        let order: Vec<&str> = report.trades.iter().map(|t| t.ticker.as_str()).collect();
        assert_eq!(order, vec!["MO", "XOM", "O", "T"]);
        assert_eq!(report.curve.points[0].date, d("2024-01-01"));
    }

    #[test]
    fn no_trades_means_no_report() {
        assert!(build_curve(&[], 10_000.0, 5.0).is_none());
    }

    #[test]
    fn stats_known_values() {
        let trades = vec![
            trade("MO", "2024-01-02", 0.02),
            trade("MO", "2024-02-02", -0.01),
            trade("MO", "2024-03-02", 0.03),
            trade("MO", "2024-04-02", 0.00),
        ];
        let report = build_curve(&trades, 10_000.0, 2.0).unwrap();
        let s = &report.stats;
        assert_eq!(s.trade_count, 4);
        assert!((s.win_rate - 0.5).abs() < 1e-12);
        assert!((s.mean_return_pct - 1.0).abs() < 1e-9);
        assert!((s.median_return_pct - 1.0).abs() < 1e-9);
        let fm = 1.02 * 0.99 * 1.03 * 1.0;
        assert!((s.final_multiplier - fm).abs() < 1e-12);
        assert!((s.total_return - (fm - 1.0)).abs() < 1e-12);
        assert!((s.final_capital - 10_000.0 * fm).abs() < 1e-6);
        assert!((s.cagr - (fm.powf(0.5) - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn capital_curve_scales_multiplier() {
        let trades = vec![trade("MO", "2024-01-02", 0.10)];
        let report = build_curve(&trades, 5_000.0, 1.0).unwrap();
        let capital = report.curve.capital(5_000.0);
        assert_eq!(capital.len(), 1);
        assert!((capital[0].1 - 5_500.0).abs() < 1e-9);
    }

    // ── Max drawdown ──

    #[test]
    fn max_drawdown_monotonic_is_zero() {
        assert_eq!(max_drawdown(&[1.0, 1.1, 1.2]), 0.0);
    }

    #[test]
    fn max_drawdown_empty_is_zero() {
        assert_eq!(max_drawdown(&[]), 0.0);
    }

    #[test]
    fn max_drawdown_first_point_is_peak() {
        // First trade loses; the curve starts at its own first point
        assert_eq!(max_drawdown(&[0.95, 0.96]), 0.0);
    }

    // ── CAGR ──

    #[test]
    fn cagr_degenerate_inputs() {
        assert_eq!(cagr(0.0, 100.0, 1.0), 0.0);
        assert_eq!(cagr(100.0, 0.0, 1.0), 0.0);
        assert_eq!(cagr(100.0, 120.0, 0.0), 0.0);
    }

    #[test]
    fn cagr_two_years() {
        let c = cagr(100.0, 121.0, 2.0);
        assert!((c - 0.1).abs() < 1e-12);
    }

    // ── Helpers ──

    #[test]
    fn median_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), 2.5);
        assert_eq!(median(&[]), 0.0);
    }

    #[test]
    fn compounded_return_matches_curve() {
        let trades = vec![
            trade("MO", "2024-01-02", 0.10),
            trade("MO", "2024-02-02", -0.05),
        ];
        let curve = compound(&trades);
        assert!((compounded_return(&trades) - (curve.final_multiplier() - 1.0)).abs() < 1e-12);
    }
}
