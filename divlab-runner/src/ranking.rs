//! Income-rotation candidate ranking.
//!
//! Fetches one year of closes and the dividend history per candidate, derives
//! trailing momentum, volatility and yield, and orders the basket with a
//! [`ScoringFunction`].

use chrono::NaiveDate;
use divlab_core::data::{DataError, MarketDataProvider};
use divlab_core::events::lookback_start;
use divlab_core::rotation::{rank, CandidateMetrics, RankedCandidate, ScoringFunction};
use serde::{Deserialize, Serialize};

use crate::data_loader::{LoadError, SkipReason, SkippedTicker};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingReport {
    pub as_of: NaiveDate,
    pub scorer: String,
    pub lookback_sessions: usize,
    /// Best first.
    pub ranked: Vec<RankedCandidate>,
    pub skipped: Vec<SkippedTicker>,
}

pub fn rank_candidates<P: MarketDataProvider + ?Sized>(
    provider: &P,
    tickers: &[String],
    lookback_sessions: usize,
    scorer: &dyn ScoringFunction,
    as_of: NaiveDate,
) -> Result<RankingReport, LoadError> {
    let start = lookback_start(as_of, 1);
    let mut candidates = Vec::with_capacity(tickers.len());
    let mut skipped = Vec::new();

    for ticker in tickers {
        let fetched = provider
            .price_history(ticker, start, as_of)
            .and_then(|prices| Ok((prices, provider.dividend_history(ticker)?)));

        let reason = match fetched {
            Ok((prices, dividends)) => {
                match CandidateMetrics::from_series(&prices, &dividends, lookback_sessions) {
                    Some(metrics) => {
                        candidates.push((ticker.clone(), metrics));
                        continue;
                    }
                    None => SkipReason::NoPrices,
                }
            }
            Err(DataError::CircuitBreakerTripped) => {
                return Err(LoadError::ProviderUnavailable(
                    DataError::CircuitBreakerTripped,
                ))
            }
            Err(e) => SkipReason::Fetch {
                message: e.to_string(),
            },
        };

        log::warn!("skipping {ticker}: {reason:?}");
        skipped.push(SkippedTicker {
            ticker: ticker.clone(),
            reason,
        });
    }

    Ok(RankingReport {
        as_of,
        scorer: scorer.name().to_string(),
        lookback_sessions,
        ranked: rank(candidates, scorer),
        skipped,
    })
}
