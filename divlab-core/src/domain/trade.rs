//! Trade — one completed dividend-capture round trip.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Calendar-day offsets before the ex-dividend date.
///
/// The buy offset is always strictly larger than the sell offset: the position
/// is opened first and closed later. Pairs that violate this cannot be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawTradeParameters", into = "RawTradeParameters")]
pub struct TradeParameters {
    buy_offset_days: u32,
    sell_offset_days: u32,
}

#[derive(Serialize, Deserialize)]
struct RawTradeParameters {
    buy_offset_days: u32,
    sell_offset_days: u32,
}

impl TryFrom<RawTradeParameters> for TradeParameters {
    type Error = String;

    fn try_from(raw: RawTradeParameters) -> Result<Self, Self::Error> {
        Self::new(raw.buy_offset_days, raw.sell_offset_days).ok_or_else(|| {
            format!(
                "sell offset {} must be smaller than buy offset {}",
                raw.sell_offset_days, raw.buy_offset_days
            )
        })
    }
}

impl From<TradeParameters> for RawTradeParameters {
    fn from(p: TradeParameters) -> Self {
        Self {
            buy_offset_days: p.buy_offset_days,
            sell_offset_days: p.sell_offset_days,
        }
    }
}

impl TradeParameters {
    /// Returns `None` when `sell_offset_days >= buy_offset_days`.
    pub fn new(buy_offset_days: u32, sell_offset_days: u32) -> Option<Self> {
        if sell_offset_days >= buy_offset_days {
            return None;
        }
        Some(Self {
            buy_offset_days,
            sell_offset_days,
        })
    }

    pub fn buy_offset_days(&self) -> u32 {
        self.buy_offset_days
    }

    pub fn sell_offset_days(&self) -> u32 {
        self.sell_offset_days
    }
}

/// A completed trade around one dividend event.
///
/// Returns are fractions (0.05 = 5%). `total_return` equals `price_return`
/// when the run excludes dividend income.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub ticker: String,
    pub ex_date: NaiveDate,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub entry_price: f64,
    pub exit_price: f64,
    pub dividend: f64,
    pub price_return: f64,
    pub total_return: f64,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.total_return > 0.0
    }

    /// Calendar days between entry and exit (zero for a same-day round trip).
    pub fn days_held(&self) -> i64 {
        (self.exit_date - self.entry_date).num_days()
    }
}
