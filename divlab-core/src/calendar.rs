//! Trading-calendar alignment.
//!
//! Ex-dividend-relative targets ("10 calendar days before the ex-date") often
//! land on weekends or holidays. Alignment maps such a target to the last
//! session at or before it. A target earlier than the whole index has no
//! session and yields `None`; callers treat that as "trade not constructible".

use crate::domain::PricePoint;
use chrono::NaiveDate;

/// Nearest trading day at or before `target` in a sorted, de-duplicated index.
pub fn align(target: NaiveDate, trading_days: &[NaiveDate]) -> Option<NaiveDate> {
    let idx = trading_days.partition_point(|&d| d <= target);
    if idx == 0 {
        return None;
    }
    Some(trading_days[idx - 1])
}

/// Same rule as [`align`], returning the whole price point.
pub(crate) fn align_points(target: NaiveDate, points: &[PricePoint]) -> Option<&PricePoint> {
    let idx = points.partition_point(|p| p.date <= target);
    if idx == 0 {
        return None;
    }
    Some(&points[idx - 1])
}
