//! DividendEvent — one ex-dividend date and its per-share amount.

use super::DomainError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DividendEvent {
    pub ticker: String,
    pub ex_date: NaiveDate,
    pub amount: f64,
}

impl DividendEvent {
    /// Validated constructor: the amount must be a non-negative number.
    pub fn new(
        ticker: impl Into<String>,
        ex_date: NaiveDate,
        amount: f64,
    ) -> Result<Self, DomainError> {
        let ticker = ticker.into();
        if amount.is_nan() || amount < 0.0 {
            return Err(DomainError::NegativeDividend {
                ticker,
                ex_date,
                amount,
            });
        }
        Ok(Self {
            ticker,
            ex_date,
            amount,
        })
    }
}

/// Check that no two events of the same ticker share an ex-date.
pub fn ensure_distinct(events: &[DividendEvent]) -> Result<(), DomainError> {
    let mut seen = std::collections::HashSet::with_capacity(events.len());
    for event in events {
        if !seen.insert((event.ticker.as_str(), event.ex_date)) {
            return Err(DomainError::DuplicateDividend {
                ticker: event.ticker.clone(),
                ex_date: event.ex_date,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn negative_amount_rejected() {
        assert!(DividendEvent::new("O", d("2024-03-28"), -0.1).is_err());
        assert!(DividendEvent::new("O", d("2024-03-28"), f64::NAN).is_err());
    }

    #[test]
    fn zero_amount_allowed() {
        assert!(DividendEvent::new("O", d("2024-03-28"), 0.0).is_ok());
    }

    #[test]
    fn duplicates_detected_per_ticker() {
        let events = vec![
            DividendEvent::new("O", d("2024-03-28"), 0.25).unwrap(),
            DividendEvent::new("MO", d("2024-03-28"), 0.98).unwrap(),
        ];
        assert!(ensure_distinct(&events).is_ok());

        let mut dup = events.clone();
        dup.push(DividendEvent::new("O", d("2024-03-28"), 0.26).unwrap());
        assert!(matches!(
            ensure_distinct(&dup),
            Err(DomainError::DuplicateDividend { .. })
        ));
    }
}
