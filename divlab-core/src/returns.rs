//! Per-trade return arithmetic.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A price that cannot anchor a return calculation.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("invalid price {price}")]
pub struct InvalidPrice {
    pub price: f64,
}

/// Price-only and total (price + dividend) return, as fractions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Returns {
    pub price_return: f64,
    pub total_return: f64,
}

/// Compute returns for one round trip.
///
/// A non-positive or non-finite entry price is rejected instead of producing
/// an infinite or NaN return.
pub fn compute_returns(
    entry_price: f64,
    exit_price: f64,
    dividend: f64,
    include_dividend: bool,
) -> Result<Returns, InvalidPrice> {
    if !entry_price.is_finite() || entry_price <= 0.0 {
        return Err(InvalidPrice { price: entry_price });
    }
    if !exit_price.is_finite() {
        return Err(InvalidPrice { price: exit_price });
    }

    let price_return = (exit_price - entry_price) / entry_price;
    let total_return = if include_dividend {
        (exit_price + dividend - entry_price) / entry_price
    } else {
        price_return
    };

    Ok(Returns {
        price_return,
        total_return,
    })
}
