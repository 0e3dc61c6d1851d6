//! DivLab Core — dividend-capture engine, domain types and market data.
//!
//! This crate holds the pure pipeline and its data boundary:
//! - Domain types (price series, dividend events, trade parameters, trades)
//! - Trading-calendar alignment and dividend event extraction
//! - Trade construction and return calculation
//! - Equity curve compounding and summary statistics
//! - Market regime classification and the defensive filter
//! - Income-rotation scoring
//! - Market-data provider trait with Yahoo, in-memory and cached adapters

pub mod calendar;
pub mod data;
pub mod domain;
pub mod equity;
pub mod events;
pub mod regime;
pub mod returns;
pub mod rotation;
pub mod trade_builder;

pub use domain::{DividendEvent, DomainError, PricePoint, PriceSeries, Trade, TradeParameters};
pub use equity::{build_curve, CurveReport, EquityCurve, EquityPoint, SummaryStats};
pub use regime::{classify, MarketMode, RegimeFilter};
pub use trade_builder::{build_trade, price_window, TradeError};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything shared across sweep workers is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<PriceSeries>();
        require_sync::<PriceSeries>();
        require_send::<DividendEvent>();
        require_sync::<DividendEvent>();
        require_send::<TradeParameters>();
        require_sync::<TradeParameters>();
        require_send::<Trade>();
        require_sync::<Trade>();
        require_send::<CurveReport>();
        require_sync::<CurveReport>();
        require_send::<RegimeFilter>();
        require_sync::<RegimeFilter>();

        require_send::<data::CachedProvider<data::InMemoryProvider>>();
        require_sync::<data::CachedProvider<data::InMemoryProvider>>();
        require_send::<data::CircuitBreaker>();
        require_sync::<data::CircuitBreaker>();
        require_send::<data::YahooProvider>();
        require_sync::<data::YahooProvider>();
    }
}
