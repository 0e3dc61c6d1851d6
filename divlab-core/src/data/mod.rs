//! Market data: provider trait, adapters, caching and rate-limit protection

pub mod cache;
pub mod circuit_breaker;
pub mod memory;
pub mod provider;
pub mod yahoo;

pub use cache::{CachedProvider, DEFAULT_TTL};
pub use circuit_breaker::CircuitBreaker;
pub use memory::InMemoryProvider;
pub use provider::{trailing_change, DataError, MarketDataProvider};
pub use yahoo::YahooProvider;
