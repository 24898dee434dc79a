//! Data models for the wallet services
//!
//! Plain data shared between the correlator, the aggregation store, the rate
//! provider and the renderer. Nothing here performs I/O.

pub mod chart;
pub mod date_range;
pub mod rate;
pub mod request;
pub mod stats;

// Re-export commonly used types for convenience
pub use chart::DailySeriesPoint;
pub use date_range::{parse_wire_day, DateRange};
pub use rate::{ExchangeRate, FreshnessLabel, RateOrigin, RateQuote};
pub use request::{OutstandingRequest, RequestSlot};
pub use stats::{AggregateKind, AggregateStats, PortfolioState};
