//! qte-schemas
//!
//! Shared value types for the trade-decision pipeline: bars, quotes, signals,
//! orders, fills. These are immutable data carried between gates; none of
//! them touch IO, time, or broker wiring.

mod types;

pub use types::*;
