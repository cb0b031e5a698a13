//! Trend-following entry/exit strategy and the bar-series math it runs on.

mod bars;
mod strategy;

pub use bars::BarSeries;
pub use qte_schemas::PlayerFocus;
pub use strategy::{TrendFollowingConfig, TrendFollowingStrategy};
