use std::collections::HashMap;

use chrono::{DateTime, Utc};

use qte_schemas::{Bar, EntrySignal, OrderRequest, PositionSizingResult, Quote};

/// Everything the entry pipeline needs for a single symbol, bundled to keep
/// [`crate::Engine::evaluate_entry`]'s signature manageable. All fields are
/// borrowed; the engine never stores them past the call.
pub struct EntryContext<'a> {
    pub symbol: &'a str,
    pub now: DateTime<Utc>,
    pub equity: f64,
    pub bars: &'a [Bar],
    pub quote: Option<Quote>,
    pub avg_dollar_volume_30d: Option<f64>,
    pub volume_vs_atr: Option<f64>,
    pub current_positions: &'a HashMap<String, f64>,
    pub positions_with_stops: &'a [(f64, f64)],
    pub sector_exposure_pct: &'a HashMap<String, f64>,
    pub symbol_sector: Option<&'a HashMap<String, String>>,
}

/// Outcome of the entry gate pipeline. `allowed == false` always carries a
/// `reason`; `allowed == true` always carries an `order_request`.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeDecision {
    pub allowed: bool,
    pub reason: Option<String>,
    pub order_request: Option<OrderRequest>,
    pub entry_signal: Option<EntrySignal>,
    pub position_sizing: Option<PositionSizingResult>,
}

impl TradeDecision {
    pub fn veto(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
            order_request: None,
            entry_signal: None,
            position_sizing: None,
        }
    }

    pub fn allow(
        order_request: OrderRequest,
        entry_signal: EntrySignal,
        position_sizing: PositionSizingResult,
    ) -> Self {
        Self {
            allowed: true,
            reason: None,
            order_request: Some(order_request),
            entry_signal: Some(entry_signal),
            position_sizing: Some(position_sizing),
        }
    }
}
