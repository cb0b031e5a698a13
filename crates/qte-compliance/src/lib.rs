//! Pattern Day Trader (PDT) compliance.
//!
//! # Regulatory background
//! FINRA restricts a margin account that executes four or more day trades in
//! five business days to a minimum $25,000 equity, otherwise further day
//! trades are blocked. This module approximates the five-business-day window
//! with a flat seven-calendar-day lookback, which is always at least as wide
//! as five business days and therefore never under-restricts.
//!
//! Evaluation ([`PdtCompliance::can_day_trade`]) is pure; committing a trade
//! to history is a separate call ([`PdtCompliance::record_day_trade`]) made
//! only once the trade actually executes.

use chrono::NaiveDate;

pub struct PdtConfig {
    pub enabled: bool,
    pub margin_account: bool,
    pub pdt_min_equity: f64,
}

impl PdtConfig {
    pub fn finra_defaults() -> Self {
        Self {
            enabled: true,
            margin_account: true,
            pdt_min_equity: 25_000.0,
        }
    }
}

/// Below-threshold accounts may record at most this many day trades in the
/// rolling window before further day trades are blocked.
const MAX_DAY_TRADES_BELOW_THRESHOLD: usize = 3;

/// Width, in calendar days, of the rolling lookback window.
const ROLLING_WINDOW_DAYS: i64 = 7;

const HISTORY_CAP: usize = 20;

pub struct PdtState {
    day_trade_dates: Vec<NaiveDate>,
}

impl PdtState {
    pub fn new() -> Self {
        Self {
            day_trade_dates: Vec::new(),
        }
    }

    fn rolling_count(&self, today: NaiveDate) -> usize {
        let cutoff = today - chrono::Duration::days(ROLLING_WINDOW_DAYS);
        self.day_trade_dates.iter().filter(|&&d| d >= cutoff).count()
    }
}

impl Default for PdtState {
    fn default() -> Self {
        Self::new()
    }
}

pub struct PdtCompliance {
    config: PdtConfig,
}

impl PdtCompliance {
    pub fn new(config: PdtConfig) -> Self {
        Self { config }
    }

    pub fn can_day_trade(&self, state: &PdtState, equity: f64, today: NaiveDate) -> Result<(), String> {
        if !self.config.enabled || !self.config.margin_account {
            return Ok(());
        }
        if equity >= self.config.pdt_min_equity {
            return Ok(());
        }
        let recent = state.rolling_count(today);
        if recent >= MAX_DAY_TRADES_BELOW_THRESHOLD {
            return Err(format!(
                "PDT: equity ${equity:.0} < ${:.0}; day trade limit ({MAX_DAY_TRADES_BELOW_THRESHOLD}) in rolling 7-day window reached",
                self.config.pdt_min_equity
            ));
        }
        Ok(())
    }

    pub fn record_day_trade(&self, state: &mut PdtState, today: NaiveDate) {
        state.day_trade_dates.push(today);
        if state.day_trade_dates.len() > HISTORY_CAP {
            let drop = state.day_trade_dates.len() - HISTORY_CAP;
            state.day_trade_dates.drain(0..drop);
        }
    }
}
