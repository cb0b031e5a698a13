//! Portfolio equity/drawdown ledger: daily loss limit, max-drawdown safe
//! mode, and trade-frequency limits.
//!
//! `safe_mode` and `trading_stopped_for_day` are latches: once set by
//! [`PortfolioRiskState::can_trade`] they stay set until an explicit
//! recovery condition clears them (a new day for the latter, drawdown
//! recovering past `recovery_criteria_pct` for the former). Nothing here
//! clears them silently.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};

pub struct PortfolioRiskConfig {
    /// Negative percentage; trading stops for the day once `daily_pnl_pct`
    /// falls to or below this.
    pub daily_loss_limit_pct: f64,
    /// Negative percentage; crossing this drawdown enters safe mode.
    pub max_drawdown_pct: f64,
    pub safe_mode_after_max_dd: bool,
    /// Negative percentage; safe mode holds until drawdown recovers above this.
    pub recovery_criteria_pct: f64,
    pub max_trades_per_day: u32,
    pub max_trades_per_symbol_per_day: u32,
}

pub struct PortfolioRiskState {
    config: PortfolioRiskConfig,
    equity_curve: Vec<(DateTime<Utc>, f64)>,
    peak_equity: f64,
    daily_pnl_pct: f64,
    daily_trade_count: u32,
    daily_trades_per_symbol: HashMap<String, u32>,
    last_trade_date: Option<NaiveDate>,
    safe_mode: bool,
    trading_stopped_for_day: bool,
}

impl PortfolioRiskState {
    pub fn new(config: PortfolioRiskConfig) -> Self {
        Self {
            config,
            equity_curve: Vec::new(),
            peak_equity: 0.0,
            daily_pnl_pct: 0.0,
            daily_trade_count: 0,
            daily_trades_per_symbol: HashMap::new(),
            last_trade_date: None,
            safe_mode: false,
            trading_stopped_for_day: false,
        }
    }

    pub fn safe_mode(&self) -> bool {
        self.safe_mode
    }

    pub fn trading_stopped_for_day(&self) -> bool {
        self.trading_stopped_for_day
    }

    pub fn update_equity(&mut self, t: DateTime<Utc>, equity: f64) {
        self.equity_curve.push((t, equity));
        if equity > self.peak_equity {
            self.peak_equity = equity;
        }
    }

    pub fn drawdown_pct(&self, current_equity: f64) -> f64 {
        if self.peak_equity <= 0.0 {
            return 0.0;
        }
        (current_equity - self.peak_equity) / self.peak_equity * 100.0
    }

    pub fn check_daily_reset(&mut self, today: NaiveDate) {
        if self.last_trade_date != Some(today) {
            self.daily_pnl_pct = 0.0;
            self.daily_trade_count = 0;
            self.daily_trades_per_symbol.clear();
            self.trading_stopped_for_day = false;
            self.last_trade_date = Some(today);
        }
    }

    /// Ordered veto checks; the first violation wins. Mutates latched state
    /// when a latch condition fires (daily loss limit, max drawdown).
    pub fn can_trade(&mut self, equity: f64, symbol: &str, today: NaiveDate) -> Result<(), String> {
        self.check_daily_reset(today);

        if self.safe_mode {
            let dd = self.drawdown_pct(equity);
            if dd <= self.config.recovery_criteria_pct {
                return Err(format!(
                    "safe_mode: drawdown {dd:.2}% not yet recovered to {:.2}%",
                    self.config.recovery_criteria_pct
                ));
            }
        }

        if self.trading_stopped_for_day {
            return Err("daily loss limit hit; trading stopped for the day".to_string());
        }

        if self.daily_pnl_pct <= self.config.daily_loss_limit_pct {
            self.trading_stopped_for_day = true;
            return Err(format!(
                "daily loss limit {:.2}% hit (current: {:.2}%)",
                self.config.daily_loss_limit_pct, self.daily_pnl_pct
            ));
        }

        let dd = self.drawdown_pct(equity);
        if dd <= self.config.max_drawdown_pct && self.config.safe_mode_after_max_dd {
            self.safe_mode = true;
            return Err(format!(
                "max drawdown {:.2}% hit; entering safe mode",
                self.config.max_drawdown_pct
            ));
        }

        if self.daily_trade_count >= self.config.max_trades_per_day {
            return Err(format!("max trades per day ({}) reached", self.config.max_trades_per_day));
        }

        let sym_count = self.daily_trades_per_symbol.get(symbol).copied().unwrap_or(0);
        if sym_count >= self.config.max_trades_per_symbol_per_day {
            return Err(format!(
                "max trades per symbol per day ({}) for {symbol}",
                self.config.max_trades_per_symbol_per_day
            ));
        }

        Ok(())
    }

    pub fn record_trade(&mut self, symbol: &str, pnl_pct: f64) {
        self.daily_trade_count += 1;
        *self.daily_trades_per_symbol.entry(symbol.to_string()).or_insert(0) += 1;
        self.daily_pnl_pct += pnl_pct;
    }
}
