//! Trend-following strategy: price above the slow MA, pullback to the fast
//! MA, volatility filter, optional volume and candlestick filters.

use std::collections::BTreeMap;

use qte_schemas::{EntrySignal, ExitReason, ExitSignal, PlayerFocus, PositionSide};

use crate::bars::BarSeries;

/// Raw, unresolved configuration as read from the config tree. `ma_fast`,
/// `ma_slow`, and `time_bars_exit` are overridden by the retail values when
/// `player_focus == Retail`; institutional focus keeps the default MAs and
/// adds a volume-ratio requirement instead.
pub struct TrendFollowingConfig {
    pub player_focus: PlayerFocus,
    pub ma_fast: u32,
    pub ma_slow: u32,
    pub pullback_touch_ma_fast: bool,
    pub atr_period: u32,
    pub max_atr_pct_for_entry: f64,
    pub institutional_min_volume_ratio: f64,
    pub retail_ma_fast: u32,
    pub retail_ma_slow: u32,
    pub retail_time_bars_exit: u32,
    pub stop_loss_pct: f64,
    pub take_profit_pct: Option<f64>,
    pub time_bars_exit: u32,
    pub ks_max_spread_pct: f64,
    pub ks_max_atr_multiple: f64,
    pub candlestick_enabled: bool,
    pub candlestick_patterns: Vec<String>,
}

pub struct TrendFollowingStrategy {
    player_focus: PlayerFocus,
    ma_fast: u32,
    ma_slow: u32,
    pullback_touch_ma_fast: bool,
    atr_period: u32,
    max_atr_pct_for_entry: f64,
    institutional_min_volume_ratio: f64,
    stop_loss_pct: f64,
    take_profit_pct: Option<f64>,
    time_bars_exit: u32,
    ks_max_spread_pct: f64,
    ks_max_atr_multiple: f64,
    candlestick_enabled: bool,
    candlestick_patterns: Vec<String>,
}

impl TrendFollowingStrategy {
    pub fn new(cfg: TrendFollowingConfig) -> Self {
        let (ma_fast, ma_slow, time_bars_exit) = if cfg.player_focus == PlayerFocus::Retail {
            (cfg.retail_ma_fast, cfg.retail_ma_slow, cfg.retail_time_bars_exit)
        } else {
            (cfg.ma_fast, cfg.ma_slow, cfg.time_bars_exit)
        };
        Self {
            player_focus: cfg.player_focus,
            ma_fast,
            ma_slow,
            pullback_touch_ma_fast: cfg.pullback_touch_ma_fast,
            atr_period: cfg.atr_period,
            max_atr_pct_for_entry: cfg.max_atr_pct_for_entry,
            institutional_min_volume_ratio: cfg.institutional_min_volume_ratio,
            stop_loss_pct: cfg.stop_loss_pct,
            take_profit_pct: cfg.take_profit_pct,
            time_bars_exit,
            ks_max_spread_pct: cfg.ks_max_spread_pct,
            ks_max_atr_multiple: cfg.ks_max_atr_multiple,
            candlestick_enabled: cfg.candlestick_enabled,
            candlestick_patterns: cfg.candlestick_patterns,
        }
    }

    pub fn time_bars_exit(&self) -> u32 {
        self.time_bars_exit
    }

    pub fn stop_loss_pct(&self) -> f64 {
        self.stop_loss_pct
    }

    /// Entry is `long`-only in the default strategy. Returns `None` at the
    /// first unmet condition; order matches the fixed evaluation sequence.
    pub fn generate_entry(
        &self,
        symbol: &str,
        bars: &[qte_schemas::Bar],
        spread_pct: Option<f64>,
        atr_multiple_now: Option<f64>,
    ) -> Option<EntrySignal> {
        let series = BarSeries::new(bars);
        if series.len() < self.ma_slow as usize {
            return None;
        }

        let atr_pct = series.atr_pct(self.atr_period as usize)?;
        if atr_pct > self.max_atr_pct_for_entry {
            return None;
        }

        let ma_fast = series.sma_close(self.ma_fast as usize)?;
        let ma_slow = series.sma_close(self.ma_slow as usize)?;
        let price = series.last()?.close;

        if price <= ma_slow {
            return None;
        }
        if self.pullback_touch_ma_fast && (price - ma_fast).abs() / ma_fast > 0.005 {
            return None;
        }
        if let Some(sp) = spread_pct {
            if sp > self.ks_max_spread_pct {
                return None;
            }
        }
        if let Some(am) = atr_multiple_now {
            if am > self.ks_max_atr_multiple {
                return None;
            }
        }
        if self.player_focus == PlayerFocus::Institutional && series.len() >= 20 {
            let avg_vol = series.sma_volume(20)?;
            if avg_vol > 0.0 {
                let volume_ratio = series.last()?.volume / avg_vol;
                if volume_ratio < self.institutional_min_volume_ratio {
                    return None;
                }
            }
        }
        if self.candlestick_enabled
            && !qte_candlestick::detect_any(bars, &self.candlestick_patterns)
        {
            return None;
        }

        let mut metadata = BTreeMap::new();
        metadata.insert("ma_fast".to_string(), ma_fast.to_string());
        metadata.insert("ma_slow".to_string(), ma_slow.to_string());
        metadata.insert("atr_pct".to_string(), atr_pct.to_string());

        Some(EntrySignal {
            symbol: symbol.to_string(),
            side: PositionSide::Long,
            strength: 1.0,
            stop_pct: self.stop_loss_pct,
            take_profit_pct: self.take_profit_pct,
            time_bars_exit: self.time_bars_exit,
            metadata,
        })
    }

    /// First-match-wins exit state machine; fixed priority order.
    pub fn check_exit(
        &self,
        symbol: &str,
        entry_price: f64,
        current_price: f64,
        bars_held: u32,
        spread_pct: Option<f64>,
        atr_multiple: Option<f64>,
    ) -> Option<ExitSignal> {
        let ret_pct = (current_price - entry_price) / entry_price * 100.0;

        let meta = |k: &str, v: f64| -> BTreeMap<String, String> {
            let mut m = BTreeMap::new();
            m.insert(k.to_string(), v.to_string());
            m
        };

        if ret_pct <= -self.stop_loss_pct {
            return Some(ExitSignal {
                symbol: symbol.to_string(),
                reason: ExitReason::StopLoss,
                metadata: meta("ret_pct", ret_pct),
            });
        }
        if let Some(tp) = self.take_profit_pct {
            if ret_pct >= tp {
                return Some(ExitSignal {
                    symbol: symbol.to_string(),
                    reason: ExitReason::TakeProfit,
                    metadata: meta("ret_pct", ret_pct),
                });
            }
        }
        if bars_held >= self.time_bars_exit {
            return Some(ExitSignal {
                symbol: symbol.to_string(),
                reason: ExitReason::TimeBars,
                metadata: meta("bars_held", bars_held as f64),
            });
        }
        if let Some(sp) = spread_pct {
            if sp > self.ks_max_spread_pct {
                return Some(ExitSignal {
                    symbol: symbol.to_string(),
                    reason: ExitReason::KillSwitch,
                    metadata: meta("spread_pct", sp),
                });
            }
        }
        if let Some(am) = atr_multiple {
            if am > self.ks_max_atr_multiple {
                return Some(ExitSignal {
                    symbol: symbol.to_string(),
                    reason: ExitReason::KillSwitch,
                    metadata: meta("atr_multiple", am),
                });
            }
        }
        None
    }
}
