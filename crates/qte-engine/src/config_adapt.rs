use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;

use qte_blackouts::{BlackoutWindow, EarningsBlackout, MacroBlackout};
use qte_calendar::Calendar;
use qte_compliance::{PdtCompliance, PdtConfig};
use qte_config::{BlackoutWindowConfig, EngineConfig, PlayerFocusConfig, SessionWindowConfig};
use qte_execution::{ExecutionConfig, ExecutionManager};
use qte_marketquality::{MarketQualityGate, VolatilityDoNotTrade};
use qte_risk::{PortfolioRiskConfig, PortfolioRiskState};
use qte_schemas::{PlayerFocus, SessionWindow};
use qte_sizing::{HighVolReduction, PositionSizer};
use qte_strategy::{TrendFollowingConfig, TrendFollowingStrategy};
use qte_tracker::Tracker;

use crate::engine::Engine;

/// Hardcoded cent tick size. `ExecutionConfig::tick_size` has no field in
/// the configuration schema; every venue this targets quotes in cents.
const TICK_SIZE: f64 = 0.01;

fn parse_dates(raw: &[String], label: &str) -> BTreeSet<NaiveDate> {
    raw.iter()
        .filter_map(|s| match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            Ok(d) => Some(d),
            Err(err) => {
                tracing::warn!(date = %s, %label, %err, "skipping unparsable date");
                None
            }
        })
        .collect()
}

fn parse_session_window(cfg: &SessionWindowConfig, fallback: SessionWindow) -> SessionWindow {
    match cfg.parsed() {
        Some((start, end)) => SessionWindow::new(start, end, cfg.trade_allowed),
        None => {
            tracing::warn!(start = %cfg.start, end = %cfg.end, "unparsable session window, using fallback");
            fallback
        }
    }
}

fn parse_blackout_windows(raw: &[BlackoutWindowConfig]) -> Vec<BlackoutWindow> {
    raw.iter()
        .filter_map(|w| {
            let date = NaiveDate::parse_from_str(&w.date, "%Y-%m-%d").ok()?;
            let start = chrono::NaiveTime::parse_from_str(&w.start, "%H:%M").ok()?;
            let end = chrono::NaiveTime::parse_from_str(&w.end, "%H:%M").ok()?;
            Some(BlackoutWindow { date, start, end })
        })
        .collect()
}

fn parse_earnings_dates(raw: &HashMap<String, Vec<String>>) -> HashMap<String, Vec<NaiveDate>> {
    raw.iter()
        .map(|(symbol, dates)| {
            let parsed = dates
                .iter()
                .filter_map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
                .collect();
            (symbol.to_uppercase(), parsed)
        })
        .collect()
}

/// Wires every `qte-config` section into the leaf components an [`Engine`]
/// needs, and opens the durable position tracker at `tracker_path`.
pub fn build_engine(config: &EngineConfig, tracker_path: impl Into<PathBuf>) -> Result<(Engine, Tracker)> {
    let timezone = chrono_tz::America::New_York;

    let holidays = parse_dates(&config.holidays, "holidays");
    let fallback = |h: u32, m: u32, h2: u32, m2: u32| {
        SessionWindow::new(
            chrono::NaiveTime::from_hms_opt(h, m, 0).unwrap(),
            chrono::NaiveTime::from_hms_opt(h2, m2, 0).unwrap(),
            true,
        )
    };
    let calendar = Calendar::new(
        timezone,
        holidays,
        parse_session_window(&config.market_sessions.pre_market, fallback(4, 0, 9, 30)),
        parse_session_window(&config.market_sessions.regular, fallback(9, 30, 16, 0)),
        parse_session_window(&config.market_sessions.after_hours, fallback(16, 0, 20, 0)),
    );

    let universe = qte_universe::Universe::new(
        config.universe.symbols.iter().cloned(),
        Some(config.universe.min_avg_dollar_volume_30d),
        Some(config.universe.min_atr_multiple_for_volume),
    );

    let macro_blackout = MacroBlackout::new(
        config.trade_filters.macro_blackout.enabled,
        parse_dates(&config.trade_filters.macro_blackout.blackout_dates, "macro_blackout"),
        parse_blackout_windows(&config.trade_filters.macro_blackout.blackout_windows),
    );
    let earnings_blackout = EarningsBlackout::new(
        config.trade_filters.earnings_blackout.enabled,
        config.trade_filters.earnings_blackout.days_before,
        config.trade_filters.earnings_blackout.days_after,
        parse_earnings_dates(&config.trade_filters.earnings_blackout.earnings_dates),
    );

    let market_quality = MarketQualityGate {
        max_spread_pct: config.market_quality.max_spread_pct,
        min_volume_atr_ratio: config.market_quality.min_volume_atr_ratio,
        news_spike_blocking_enabled: config.market_quality.block_on_news_spike,
        news_volatility_spike_atr_multiple: config.market_quality.news_volatility_spike_atr_multiple,
    };
    let volatility_dnt = VolatilityDoNotTrade {
        enabled: config.trade_filters.volatility_do_not_trade.enabled,
        max_atr_pct: config.trade_filters.volatility_do_not_trade.max_atr_pct,
        max_spread_pct: config.trade_filters.volatility_do_not_trade.max_spread_pct,
    };

    let player_focus = match config.strategy.player_focus {
        PlayerFocusConfig::Neutral => PlayerFocus::Neutral,
        PlayerFocusConfig::Institutional => PlayerFocus::Institutional,
        PlayerFocusConfig::Retail => PlayerFocus::Retail,
    };
    let take_profit_pct = if config.strategy.exits.take_profit_pct > 0.0 {
        Some(config.strategy.exits.take_profit_pct)
    } else {
        None
    };
    let atr_period = config.strategy.trend_following.volatility_filter_atr_period as u32;
    let strategy = TrendFollowingStrategy::new(TrendFollowingConfig {
        player_focus,
        ma_fast: config.strategy.trend_following.ma_fast as u32,
        ma_slow: config.strategy.trend_following.ma_slow as u32,
        pullback_touch_ma_fast: config.strategy.trend_following.pullback_touch_ma_fast,
        atr_period,
        max_atr_pct_for_entry: config.strategy.trend_following.max_atr_pct_for_entry,
        institutional_min_volume_ratio: config.strategy.institutional.min_volume_ratio_vs_avg,
        retail_ma_fast: config.strategy.retail.ma_fast as u32,
        retail_ma_slow: config.strategy.retail.ma_slow as u32,
        retail_time_bars_exit: config.strategy.retail.time_bars_exit,
        stop_loss_pct: config.strategy.exits.stop_loss_pct,
        take_profit_pct,
        time_bars_exit: config.strategy.exits.time_bars_exit,
        ks_max_spread_pct: config.strategy.exits.kill_switch.max_spread_pct,
        ks_max_atr_multiple: config.strategy.exits.kill_switch.max_atr_multiple,
        candlestick_enabled: config.strategy.candlestick_filter.enabled,
        candlestick_patterns: config.strategy.candlestick_filter.patterns.clone(),
    });

    let sizer = PositionSizer {
        risk_per_trade_pct: config.position_sizing.risk_per_trade_pct,
        max_open_risk_pct: config.position_sizing.max_open_risk_pct,
        max_exposure_per_symbol_pct: config.position_sizing.max_exposure_per_symbol_pct,
        max_exposure_per_sector_pct: config.position_sizing.max_exposure_per_sector_pct,
        high_vol_reduction: HighVolReduction {
            enabled: config.position_sizing.high_vol_reduction.enabled,
            atr_pct_threshold: config.position_sizing.high_vol_reduction.atr_pct_threshold,
            size_multiplier: config.position_sizing.high_vol_reduction.size_multiplier,
        },
    };

    let portfolio_risk = PortfolioRiskState::new(PortfolioRiskConfig {
        daily_loss_limit_pct: config.portfolio_risk.daily_loss_limit_pct,
        max_drawdown_pct: config.portfolio_risk.max_drawdown_pct,
        safe_mode_after_max_dd: config.portfolio_risk.safe_mode_after_max_dd,
        recovery_criteria_pct: config.portfolio_risk.recovery_criteria_pct,
        max_trades_per_day: config.portfolio_risk.max_trades_per_day,
        max_trades_per_symbol_per_day: config.portfolio_risk.max_trades_per_symbol_per_day,
    });

    let pdt = PdtCompliance::new(PdtConfig {
        enabled: config.compliance.pdt_enabled,
        margin_account: config.compliance.margin_account,
        pdt_min_equity: config.compliance.pdt_min_equity,
    });

    let execution = ExecutionManager::new(ExecutionConfig {
        prefer_limit_orders: config.execution.prefer_limit_orders,
        limit_order_offset_ticks: config.execution.limit_order_offset_ticks,
        tick_size: TICK_SIZE,
        max_spread_pct_to_trade: config.execution.max_spread_pct_to_trade,
        partial_fill_timeout_seconds: config.execution.partial_fill_timeout_seconds as u32,
        cancel_replace_on_partial: config.execution.cancel_replace_on_partial,
        block_strategy_if_slippage_bps_avg_exceeds: config
            .execution
            .block_strategy_if_slippage_bps_avg_exceeds,
    });

    let engine = Engine::new(
        timezone,
        calendar,
        universe,
        macro_blackout,
        earnings_blackout,
        market_quality,
        volatility_dnt,
        execution,
        portfolio_risk,
        pdt,
        strategy,
        sizer,
        atr_period as usize,
    );

    let tracker = Tracker::load(tracker_path)?;
    Ok((engine, tracker))
}
