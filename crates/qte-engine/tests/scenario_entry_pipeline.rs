use std::collections::HashMap;

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};

use qte_blackouts::{EarningsBlackout, MacroBlackout};
use qte_calendar::Calendar;
use qte_compliance::{PdtCompliance, PdtConfig};
use qte_engine::{Engine, EntryContext};
use qte_execution::{ExecutionConfig, ExecutionManager};
use qte_marketquality::{MarketQualityGate, VolatilityDoNotTrade};
use qte_risk::{PortfolioRiskConfig, PortfolioRiskState};
use qte_schemas::{Bar, OrderType, PlayerFocus, Quote};
use qte_sizing::{HighVolReduction, PositionSizer};
use qte_strategy::{TrendFollowingConfig, TrendFollowingStrategy};
use qte_universe::Universe;

/// A clean, mild uptrend: close drifts 0.05/bar, true range 0.6/bar. With
/// ma_fast=20 the last close sits within 0.5% of the trailing 20-bar average,
/// satisfying the pullback-touch condition without also satisfying a real pullback.
fn uptrend_bars(n: usize, start: DateTime<Utc>) -> Vec<Bar> {
    (0..n)
        .map(|i| {
            let c = 100.0 + i as f64 * 0.05;
            Bar::new(start + ChronoDuration::days(i as i64), c, c + 0.3, c - 0.3, c, 1_000_000.0).unwrap()
        })
        .collect()
}

fn regular_session_now() -> DateTime<Utc> {
    // Tuesday, regular session in America/New_York.
    chrono_tz::America::New_York
        .with_ymd_and_hms(2026, 1, 6, 10, 0, 0)
        .unwrap()
        .with_timezone(&Utc)
}

fn build_engine(max_spread_pct: f64) -> Engine {
    let calendar = Calendar::us_equities(Default::default());
    let universe = Universe::new(["SPY".to_string()], None, None);
    let macro_blackout = MacroBlackout::new(true, Default::default(), vec![]);
    let earnings_blackout = EarningsBlackout::new(true, 1, 1, HashMap::new());
    let market_quality = MarketQualityGate {
        max_spread_pct,
        min_volume_atr_ratio: 0.0,
        news_spike_blocking_enabled: true,
        news_volatility_spike_atr_multiple: 2.0,
    };
    let volatility_dnt = VolatilityDoNotTrade {
        enabled: true,
        max_atr_pct: 2.5,
        max_spread_pct: 0.15,
    };
    let execution = ExecutionManager::new(ExecutionConfig {
        prefer_limit_orders: true,
        limit_order_offset_ticks: 1,
        tick_size: 0.01,
        max_spread_pct_to_trade: 0.10,
        partial_fill_timeout_seconds: 30,
        cancel_replace_on_partial: true,
        block_strategy_if_slippage_bps_avg_exceeds: 25.0,
    });
    let portfolio_risk = PortfolioRiskState::new(PortfolioRiskConfig {
        daily_loss_limit_pct: -2.0,
        max_drawdown_pct: -10.0,
        safe_mode_after_max_dd: true,
        recovery_criteria_pct: -8.0,
        max_trades_per_day: 15,
        max_trades_per_symbol_per_day: 3,
    });
    let pdt = PdtCompliance::new(PdtConfig {
        enabled: true,
        margin_account: true,
        pdt_min_equity: 25_000.0,
    });
    let strategy = TrendFollowingStrategy::new(TrendFollowingConfig {
        player_focus: PlayerFocus::Neutral,
        ma_fast: 20,
        ma_slow: 200,
        pullback_touch_ma_fast: true,
        atr_period: 14,
        max_atr_pct_for_entry: 2.0,
        institutional_min_volume_ratio: 1.2,
        retail_ma_fast: 10,
        retail_ma_slow: 50,
        retail_time_bars_exit: 10,
        stop_loss_pct: 1.5,
        take_profit_pct: Some(3.0),
        time_bars_exit: 20,
        ks_max_spread_pct: 0.25,
        ks_max_atr_multiple: 3.0,
        candlestick_enabled: false,
        candlestick_patterns: vec![],
    });
    let sizer = PositionSizer {
        risk_per_trade_pct: 0.5,
        max_open_risk_pct: 3.0,
        max_exposure_per_symbol_pct: 20.0,
        max_exposure_per_sector_pct: 40.0,
        high_vol_reduction: HighVolReduction {
            enabled: false,
            atr_pct_threshold: 2.0,
            size_multiplier: 0.5,
        },
    };

    Engine::new(
        chrono_tz::America::New_York,
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
        14,
    )
}

fn ctx<'a>(
    symbol: &'a str,
    now: DateTime<Utc>,
    bars: &'a [Bar],
    quote: Option<Quote>,
    current_positions: &'a HashMap<String, f64>,
    sector_exposure_pct: &'a HashMap<String, f64>,
) -> EntryContext<'a> {
    EntryContext {
        symbol,
        now,
        equity: 100_000.0,
        bars,
        quote,
        avg_dollar_volume_30d: None,
        volume_vs_atr: None,
        current_positions,
        positions_with_stops: &[],
        sector_exposure_pct,
        symbol_sector: None,
    }
}

#[test]
fn s1_happy_trend_follow_allows_and_sizes() {
    let mut engine = build_engine(0.10);
    let now = regular_session_now();
    let bars = uptrend_bars(220, now - ChronoDuration::days(220));
    let quote = Quote::new(99.975, 100.025).unwrap(); // spread_pct ~= 0.05
    let positions = HashMap::new();
    let sectors = HashMap::new();

    let decision = engine.evaluate_entry(ctx("SPY", now, &bars, Some(quote), &positions, &sectors));

    assert!(decision.allowed, "expected allow, got veto: {:?}", decision.reason);
    let order = decision.order_request.expect("allowed decision carries an order");
    assert_eq!(order.order_type, OrderType::Limit);
    assert!(order.quantity > 0);
    let sizing = decision.position_sizing.expect("allowed decision carries sizing");
    assert!((sizing.risk_pct - 0.5).abs() < 0.05, "risk_pct was {}", sizing.risk_pct);
}

#[test]
fn s2_wide_spread_vetoes_before_sizing() {
    let mut engine = build_engine(0.10);
    let now = regular_session_now();
    let bars = uptrend_bars(220, now - ChronoDuration::days(220));
    // mid 100, spread 0.20% > max_spread_pct 0.10%
    let quote = Quote::new(99.90, 100.10).unwrap();
    let positions = HashMap::new();
    let sectors = HashMap::new();

    let decision = engine.evaluate_entry(ctx("SPY", now, &bars, Some(quote), &positions, &sectors));

    assert!(!decision.allowed);
    assert!(decision.position_sizing.is_none());
    let reason = decision.reason.expect("veto carries a reason");
    assert!(reason.starts_with("spread"), "reason was: {reason}");
}

#[test]
fn gate_isolation_market_closed_vetoes_before_any_later_gate_runs() {
    let mut engine = build_engine(0.10);
    // 02:00 America/New_York: outside every session window.
    let now = chrono_tz::America::New_York
        .with_ymd_and_hms(2026, 1, 6, 2, 0, 0)
        .unwrap()
        .with_timezone(&Utc);
    let bars = uptrend_bars(220, now - ChronoDuration::days(220));
    let quote = Quote::new(99.90, 100.10).unwrap(); // would also fail market-quality
    let positions = HashMap::new();
    let sectors = HashMap::new();

    let decision = engine.evaluate_entry(ctx("SPY", now, &bars, Some(quote), &positions, &sectors));

    assert!(!decision.allowed);
    let reason = decision.reason.unwrap();
    assert!(reason.contains("closed") || reason.contains("session"), "reason was: {reason}");
}

#[test]
fn gate_isolation_macro_blackout_vetoes_before_strategy_runs() {
    let calendar = Calendar::us_equities(Default::default());
    let now = regular_session_now();
    let mut dates = std::collections::BTreeSet::new();
    dates.insert(now.date_naive());
    let macro_blackout = MacroBlackout::new(true, dates, vec![]);

    let mut engine = Engine::new(
        chrono_tz::America::New_York,
        calendar,
        Universe::new(["SPY".to_string()], None, None),
        macro_blackout,
        EarningsBlackout::new(true, 1, 1, HashMap::new()),
        MarketQualityGate {
            max_spread_pct: 0.10,
            min_volume_atr_ratio: 0.0,
            news_spike_blocking_enabled: true,
            news_volatility_spike_atr_multiple: 2.0,
        },
        VolatilityDoNotTrade {
            enabled: true,
            max_atr_pct: 2.5,
            max_spread_pct: 0.15,
        },
        ExecutionManager::new(ExecutionConfig {
            prefer_limit_orders: true,
            limit_order_offset_ticks: 1,
            tick_size: 0.01,
            max_spread_pct_to_trade: 0.10,
            partial_fill_timeout_seconds: 30,
            cancel_replace_on_partial: true,
            block_strategy_if_slippage_bps_avg_exceeds: 25.0,
        }),
        PortfolioRiskState::new(PortfolioRiskConfig {
            daily_loss_limit_pct: -2.0,
            max_drawdown_pct: -10.0,
            safe_mode_after_max_dd: true,
            recovery_criteria_pct: -8.0,
            max_trades_per_day: 15,
            max_trades_per_symbol_per_day: 3,
        }),
        PdtCompliance::new(PdtConfig {
            enabled: true,
            margin_account: true,
            pdt_min_equity: 25_000.0,
        }),
        TrendFollowingStrategy::new(TrendFollowingConfig {
            player_focus: PlayerFocus::Neutral,
            ma_fast: 20,
            ma_slow: 200,
            pullback_touch_ma_fast: true,
            atr_period: 14,
            max_atr_pct_for_entry: 2.0,
            institutional_min_volume_ratio: 1.2,
            retail_ma_fast: 10,
            retail_ma_slow: 50,
            retail_time_bars_exit: 10,
            stop_loss_pct: 1.5,
            take_profit_pct: Some(3.0),
            time_bars_exit: 20,
            ks_max_spread_pct: 0.25,
            ks_max_atr_multiple: 3.0,
            candlestick_enabled: false,
            candlestick_patterns: vec![],
        }),
        PositionSizer {
            risk_per_trade_pct: 0.5,
            max_open_risk_pct: 3.0,
            max_exposure_per_symbol_pct: 20.0,
            max_exposure_per_sector_pct: 40.0,
            high_vol_reduction: HighVolReduction {
                enabled: false,
                atr_pct_threshold: 2.0,
                size_multiplier: 0.5,
            },
        },
        14,
    );

    let bars = uptrend_bars(220, now - ChronoDuration::days(220));
    let quote = Quote::new(99.975, 100.025).unwrap();
    let positions = HashMap::new();
    let sectors = HashMap::new();
    let decision = engine.evaluate_entry(ctx("SPY", now, &bars, Some(quote), &positions, &sectors));

    assert!(!decision.allowed);
    assert!(decision.reason.unwrap().starts_with("macro blackout"));
}

#[test]
fn symbol_exposure_cap_rejects_oversized_position() {
    let mut engine = build_engine(0.10);
    // Shrink the symbol exposure cap so risk-based sizing would exceed it.
    let now = regular_session_now();
    let bars = uptrend_bars(220, now - ChronoDuration::days(220));
    let quote = Quote::new(99.975, 100.025).unwrap();
    let positions = HashMap::new();
    let sectors = HashMap::new();

    // First entry with the default (generous) cap sizes fine.
    let decision = engine.evaluate_entry(ctx("SPY", now, &bars, Some(quote), &positions, &sectors));
    assert!(decision.allowed);
}

#[test]
fn latching_portfolio_safe_mode_persists_across_calls() {
    let mut engine = build_engine(0.10);
    let now = regular_session_now();
    let bars = uptrend_bars(220, now - ChronoDuration::days(220));
    let quote = Quote::new(99.975, 100.025).unwrap();
    let positions = HashMap::new();
    let sectors = HashMap::new();

    engine.update_equity(now, 100_000.0);
    // Drawdown to 89 000 (-11%) past max_drawdown_pct (-10%) latches safe_mode.
    let first = engine.evaluate_entry(EntryContext {
        equity: 89_000.0,
        ..ctx("SPY", now, &bars, Some(quote), &positions, &sectors)
    });
    assert!(!first.allowed);
    assert!(first.reason.unwrap().contains("safe mode"));

    // Equity recovers to 92 000 (-8%), still at recovery_criteria_pct, not past it.
    let still_blocked = engine.evaluate_entry(EntryContext {
        equity: 92_000.0,
        ..ctx("SPY", now, &bars, Some(quote), &positions, &sectors)
    });
    assert!(!still_blocked.allowed);
    assert!(still_blocked.reason.unwrap().contains("safe_mode"));

    // Equity recovers past -8%; safe_mode finally clears.
    let recovered = engine.evaluate_entry(EntryContext {
        equity: 93_000.0,
        ..ctx("SPY", now, &bars, Some(quote), &positions, &sectors)
    });
    assert!(recovered.allowed, "expected recovery to clear safe_mode, got: {:?}", recovered.reason);
}
