use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use qte_blackouts::{EarningsBlackout, MacroBlackout};
use qte_calendar::Calendar;
use qte_compliance::{PdtCompliance, PdtState};
use qte_execution::{ExecutionManager, ExecutionState};
use qte_marketquality::{MarketQualityGate, VolatilityDoNotTrade};
use qte_risk::PortfolioRiskState;
use qte_schemas::{Bar, ExitSignal, OrderSide};
use qte_sizing::PositionSizer;
use qte_strategy::{BarSeries, TrendFollowingStrategy};
use qte_universe::Universe;

use crate::decision::{EntryContext, TradeDecision};

/// Ratio of the most recent bar's true range to its trailing ATR. Used as
/// `atr_multiple_now` by both the market-quality gate and the strategy's
/// pre-entry / exit kill-switches — a single caller-computed metric rather
/// than two different readings of "ATR multiple".
fn atr_multiple_now(bars: &[Bar], period: usize) -> Option<f64> {
    if period == 0 || bars.len() < period + 1 {
        return None;
    }
    let series = BarSeries::new(bars);
    let atr = series.atr(period)?;
    if atr <= 0.0 {
        return None;
    }
    let last = bars.last()?;
    let prev_close = bars[bars.len() - 2].close;
    Some(last.true_range(Some(prev_close)) / atr)
}

/// Whether a sizing result's notional is affordable against current buying
/// power. Not part of the gate pipeline proper (buying power is a broker
/// fact checked at submission time), but kept alongside the engine since
/// every caller needs it before calling `submit_order`.
pub fn fits_buying_power(shares: u64, price: f64, buying_power: f64) -> bool {
    shares as f64 * price <= buying_power
}

/// Wires together every leaf component and runs the fixed-order entry gate
/// pipeline from a single symbol's market data and account state down to an
/// `OrderRequest`, or a veto reason.
pub struct Engine {
    timezone: Tz,
    calendar: Calendar,
    universe: Universe,
    macro_blackout: MacroBlackout,
    earnings_blackout: EarningsBlackout,
    market_quality: MarketQualityGate,
    volatility_dnt: VolatilityDoNotTrade,
    execution: ExecutionManager,
    execution_state: ExecutionState,
    portfolio_risk: PortfolioRiskState,
    pdt: PdtCompliance,
    pdt_state: PdtState,
    strategy: TrendFollowingStrategy,
    sizer: PositionSizer,
    atr_period: usize,
}

#[allow(clippy::too_many_arguments)]
impl Engine {
    pub fn new(
        timezone: Tz,
        calendar: Calendar,
        universe: Universe,
        macro_blackout: MacroBlackout,
        earnings_blackout: EarningsBlackout,
        market_quality: MarketQualityGate,
        volatility_dnt: VolatilityDoNotTrade,
        execution: ExecutionManager,
        portfolio_risk: PortfolioRiskState,
        pdt: PdtCompliance,
        strategy: TrendFollowingStrategy,
        sizer: PositionSizer,
        atr_period: usize,
    ) -> Self {
        Self {
            timezone,
            calendar,
            universe,
            macro_blackout,
            earnings_blackout,
            market_quality,
            volatility_dnt,
            execution,
            execution_state: ExecutionState::new(),
            portfolio_risk,
            pdt,
            pdt_state: PdtState::new(),
            strategy,
            sizer,
            atr_period,
        }
    }

    fn local_date(&self, now: DateTime<Utc>) -> chrono::NaiveDate {
        now.with_timezone(&self.timezone).date_naive()
    }

    pub fn strategy_blocked(&self) -> bool {
        self.execution_state.strategy_blocked()
    }

    pub fn stop_loss_pct(&self) -> f64 {
        self.strategy.stop_loss_pct()
    }

    pub fn time_bars_exit(&self) -> u32 {
        self.strategy.time_bars_exit()
    }

    pub fn update_equity(&mut self, t: DateTime<Utc>, equity: f64) {
        self.portfolio_risk.update_equity(t, equity);
    }

    pub fn record_trade(&mut self, symbol: &str, pnl_pct: f64) {
        self.portfolio_risk.record_trade(symbol, pnl_pct);
    }

    pub fn record_day_trade(&mut self, now: DateTime<Utc>) {
        let today = self.local_date(now);
        self.pdt.record_day_trade(&mut self.pdt_state, today);
    }

    pub fn record_fill(
        &mut self,
        symbol: &str,
        side: OrderSide,
        quantity: u64,
        fill_price: f64,
        expected_price: f64,
        timestamp: DateTime<Utc>,
    ) {
        self.execution.record_fill(
            &mut self.execution_state,
            symbol,
            side,
            quantity,
            fill_price,
            expected_price,
            timestamp,
        );
    }

    /// Exit-side evaluation: delegates straight to the strategy's fixed
    /// priority state machine, computing `atr_multiple` from `bars` the same
    /// way the entry path does.
    pub fn evaluate_exit(
        &self,
        symbol: &str,
        entry_price: f64,
        current_price: f64,
        bars_held: u32,
        bars: &[Bar],
        spread_pct: Option<f64>,
    ) -> Option<ExitSignal> {
        let atr_multiple = atr_multiple_now(bars, self.atr_period);
        self.strategy
            .check_exit(symbol, entry_price, current_price, bars_held, spread_pct, atr_multiple)
    }

    /// Runs the fixed-order entry gate pipeline (calendar, macro blackout,
    /// universe, earnings blackout, market quality, spread gate, volatility
    /// DNT, slippage circuit breaker, portfolio risk, PDT, strategy, sizing,
    /// open-risk, order construction). The first veto wins.
    pub fn evaluate_entry(&mut self, ctx: EntryContext<'_>) -> TradeDecision {
        if !self.calendar.trading_allowed(ctx.now) {
            return TradeDecision::veto("market closed or session not tradeable");
        }
        if self.macro_blackout.is_blackout(ctx.now) {
            let today = self.local_date(ctx.now);
            let reason = match self.macro_blackout.window_at(ctx.now) {
                Some(w) => format!("macro blackout window {today} {}-{}", w.start, w.end),
                None => format!("macro blackout date {today}"),
            };
            return TradeDecision::veto(reason);
        }
        if !self.universe.eligible(ctx.symbol, ctx.avg_dollar_volume_30d, ctx.volume_vs_atr) {
            return TradeDecision::veto(format!("{} not eligible for universe/liquidity", ctx.symbol));
        }
        if self.earnings_blackout.is_blackout(ctx.symbol, ctx.now) {
            return TradeDecision::veto(format!("earnings blackout window for {}", ctx.symbol));
        }

        let Some(quote) = ctx.quote else {
            return TradeDecision::veto(format!("no quote available for {}", ctx.symbol));
        };
        let spread_pct = quote.spread_pct();
        let atr_multiple = atr_multiple_now(ctx.bars, self.atr_period);

        if let Err(veto) =
            self.market_quality
                .check(Some(spread_pct), ctx.volume_vs_atr, atr_multiple)
        {
            return TradeDecision::veto(veto.to_string());
        }
        if let Err(reason) = self.execution.can_trade_spread(spread_pct) {
            return TradeDecision::veto(reason);
        }

        let atr_pct = BarSeries::new(ctx.bars).atr_pct(self.atr_period);
        if let Err(reason) = self.volatility_dnt.check(atr_pct, Some(spread_pct)) {
            return TradeDecision::veto(reason);
        }

        if self.execution_state.strategy_blocked() {
            return TradeDecision::veto("strategy blocked: slippage circuit breaker tripped");
        }

        let today = self.local_date(ctx.now);
        if let Err(reason) = self.portfolio_risk.can_trade(ctx.equity, ctx.symbol, today) {
            return TradeDecision::veto(reason);
        }
        if let Err(reason) = self.pdt.can_day_trade(&self.pdt_state, ctx.equity, today) {
            return TradeDecision::veto(reason);
        }

        let Some(entry) = self
            .strategy
            .generate_entry(ctx.symbol, ctx.bars, Some(spread_pct), atr_multiple)
        else {
            return TradeDecision::veto("no entry signal");
        };

        let current_open_risk_pct = self.sizer.total_open_risk_pct(ctx.equity, ctx.positions_with_stops);
        let sizing = self.sizer.size_position(
            ctx.equity,
            quote.mid(),
            entry.stop_pct,
            ctx.symbol,
            ctx.current_positions,
            ctx.sector_exposure_pct,
            ctx.symbol_sector,
            atr_pct,
        );
        if let Some(reason) = &sizing.reject_reason {
            return TradeDecision::veto(reason.clone());
        }
        if self
            .sizer
            .would_exceed_max_open_risk(current_open_risk_pct, sizing.risk_pct)
        {
            return TradeDecision::veto("would exceed max open risk");
        }

        let side = match entry.side {
            qte_schemas::PositionSide::Long => OrderSide::Buy,
            qte_schemas::PositionSide::Short => OrderSide::Sell,
        };
        let Some(order) = self
            .execution
            .build_order(ctx.symbol, side, sizing.shares, quote.mid(), spread_pct)
        else {
            return TradeDecision::veto("execution: order build failed");
        };

        TradeDecision::allow(order, entry, sizing)
    }
}
