//! Execution hygiene: the spread gate, limit/market order construction,
//! fill recording, and the strategy slippage circuit breaker.

use chrono::{DateTime, Utc};

use qte_schemas::{FillReport, OrderRequest, OrderSide, OrderType};

pub struct ExecutionConfig {
    pub prefer_limit_orders: bool,
    pub limit_order_offset_ticks: u32,
    pub tick_size: f64,
    pub max_spread_pct_to_trade: f64,
    pub partial_fill_timeout_seconds: u32,
    pub cancel_replace_on_partial: bool,
    pub block_strategy_if_slippage_bps_avg_exceeds: f64,
}

/// Fill history and the derived slippage circuit breaker. `strategy_blocked`
/// is a latch: once the average slippage crosses the configured threshold it
/// stays tripped, even if a later fill brings the average back down.
pub struct ExecutionState {
    fill_history: Vec<FillReport>,
    strategy_slippage_bps_avg: f64,
    strategy_blocked: bool,
}

impl ExecutionState {
    pub fn new() -> Self {
        Self {
            fill_history: Vec::new(),
            strategy_slippage_bps_avg: 0.0,
            strategy_blocked: false,
        }
    }

    pub fn strategy_blocked(&self) -> bool {
        self.strategy_blocked
    }

    pub fn strategy_slippage_bps_avg(&self) -> f64 {
        self.strategy_slippage_bps_avg
    }

    pub fn fill_history(&self) -> &[FillReport] {
        &self.fill_history
    }
}

impl Default for ExecutionState {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ExecutionManager {
    pub config: ExecutionConfig,
}

impl ExecutionManager {
    pub fn new(config: ExecutionConfig) -> Self {
        Self { config }
    }

    pub fn can_trade_spread(&self, spread_pct: f64) -> Result<(), String> {
        if spread_pct > self.config.max_spread_pct_to_trade {
            return Err(format!(
                "spread {spread_pct:.4}% > max {:.4}%",
                self.config.max_spread_pct_to_trade
            ));
        }
        Ok(())
    }

    /// `None` when the spread gate fails. Limit orders are offset from mid
    /// by `limit_order_offset_ticks * tick_size`, rounded to a cent, away
    /// from the market (lower for buys, higher for sells).
    pub fn build_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: u64,
        mid_price: f64,
        spread_pct: f64,
    ) -> Option<OrderRequest> {
        self.can_trade_spread(spread_pct).ok()?;

        if self.config.prefer_limit_orders {
            let offset = self.config.limit_order_offset_ticks as f64 * self.config.tick_size;
            let raw = match side {
                OrderSide::Buy => mid_price - offset,
                OrderSide::Sell => mid_price + offset,
            };
            let limit_price = (raw * 100.0).round() / 100.0;
            OrderRequest::new(symbol, side, quantity, OrderType::Limit, Some(limit_price), Some(mid_price))
        } else {
            OrderRequest::new(symbol, side, quantity, OrderType::Market, None, Some(mid_price))
        }
    }

    pub fn record_fill(
        &self,
        state: &mut ExecutionState,
        symbol: &str,
        side: OrderSide,
        quantity: u64,
        fill_price: f64,
        expected_price: f64,
        timestamp: DateTime<Utc>,
    ) {
        let slippage_bps = FillReport::slippage_bps(side, fill_price, expected_price);
        state.fill_history.push(FillReport {
            symbol: symbol.to_string(),
            side,
            quantity,
            fill_price,
            expected_price,
            slippage_bps,
            timestamp,
        });

        let n = state.fill_history.len() as f64;
        state.strategy_slippage_bps_avg =
            state.fill_history.iter().map(|f| f.slippage_bps).sum::<f64>() / n;
        if state.strategy_slippage_bps_avg > self.config.block_strategy_if_slippage_bps_avg_exceeds {
            state.strategy_blocked = true;
        }
    }

    pub fn partial_fill_should_cancel_replace(&self, filled_qty: u64, requested_qty: u64) -> bool {
        self.config.cancel_replace_on_partial && filled_qty > 0 && filled_qty < requested_qty
    }
}
