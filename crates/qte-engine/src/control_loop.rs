use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use qte_broker::{retry::with_retry, BrokerAdapter, Timeframe};
use qte_schemas::{OrderRequest, OrderSide, OrderType};
use qte_strategy::BarSeries;
use qte_tracker::{bars_held, Tracker, TrackedPosition};

use crate::decision::EntryContext;
use crate::engine::{fits_buying_power, Engine};

const BAR_LOOKBACK: usize = 210;
const LIQUIDITY_WINDOW: usize = 30;
const RETRY_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Drives one [`Engine`] and [`Tracker`] pair against a [`BrokerAdapter`] on
/// a fixed poll interval: refresh equity, reconcile the ledger against
/// broker-reported positions, evaluate exits for every tracked position,
/// then evaluate entries for every untracked universe symbol. Each symbol
/// is isolated from the others — a failure evaluating one is logged and the
/// pass continues.
pub struct ControlLoop {
    engine: Engine,
    tracker: Tracker,
    symbols: Vec<String>,
    default_stop_pct: f64,
    check_interval: Duration,
}

impl ControlLoop {
    pub fn new(
        engine: Engine,
        tracker: Tracker,
        symbols: Vec<String>,
        default_stop_pct: f64,
        check_interval: Duration,
    ) -> Self {
        Self {
            engine,
            tracker,
            symbols,
            default_stop_pct,
            check_interval,
        }
    }

    /// Runs a single pass to completion. Returns an error only for failures
    /// that make the whole pass meaningless (equity or reconciliation
    /// failing); per-symbol failures are logged and swallowed.
    pub fn run_once(&mut self, broker: &mut dyn BrokerAdapter) -> Result<()> {
        let now = Utc::now();

        let equity = with_retry(RETRY_ATTEMPTS, RETRY_DELAY, || broker.get_equity())
            .context("fetching account equity")?;
        self.engine.update_equity(now, equity);

        let broker_positions = with_retry(RETRY_ATTEMPTS, RETRY_DELAY, || broker.get_positions())
            .context("fetching broker positions")?;
        let reconcile_rows: Vec<(String, u64, f64)> = broker_positions
            .iter()
            .map(|p| (p.symbol.clone(), p.qty, p.cost_basis))
            .collect();
        self.tracker
            .reconcile(&reconcile_rows, self.default_stop_pct, now)
            .context("reconciling position tracker")?;

        let tracked: Vec<(String, TrackedPosition)> = self
            .tracker
            .positions()
            .iter()
            .map(|(symbol, position)| (symbol.clone(), position.clone()))
            .collect();
        for (symbol, position) in tracked {
            if let Err(err) = self.evaluate_and_close(broker, &symbol, &position, now) {
                tracing::warn!(%symbol, %err, "exit evaluation failed, skipping symbol this pass");
            }
        }

        for symbol in self.symbols.clone() {
            if self.tracker.get(&symbol).is_some() {
                continue;
            }
            if let Err(err) = self.evaluate_and_open(broker, &symbol, equity, now) {
                tracing::warn!(%symbol, %err, "entry evaluation failed, skipping symbol this pass");
            }
        }

        Ok(())
    }

    fn evaluate_and_close(
        &mut self,
        broker: &mut dyn BrokerAdapter,
        symbol: &str,
        position: &TrackedPosition,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let bars = with_retry(RETRY_ATTEMPTS, RETRY_DELAY, || {
            broker.get_bars(symbol, Timeframe::OneDay, None, None, BAR_LOOKBACK)
        })
        .with_context(|| format!("fetching bars for {symbol}"))?;
        let Some(last) = bars.last() else {
            return Ok(());
        };
        let current_price = last.close;
        let spread_pct = broker.get_latest_quote(symbol)?.map(|q| q.spread_pct());
        let bars_held = bars_held(position.entry_time, now) as u32;

        let Some(exit) =
            self.engine
                .evaluate_exit(symbol, position.entry_price, current_price, bars_held, &bars, spread_pct)
        else {
            return Ok(());
        };

        tracing::info!(%symbol, reason = ?exit.reason, "closing position");
        let order = OrderRequest::new(
            symbol,
            OrderSide::Sell,
            position.qty,
            OrderType::Market,
            None,
            Some(current_price),
        )
        .context("building close order")?;
        let ack = broker.submit_order(&order).context("submitting close order")?;
        tracing::info!(%symbol, order_id = %ack.id, "close order submitted");

        let pnl_pct = (current_price - position.entry_price) / position.entry_price * 100.0;
        self.engine
            .record_fill(symbol, OrderSide::Sell, position.qty, current_price, current_price, now);
        self.engine.record_trade(symbol, pnl_pct);
        self.tracker.remove(symbol)?;
        Ok(())
    }

    fn evaluate_and_open(
        &mut self,
        broker: &mut dyn BrokerAdapter,
        symbol: &str,
        equity: f64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let bars = with_retry(RETRY_ATTEMPTS, RETRY_DELAY, || {
            broker.get_bars(symbol, Timeframe::OneDay, None, None, BAR_LOOKBACK)
        })
        .with_context(|| format!("fetching bars for {symbol}"))?;
        let quote = broker.get_latest_quote(symbol)?;

        let avg_dollar_volume_30d = if bars.len() >= LIQUIDITY_WINDOW {
            let window = &bars[bars.len() - LIQUIDITY_WINDOW..];
            Some(window.iter().map(|b| b.close * b.volume).sum::<f64>() / LIQUIDITY_WINDOW as f64)
        } else {
            None
        };
        let series = BarSeries::new(&bars);
        let volume_vs_atr = match (series.sma_volume(LIQUIDITY_WINDOW), series.last()) {
            (Some(avg_vol), Some(last)) if avg_vol > 0.0 => Some(last.volume / avg_vol),
            _ => None,
        };

        let current_positions = HashMap::new();
        let positions_with_stops: Vec<(f64, f64)> = self
            .tracker
            .positions()
            .values()
            .map(|p| (p.qty as f64 * p.entry_price, p.stop_pct))
            .collect();
        let sector_exposure_pct = HashMap::new();

        let decision = self.engine.evaluate_entry(EntryContext {
            symbol,
            now,
            equity,
            bars: &bars,
            quote,
            avg_dollar_volume_30d,
            volume_vs_atr,
            current_positions: &current_positions,
            positions_with_stops: &positions_with_stops,
            sector_exposure_pct: &sector_exposure_pct,
            symbol_sector: None,
        });

        let Some(order) = decision.order_request else {
            if let Some(reason) = decision.reason {
                tracing::debug!(%symbol, %reason, "entry vetoed");
            }
            return Ok(());
        };

        let buying_power = broker.get_buying_power().context("fetching buying power")?;
        let price = order.limit_price.or(order.expected_price).unwrap_or(0.0);
        if !fits_buying_power(order.quantity, price, buying_power) {
            tracing::warn!(%symbol, quantity = order.quantity, price, buying_power, "sized entry exceeds buying power, skipping");
            return Ok(());
        }

        let ack = broker.submit_order(&order).context("submitting entry order")?;
        tracing::info!(%symbol, order_id = %ack.id, quantity = order.quantity, "entry order submitted");

        let entry = decision.entry_signal.expect("allowed decision carries an entry signal");
        let fill_price = order.expected_price.unwrap_or(price);
        self.engine
            .record_fill(symbol, order.side, order.quantity, fill_price, fill_price, now);
        self.tracker.add(symbol, order.quantity, fill_price, entry.stop_pct, now)?;
        self.engine.record_day_trade(now);
        Ok(())
    }

    /// Cooperative polling loop: runs a pass, then waits for either the
    /// check interval to elapse or a shutdown signal. Cancellation only
    /// takes effect between passes.
    pub async fn run(&mut self, broker: &mut dyn BrokerAdapter) -> Result<()> {
        loop {
            if let Err(err) = self.run_once(broker) {
                tracing::error!(%err, "control loop pass failed");
            }
            tokio::select! {
                _ = tokio::time::sleep(self.check_interval) => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("shutdown signal received, exiting after current pass");
                    return Ok(());
                }
            }
        }
    }
}
