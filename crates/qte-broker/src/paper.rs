//! Deterministic in-memory broker adapter for tests and dry runs.
//!
//! Design decisions (kept intentionally simple/deterministic):
//! - Orders are accepted immediately at the requested limit price (or the
//!   quote mid, for market orders) — no partial fills, no rejects.
//! - Order IDs are a monotonic counter, not random.
//! - Quotes and bars are whatever the caller seeded via `set_quote`/`set_bars`;
//!   this broker never fetches real market data.

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};

use qte_schemas::{Bar, OrderRequest, OrderSide, OrderType, Quote};

use crate::adapter::{BrokerAdapter, BrokerOrderRecord, BrokerPosition, OrderAck, Timeframe};

#[derive(Clone, Debug)]
struct PaperPosition {
    qty: u64,
    side: OrderSide,
    entry_price: f64,
}

pub struct PaperBroker {
    equity: f64,
    buying_power: f64,
    positions: BTreeMap<String, PaperPosition>,
    quotes: BTreeMap<String, Quote>,
    bars: BTreeMap<String, Vec<Bar>>,
    orders: Vec<BrokerOrderRecord>,
    next_order_id: u64,
}

impl PaperBroker {
    pub fn new(starting_equity: f64) -> Self {
        Self {
            equity: starting_equity,
            buying_power: starting_equity,
            positions: BTreeMap::new(),
            quotes: BTreeMap::new(),
            bars: BTreeMap::new(),
            orders: Vec::new(),
            next_order_id: 1,
        }
    }

    pub fn set_equity(&mut self, equity: f64) {
        self.equity = equity;
    }

    pub fn set_buying_power(&mut self, buying_power: f64) {
        self.buying_power = buying_power;
    }

    pub fn set_quote(&mut self, symbol: &str, quote: Quote) {
        self.quotes.insert(symbol.to_uppercase(), quote);
    }

    pub fn set_bars(&mut self, symbol: &str, bars: Vec<Bar>) {
        self.bars.insert(symbol.to_uppercase(), bars);
    }

    pub fn set_position(&mut self, symbol: &str, qty: u64, side: OrderSide, entry_price: f64) {
        self.positions.insert(
            symbol.to_uppercase(),
            PaperPosition {
                qty,
                side,
                entry_price,
            },
        );
    }
}

impl BrokerAdapter for PaperBroker {
    fn get_equity(&self) -> Result<f64> {
        Ok(self.equity)
    }

    fn get_buying_power(&self) -> Result<f64> {
        Ok(self.buying_power)
    }

    fn get_positions(&self) -> Result<Vec<BrokerPosition>> {
        Ok(self
            .positions
            .iter()
            .map(|(symbol, p)| {
                let price = self.quotes.get(symbol).map(|q| q.mid()).unwrap_or(p.entry_price);
                let market_value = p.qty as f64 * price;
                let cost_basis = p.qty as f64 * p.entry_price;
                BrokerPosition {
                    symbol: symbol.clone(),
                    qty: p.qty,
                    side: p.side,
                    market_value,
                    cost_basis,
                    unrealized_pl: market_value - cost_basis,
                }
            })
            .collect())
    }

    fn get_bars(
        &self,
        symbol: &str,
        _timeframe: Timeframe,
        _start: Option<DateTime<Utc>>,
        _end: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Bar>> {
        let all = self.bars.get(&symbol.to_uppercase()).cloned().unwrap_or_default();
        if limit == 0 || limit >= all.len() {
            Ok(all)
        } else {
            Ok(all[all.len() - limit..].to_vec())
        }
    }

    fn get_latest_quote(&self, symbol: &str) -> Result<Option<Quote>> {
        Ok(self.quotes.get(&symbol.to_uppercase()).copied())
    }

    fn submit_order(&mut self, order: &OrderRequest) -> Result<OrderAck> {
        let fill_price = match order.order_type {
            OrderType::Limit => order
                .limit_price
                .ok_or_else(|| anyhow!("limit order missing limit_price"))?,
            OrderType::Market => self
                .get_latest_quote(&order.symbol)?
                .ok_or_else(|| anyhow!("no quote available for market order on {}", order.symbol))?
                .mid(),
        };

        let id = format!("paper-{}", self.next_order_id);
        self.next_order_id += 1;

        let notional = fill_price * order.quantity as f64;
        match order.side {
            OrderSide::Buy => self.buying_power -= notional,
            OrderSide::Sell => self.buying_power += notional,
        }

        self.positions.insert(
            order.symbol.to_uppercase(),
            PaperPosition {
                qty: order.quantity,
                side: order.side,
                entry_price: fill_price,
            },
        );

        self.orders.push(BrokerOrderRecord {
            id: id.clone(),
            symbol: order.symbol.clone(),
            side: order.side,
            qty: order.quantity,
            filled_avg_price: Some(fill_price),
            submitted_at: Utc::now(),
            filled_at: Some(Utc::now()),
        });

        Ok(OrderAck { id })
    }

    fn get_orders_for_date(&self, date: NaiveDate) -> Result<Vec<BrokerOrderRecord>> {
        Ok(self
            .orders
            .iter()
            .filter(|o| o.submitted_at.date_naive() == date)
            .cloned()
            .collect())
    }
}
