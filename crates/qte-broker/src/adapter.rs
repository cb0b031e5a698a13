use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};

use qte_schemas::{Bar, OrderRequest, OrderSide, Quote};

/// Bar timeframe; a closed tag set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Timeframe {
    OneDay,
    OneMinute,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BrokerPosition {
    pub symbol: String,
    pub qty: u64,
    pub side: OrderSide,
    pub market_value: f64,
    pub cost_basis: f64,
    pub unrealized_pl: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderAck {
    pub id: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BrokerOrderRecord {
    pub id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub qty: u64,
    pub filled_avg_price: Option<f64>,
    pub submitted_at: DateTime<Utc>,
    pub filled_at: Option<DateTime<Utc>>,
}

/// The seam between the decision engine and a real venue. Credentials (API
/// key + secret) are the implementor's concern, injected via environment or
/// configuration — this trait never sees them. No live network
/// implementation ships here; [`crate::paper::PaperBroker`] is the only
/// concrete adapter in this workspace.
pub trait BrokerAdapter {
    fn get_equity(&self) -> Result<f64>;
    fn get_buying_power(&self) -> Result<f64>;
    fn get_positions(&self) -> Result<Vec<BrokerPosition>>;
    fn get_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Bar>>;
    fn get_latest_quote(&self, symbol: &str) -> Result<Option<Quote>>;
    /// Time-in-force is always "day"; the implementor must honor the
    /// request's `order_type` (limit vs market) as given.
    fn submit_order(&mut self, order: &OrderRequest) -> Result<OrderAck>;
    fn get_orders_for_date(&self, date: NaiveDate) -> Result<Vec<BrokerOrderRecord>>;
}
