use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveTime, Utc};

/// A single OHLCV bar, keyed by a monotonic timestamp.
///
/// Invariant: `low <= min(open, close) <= max(open, close) <= high`,
/// `volume >= 0`. Constructed only via [`Bar::new`], which enforces this.
#[derive(Clone, Debug, PartialEq)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Why a candidate OHLCV row was rejected by [`Bar::new`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BarError {
    NegativeVolume,
    InvertedRange,
}

impl fmt::Display for BarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BarError::NegativeVolume => write!(f, "bar volume must be >= 0"),
            BarError::InvertedRange => {
                write!(f, "bar must satisfy low <= min(open,close) <= max(open,close) <= high")
            }
        }
    }
}

impl std::error::Error for BarError {}

impl Bar {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self, BarError> {
        if volume < 0.0 {
            return Err(BarError::NegativeVolume);
        }
        let body_lo = open.min(close);
        let body_hi = open.max(close);
        if !(low <= body_lo && body_hi <= high) {
            return Err(BarError::InvertedRange);
        }
        Ok(Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        })
    }

    /// True range against the previous bar's close; `None` has no predecessor.
    pub fn true_range(&self, prev_close: Option<f64>) -> f64 {
        let hl = self.high - self.low;
        match prev_close {
            None => hl,
            Some(pc) => hl.max((self.high - pc).abs()).max((self.low - pc).abs()),
        }
    }
}

/// Top-of-book quote. Valid only when `bid > 0 && ask > 0 && ask >= bid`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quote {
    pub bid: f64,
    pub ask: f64,
}

impl Quote {
    pub fn new(bid: f64, ask: f64) -> Option<Self> {
        if bid > 0.0 && ask > 0.0 && ask >= bid {
            Some(Self { bid, ask })
        } else {
            None
        }
    }

    pub fn mid(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }

    pub fn spread_pct(&self) -> f64 {
        let mid = self.mid();
        (self.ask - self.bid) / mid * 100.0
    }
}

/// Trading session classification within a venue's local calendar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionType {
    PreMarket,
    Regular,
    AfterHours,
    Closed,
}

/// A `[start, end)` time window. `start > end` denotes a wrap past midnight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub trade_allowed: bool,
}

impl SessionWindow {
    pub fn new(start: NaiveTime, end: NaiveTime, trade_allowed: bool) -> Self {
        Self {
            start,
            end,
            trade_allowed,
        }
    }

    /// Whether `t` falls inside `[start, end)`, accounting for midnight wrap.
    pub fn contains(&self, t: NaiveTime) -> bool {
        if self.start <= self.end {
            self.start <= t && t < self.end
        } else {
            t >= self.start || t < self.end
        }
    }
}

/// Long/short side of a strategy position (as opposed to order buy/sell).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PositionSide {
    Long,
    Short,
}

impl FromStr for PositionSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "long" => Ok(PositionSide::Long),
            "short" => Ok(PositionSide::Short),
            other => Err(format!("unknown side: {other}")),
        }
    }
}

/// Buy/sell side of an order or fill.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl FromStr for OrderSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(OrderSide::Buy),
            "sell" => Ok(OrderSide::Sell),
            other => Err(format!("unknown side: {other}")),
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Strategy "player focus" — swaps MA periods and time-exit horizon.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PlayerFocus {
    #[default]
    Neutral,
    Institutional,
    Retail,
}

impl FromStr for PlayerFocus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "neutral" => Ok(PlayerFocus::Neutral),
            "institutional" => Ok(PlayerFocus::Institutional),
            "retail" => Ok(PlayerFocus::Retail),
            other => Err(format!("unknown player_focus: {other}")),
        }
    }
}

/// Entry signal emitted by the strategy. Immutable once constructed.
#[derive(Clone, Debug, PartialEq)]
pub struct EntrySignal {
    pub symbol: String,
    pub side: PositionSide,
    pub strength: f64,
    pub stop_pct: f64,
    pub take_profit_pct: Option<f64>,
    pub time_bars_exit: u32,
    pub metadata: BTreeMap<String, String>,
}

/// Reason an open position should be closed, in fixed priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    TimeBars,
    KillSwitch,
    SignalExit,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExitSignal {
    pub symbol: String,
    pub reason: ExitReason,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderType {
    Limit,
    Market,
}

/// A request to submit an order. `order_type == Limit` requires
/// `limit_price` to be `Some` and `> 0`; enforced by [`OrderRequest::new`].
#[derive(Clone, Debug, PartialEq)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: u64,
    pub order_type: OrderType,
    pub limit_price: Option<f64>,
    pub expected_price: Option<f64>,
}

impl OrderRequest {
    pub fn new(
        symbol: impl Into<String>,
        side: OrderSide,
        quantity: u64,
        order_type: OrderType,
        limit_price: Option<f64>,
        expected_price: Option<f64>,
    ) -> Option<Self> {
        if quantity == 0 {
            return None;
        }
        if order_type == OrderType::Limit && !matches!(limit_price, Some(p) if p > 0.0) {
            return None;
        }
        Some(Self {
            symbol: symbol.into(),
            side,
            quantity,
            order_type,
            limit_price,
            expected_price,
        })
    }
}

/// Record of an executed fill. `slippage_bps` sign is normalized by side:
/// positive bps always means the fill was worse than expected.
#[derive(Clone, Debug, PartialEq)]
pub struct FillReport {
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: u64,
    pub fill_price: f64,
    pub expected_price: f64,
    pub slippage_bps: f64,
    pub timestamp: DateTime<Utc>,
}

impl FillReport {
    /// `buy -> (fill-expected)/expected * 1e4`, `sell -> (expected-fill)/expected * 1e4`.
    pub fn slippage_bps(side: OrderSide, fill_price: f64, expected_price: f64) -> f64 {
        if expected_price <= 0.0 {
            return 0.0;
        }
        match side {
            OrderSide::Buy => (fill_price - expected_price) / expected_price * 10_000.0,
            OrderSide::Sell => (expected_price - fill_price) / expected_price * 10_000.0,
        }
    }
}

/// Outcome of position sizing. `shares == 0` iff `reject_reason.is_some()`.
#[derive(Clone, Debug, PartialEq)]
pub struct PositionSizingResult {
    pub shares: u64,
    pub notional: f64,
    pub risk_amount: f64,
    pub risk_pct: f64,
    pub reject_reason: Option<String>,
}

impl PositionSizingResult {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            shares: 0,
            notional: 0.0,
            risk_amount: 0.0,
            risk_pct: 0.0,
            reject_reason: Some(reason.into()),
        }
    }

    pub fn accepted(shares: u64, notional: f64, risk_amount: f64, risk_pct: f64) -> Self {
        debug_assert!(shares > 0, "accepted sizing must have shares > 0");
        Self {
            shares,
            notional,
            risk_amount,
            risk_pct,
            reject_reason: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts() -> DateTime<Utc> {
        "2026-01-02T00:00:00Z".parse().unwrap()
    }

    #[test]
    fn bar_rejects_inverted_range() {
        assert!(Bar::new(ts(), 10.0, 9.0, 8.0, 9.5, 100.0).is_err());
    }

    #[test]
    fn bar_accepts_valid_ohlc() {
        let b = Bar::new(ts(), 10.0, 11.0, 9.5, 10.5, 100.0).unwrap();
        assert_eq!(b.close, 10.5);
    }

    #[test]
    fn bar_rejects_negative_volume() {
        assert_eq!(
            Bar::new(ts(), 10.0, 11.0, 9.5, 10.5, -1.0).unwrap_err(),
            BarError::NegativeVolume
        );
    }

    #[test]
    fn quote_rejects_crossed_book() {
        assert!(Quote::new(10.0, 9.0).is_none());
    }

    #[test]
    fn quote_spread_pct() {
        let q = Quote::new(99.0, 101.0).unwrap();
        assert!((q.mid() - 100.0).abs() < 1e-9);
        assert!((q.spread_pct() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn session_window_wraps_midnight() {
        let w = SessionWindow::new(
            NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(4, 0, 0).unwrap(),
            true,
        );
        assert!(w.contains(NaiveTime::from_hms_opt(23, 0, 0).unwrap()));
        assert!(w.contains(NaiveTime::from_hms_opt(2, 0, 0).unwrap()));
        assert!(!w.contains(NaiveTime::from_hms_opt(5, 0, 0).unwrap()));
    }

    #[test]
    fn order_request_requires_positive_limit_price() {
        assert!(OrderRequest::new("SPY", OrderSide::Buy, 10, OrderType::Limit, None, None).is_none());
        assert!(
            OrderRequest::new("SPY", OrderSide::Buy, 10, OrderType::Limit, Some(0.0), None)
                .is_none()
        );
        assert!(OrderRequest::new(
            "SPY",
            OrderSide::Buy,
            10,
            OrderType::Limit,
            Some(100.0),
            Some(100.0)
        )
        .is_some());
    }

    #[test]
    fn slippage_sign_buy_positive_when_fill_above_expected() {
        let bps = FillReport::slippage_bps(OrderSide::Buy, 101.0, 100.0);
        assert!(bps > 0.0);
    }

    #[test]
    fn slippage_sign_sell_positive_when_fill_below_expected() {
        let bps = FillReport::slippage_bps(OrderSide::Sell, 99.0, 100.0);
        assert!(bps > 0.0);
    }

    #[test]
    fn sizing_result_shares_zero_iff_rejected() {
        let r = PositionSizingResult::rejected("bad stop");
        assert_eq!(r.shares, 0);
        assert!(r.reject_reason.is_some());
        let a = PositionSizingResult::accepted(10, 1000.0, 5.0, 0.5);
        assert!(a.reject_reason.is_none());
    }
}
