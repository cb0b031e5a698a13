//! Session classification and holiday handling for a single equity venue.
//!
//! All timestamps are interpreted in the venue's local timezone (US equities:
//! `America/New_York`); callers always supply a timezone-aware instant.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

use qte_schemas::{SessionType, SessionWindow};

/// Venue trading calendar: holidays plus the three intraday session windows.
pub struct Calendar {
    timezone: Tz,
    holidays: BTreeSet<NaiveDate>,
    pre_market: SessionWindow,
    regular: SessionWindow,
    after_hours: SessionWindow,
}

impl Calendar {
    pub fn new(
        timezone: Tz,
        holidays: BTreeSet<NaiveDate>,
        pre_market: SessionWindow,
        regular: SessionWindow,
        after_hours: SessionWindow,
    ) -> Self {
        Self {
            timezone,
            holidays,
            pre_market,
            regular,
            after_hours,
        }
    }

    /// Convenience constructor for US equities: `America/New_York`, standard
    /// 4:00-9:30 pre-market, 9:30-16:00 regular, 16:00-20:00 after-hours.
    pub fn us_equities(holidays: BTreeSet<NaiveDate>) -> Self {
        use chrono::NaiveTime;
        let t = |h: u32, m: u32| NaiveTime::from_hms_opt(h, m, 0).unwrap();
        Self::new(
            chrono_tz::America::New_York,
            holidays,
            SessionWindow::new(t(4, 0), t(9, 30), true),
            SessionWindow::new(t(9, 30), t(16, 0), true),
            SessionWindow::new(t(16, 0), t(20, 0), true),
        )
    }

    fn local(&self, dt: DateTime<Utc>) -> DateTime<Tz> {
        dt.with_timezone(&self.timezone)
    }

    pub fn is_holiday(&self, dt: DateTime<Utc>) -> bool {
        self.holidays.contains(&self.local(dt).date_naive())
    }

    pub fn session_at(&self, dt: DateTime<Utc>) -> SessionType {
        if self.is_holiday(dt) {
            return SessionType::Closed;
        }
        let t = self.local(dt).time();
        if self.regular.contains(t) {
            SessionType::Regular
        } else if self.pre_market.contains(t) {
            SessionType::PreMarket
        } else if self.after_hours.contains(t) {
            SessionType::AfterHours
        } else {
            SessionType::Closed
        }
    }

    /// Whether trading is permitted at `dt`: not a holiday, and the active
    /// session window (if any) has `trade_allowed = true`.
    pub fn trading_allowed(&self, dt: DateTime<Utc>) -> bool {
        if self.is_holiday(dt) {
            return false;
        }
        let t = self.local(dt).time();
        if self.regular.contains(t) {
            self.regular.trade_allowed
        } else if self.pre_market.contains(t) {
            self.pre_market.trade_allowed
        } else if self.after_hours.contains(t) {
            self.after_hours.trade_allowed
        } else {
            false
        }
    }
}
