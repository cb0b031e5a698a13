//! Macro and earnings blackout gates.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

/// A per-date half-open blackout interval. `start > end` wraps past midnight,
/// in which case it also blocks the early hours of the following date.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlackoutWindow {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl BlackoutWindow {
    fn contains(&self, date: NaiveDate, time: NaiveTime) -> bool {
        if self.start <= self.end {
            date == self.date && self.start <= time && time < self.end
        } else {
            (date == self.date && time >= self.start)
                || (date == self.date + Duration::days(1) && time < self.end)
        }
    }
}

pub struct MacroBlackout {
    enabled: bool,
    blackout_dates: BTreeSet<NaiveDate>,
    blackout_windows: Vec<BlackoutWindow>,
}

impl MacroBlackout {
    pub fn new(enabled: bool, blackout_dates: BTreeSet<NaiveDate>, blackout_windows: Vec<BlackoutWindow>) -> Self {
        Self {
            enabled,
            blackout_dates,
            blackout_windows,
        }
    }

    /// True if `dt` must be rejected for macro risk (whole-day blackout or a
    /// named window). Always `false` when disabled.
    pub fn is_blackout(&self, dt: DateTime<Utc>) -> bool {
        if !self.enabled {
            return false;
        }
        let date = dt.date_naive();
        let time = dt.time();
        if self.blackout_dates.contains(&date) {
            return true;
        }
        self.blackout_windows.iter().any(|w| w.contains(date, time))
    }

    /// The specific blackout window covering `dt`, if any. `None` when the
    /// hit is a whole-day blackout date rather than a timed window.
    pub fn window_at(&self, dt: DateTime<Utc>) -> Option<&BlackoutWindow> {
        if !self.enabled {
            return None;
        }
        let date = dt.date_naive();
        let time = dt.time();
        self.blackout_windows.iter().find(|w| w.contains(date, time))
    }
}

pub struct EarningsBlackout {
    enabled: bool,
    days_before: i64,
    days_after: i64,
    earnings_dates: HashMap<String, Vec<NaiveDate>>,
}

impl EarningsBlackout {
    pub fn new(
        enabled: bool,
        days_before: i64,
        days_after: i64,
        earnings_dates: HashMap<String, Vec<NaiveDate>>,
    ) -> Self {
        Self {
            enabled,
            days_before,
            days_after,
            earnings_dates,
        }
    }

    /// True if `dt` falls within `[e - days_before, e + days_after]` for any
    /// earnings date `e` on record for `symbol` (inclusive, calendar days).
    /// Always `false` when disabled.
    pub fn is_blackout(&self, symbol: &str, dt: DateTime<Utc>) -> bool {
        if !self.enabled {
            return false;
        }
        let date = dt.date_naive();
        let Some(dates) = self.earnings_dates.get(&symbol.to_uppercase()) else {
            return false;
        };
        dates.iter().any(|e| {
            let lo = *e - Duration::days(self.days_before);
            let hi = *e + Duration::days(self.days_after);
            lo <= date && date <= hi
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn whole_day_blackout() {
        let mut dates = BTreeSet::new();
        dates.insert(NaiveDate::from_ymd_opt(2026, 3, 18).unwrap());
        let mb = MacroBlackout::new(true, dates, vec![]);
        assert!(mb.is_blackout(dt(2026, 3, 18, 10, 0)));
        assert!(!mb.is_blackout(dt(2026, 3, 19, 10, 0)));
    }

    #[test]
    fn window_blocks_within_range_only() {
        let window = BlackoutWindow {
            date: NaiveDate::from_ymd_opt(2026, 3, 18).unwrap(),
            start: NaiveTime::from_hms_opt(13, 30, 0).unwrap(),
            end: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
        };
        let mb = MacroBlackout::new(true, BTreeSet::new(), vec![window]);
        assert!(mb.is_blackout(dt(2026, 3, 18, 13, 45)));
        assert!(!mb.is_blackout(dt(2026, 3, 18, 14, 0)));
    }

    #[test]
    fn window_wraps_midnight_into_next_date() {
        let window = BlackoutWindow {
            date: NaiveDate::from_ymd_opt(2026, 3, 18).unwrap(),
            start: NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(1, 0, 0).unwrap(),
        };
        let mb = MacroBlackout::new(true, BTreeSet::new(), vec![window]);
        assert!(mb.is_blackout(dt(2026, 3, 18, 23, 30)));
        assert!(mb.is_blackout(dt(2026, 3, 19, 0, 30)));
        assert!(!mb.is_blackout(dt(2026, 3, 19, 2, 0)));
    }

    #[test]
    fn disabled_macro_blackout_never_fires() {
        let mut dates = BTreeSet::new();
        dates.insert(NaiveDate::from_ymd_opt(2026, 3, 18).unwrap());
        let mb = MacroBlackout::new(false, dates, vec![]);
        assert!(!mb.is_blackout(dt(2026, 3, 18, 10, 0)));
        assert!(mb.window_at(dt(2026, 3, 18, 10, 0)).is_none());
    }

    #[test]
    fn window_at_distinguishes_date_hit_from_window_hit() {
        let window = BlackoutWindow {
            date: NaiveDate::from_ymd_opt(2026, 3, 18).unwrap(),
            start: NaiveTime::from_hms_opt(13, 30, 0).unwrap(),
            end: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
        };
        let mut dates = BTreeSet::new();
        dates.insert(NaiveDate::from_ymd_opt(2026, 3, 19).unwrap());
        let mb = MacroBlackout::new(true, dates, vec![window]);
        assert!(mb.window_at(dt(2026, 3, 18, 13, 45)).is_some());
        assert!(mb.is_blackout(dt(2026, 3, 19, 10, 0)));
        assert!(mb.window_at(dt(2026, 3, 19, 10, 0)).is_none());
    }

    #[test]
    fn earnings_blackout_is_inclusive_and_per_symbol() {
        let mut dates = HashMap::new();
        dates.insert(
            "AAPL".to_string(),
            vec![NaiveDate::from_ymd_opt(2026, 4, 30).unwrap()],
        );
        let eb = EarningsBlackout::new(true, 1, 1, dates);
        assert!(eb.is_blackout("aapl", dt(2026, 4, 29, 10, 0)));
        assert!(eb.is_blackout("AAPL", dt(2026, 5, 1, 10, 0)));
        assert!(!eb.is_blackout("AAPL", dt(2026, 5, 2, 10, 0)));
        assert!(!eb.is_blackout("MSFT", dt(2026, 4, 30, 10, 0)));
    }

    #[test]
    fn disabled_earnings_blackout_never_fires() {
        let mut dates = HashMap::new();
        dates.insert(
            "AAPL".to_string(),
            vec![NaiveDate::from_ymd_opt(2026, 4, 30).unwrap()],
        );
        let eb = EarningsBlackout::new(false, 1, 1, dates);
        assert!(!eb.is_blackout("AAPL", dt(2026, 4, 30, 10, 0)));
    }
}
