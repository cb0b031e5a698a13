//! Candlestick pattern detectors. Pure functions on OHLC; the patterns are
//! optional entry filters, never load or mutate data themselves.

use qte_schemas::Bar;

fn body_size(b: &Bar) -> f64 {
    (b.close - b.open).abs()
}

fn upper_wick(b: &Bar) -> f64 {
    b.high - b.open.max(b.close)
}

fn lower_wick(b: &Bar) -> f64 {
    b.open.min(b.close) - b.low
}

fn range_size(b: &Bar) -> f64 {
    let r = b.high - b.low;
    if r > 0.0 {
        r
    } else {
        1e-9
    }
}

fn is_bullish(b: &Bar) -> bool {
    b.close > b.open
}

fn is_bearish(b: &Bar) -> bool {
    b.close < b.open
}

/// `curr` is bullish and its body engulfs the preceding bearish `prev`.
pub fn bullish_engulfing(prev: &Bar, curr: &Bar) -> bool {
    is_bullish(curr) && is_bearish(prev) && curr.close >= prev.open && curr.open <= prev.close
}

/// Small body near the top of the range, long lower wick, short upper wick.
pub fn hammer(bar: &Bar) -> bool {
    let body = body_size(bar);
    if body <= 0.0 {
        return false;
    }
    let lower = lower_wick(bar);
    let upper = upper_wick(bar);
    is_bullish(bar) && lower >= 2.0 * body && upper <= 0.5 * body
}

/// Body is a small fraction of the bar's range (open ≈ close).
pub fn doji_near_support(bar: &Bar) -> bool {
    body_size(bar) / range_size(bar) <= 0.15
}

/// True if any named pattern matches the last bar in `bars`. An empty
/// `patterns` list is vacuously true. Unknown pattern names are ignored.
pub fn detect_any(bars: &[Bar], patterns: &[String]) -> bool {
    if patterns.is_empty() {
        return true;
    }
    let Some(curr) = bars.last() else {
        return true;
    };
    let prev = if bars.len() >= 2 {
        Some(&bars[bars.len() - 2])
    } else {
        None
    };
    patterns.iter().any(|name| match name.trim().to_ascii_lowercase().as_str() {
        "bullish_engulfing" => prev.is_some_and(|p| bullish_engulfing(p, curr)),
        "hammer" => hammer(curr),
        "doji" => doji_near_support(curr),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn bar(o: f64, h: f64, l: f64, c: f64) -> Bar {
        let ts: DateTime<chrono::Utc> = "2026-01-02T00:00:00Z".parse().unwrap();
        Bar::new(ts, o, h, l, c, 1000.0).unwrap()
    }

    #[test]
    fn bullish_engulfing_requires_body_containment() {
        let prev = bar(10.0, 10.2, 9.5, 9.6);
        let curr = bar(9.5, 10.5, 9.4, 10.3);
        assert!(bullish_engulfing(&prev, &curr));
    }

    #[test]
    fn bullish_engulfing_false_when_prev_not_bearish() {
        let prev = bar(9.6, 10.2, 9.5, 10.0);
        let curr = bar(9.5, 10.5, 9.4, 10.3);
        assert!(!bullish_engulfing(&prev, &curr));
    }

    #[test]
    fn hammer_requires_long_lower_and_small_upper_wick() {
        let b = bar(9.9, 10.0, 9.0, 10.0);
        assert!(hammer(&b));
        let not_hammer = bar(9.9, 10.5, 9.8, 10.0);
        assert!(!hammer(&not_hammer));
    }

    #[test]
    fn doji_near_support_small_body_ratio() {
        let b = bar(10.0, 10.5, 9.5, 10.02);
        assert!(doji_near_support(&b));
        let not_doji = bar(10.0, 10.5, 9.5, 10.4);
        assert!(!doji_near_support(&not_doji));
    }

    #[test]
    fn detect_any_empty_patterns_is_vacuous_true() {
        assert!(detect_any(&[], &[]));
    }

    #[test]
    fn detect_any_unknown_pattern_never_matches() {
        let bars = vec![bar(10.0, 10.2, 9.9, 10.1)];
        assert!(!detect_any(&bars, &["not_a_pattern".to_string()]));
    }
}
