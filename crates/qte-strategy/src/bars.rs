//! Minimal column-addressable bar series with rolling-window reductions.
//!
//! The strategy never needs label-based indexing or arbitrary slicing — just
//! an ordered sequence of bars, tail access, and a couple of rolling
//! aggregates (SMA, ATR). This is a thin wrapper, not a dataframe.

use qte_schemas::Bar;

pub struct BarSeries<'a> {
    bars: &'a [Bar],
}

impl<'a> BarSeries<'a> {
    pub fn new(bars: &'a [Bar]) -> Self {
        Self { bars }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Simple moving average of `close` over the last `period` bars.
    /// `None` if fewer than `period` bars are available.
    pub fn sma_close(&self, period: usize) -> Option<f64> {
        if period == 0 || self.bars.len() < period {
            return None;
        }
        let window = &self.bars[self.bars.len() - period..];
        Some(window.iter().map(|b| b.close).sum::<f64>() / period as f64)
    }

    /// Simple moving average of `volume` over the last `period` bars.
    pub fn sma_volume(&self, period: usize) -> Option<f64> {
        if period == 0 || self.bars.len() < period {
            return None;
        }
        let window = &self.bars[self.bars.len() - period..];
        Some(window.iter().map(|b| b.volume).sum::<f64>() / period as f64)
    }

    /// Average true range over `period`, using the prior bar's close for
    /// each true-range term. `None` if there aren't `period + 1` bars (the
    /// extra bar supplies the first `prev_close`).
    pub fn atr(&self, period: usize) -> Option<f64> {
        if period == 0 || self.bars.len() < period + 1 {
            return None;
        }
        let start = self.bars.len() - period;
        let mut sum = 0.0;
        for i in start..self.bars.len() {
            let prev_close = Some(self.bars[i - 1].close);
            sum += self.bars[i].true_range(prev_close);
        }
        Some(sum / period as f64)
    }

    /// `atr(period) / close_last * 100`, `None` if either is unavailable.
    pub fn atr_pct(&self, period: usize) -> Option<f64> {
        let atr = self.atr(period)?;
        let close = self.last()?.close;
        if close == 0.0 {
            return None;
        }
        Some(atr / close * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn bars(closes: &[f64]) -> Vec<Bar> {
        let base: DateTime<Utc> = "2026-01-02T00:00:00Z".parse().unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                Bar::new(
                    base + chrono::Duration::days(i as i64),
                    c,
                    c + 0.5,
                    c - 0.5,
                    c,
                    1000.0,
                )
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn sma_close_needs_full_window() {
        let b = bars(&[1.0, 2.0, 3.0]);
        let s = BarSeries::new(&b);
        assert_eq!(s.sma_close(3), Some(2.0));
        assert_eq!(s.sma_close(4), None);
    }

    #[test]
    fn atr_needs_one_extra_bar_for_prev_close() {
        let b = bars(&[1.0, 2.0, 3.0]);
        let s = BarSeries::new(&b);
        assert!(s.atr(2).is_some());
        assert!(s.atr(3).is_none());
    }
}
