//! Symbol whitelist plus optional liquidity minima.

use std::collections::BTreeSet;

pub struct Universe {
    whitelist: BTreeSet<String>,
    min_avg_dollar_volume_30d: Option<f64>,
    min_volume_vs_atr: Option<f64>,
}

impl Universe {
    pub fn new(
        whitelist: impl IntoIterator<Item = String>,
        min_avg_dollar_volume_30d: Option<f64>,
        min_volume_vs_atr: Option<f64>,
    ) -> Self {
        Self {
            whitelist: whitelist.into_iter().map(|s| s.to_uppercase()).collect(),
            min_avg_dollar_volume_30d,
            min_volume_vs_atr,
        }
    }

    /// True iff `symbol` is whitelisted and every supplied liquidity metric
    /// meets its configured minimum. An omitted metric is treated as
    /// satisfied, not as failing.
    pub fn eligible(
        &self,
        symbol: &str,
        avg_dollar_volume_30d: Option<f64>,
        volume_vs_atr: Option<f64>,
    ) -> bool {
        if !self.whitelist.contains(&symbol.to_uppercase()) {
            return false;
        }
        if let (Some(min), Some(actual)) = (self.min_avg_dollar_volume_30d, avg_dollar_volume_30d)
        {
            if actual < min {
                return false;
            }
        }
        if let (Some(min), Some(actual)) = (self.min_volume_vs_atr, volume_vs_atr) {
            if actual < min {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn universe() -> Universe {
        Universe::new(
            ["spy".to_string(), "QQQ".to_string()],
            Some(1_000_000.0),
            Some(0.5),
        )
    }

    #[test]
    fn whitelist_is_case_insensitive() {
        assert!(universe().eligible("spy", None, None));
        assert!(universe().eligible("SPY", None, None));
    }

    #[test]
    fn not_whitelisted_is_ineligible() {
        assert!(!universe().eligible("TSLA", None, None));
    }

    #[test]
    fn missing_metrics_do_not_fail() {
        assert!(universe().eligible("QQQ", None, None));
    }

    #[test]
    fn below_minimum_liquidity_is_ineligible() {
        assert!(!universe().eligible("QQQ", Some(500_000.0), None));
        assert!(!universe().eligible("QQQ", None, Some(0.1)));
    }

    #[test]
    fn at_or_above_minimums_is_eligible() {
        assert!(universe().eligible("QQQ", Some(1_000_000.0), Some(0.5)));
    }
}
