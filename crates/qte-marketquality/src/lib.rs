//! Market-quality gate and the volatility do-not-trade filter.
//!
//! Both are pure: they take already-computed metrics and return a reason
//! code, never fetch data or mutate state. Metrics the caller doesn't have
//! are treated as passing, never as failing — a gate can only veto on a
//! metric it was actually given.

/// Reason a trade was vetoed by [`MarketQualityGate::check`].
#[derive(Clone, Debug, PartialEq)]
pub enum MarketQualityVeto {
    SpreadTooWide { spread_pct: f64, max: f64 },
    VolumeTooThin { ratio: f64, min: f64 },
    NewsVolatilitySpike { atr_multiple: f64, threshold: f64 },
}

impl std::fmt::Display for MarketQualityVeto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarketQualityVeto::SpreadTooWide { spread_pct, max } => {
                write!(f, "spread {spread_pct:.3}% > max {max:.3}%")
            }
            MarketQualityVeto::VolumeTooThin { ratio, min } => {
                write!(f, "volume/ATR ratio {ratio:.3} < min {min:.3}")
            }
            MarketQualityVeto::NewsVolatilitySpike {
                atr_multiple,
                threshold,
            } => write!(f, "ATR multiple {atr_multiple:.2} >= news spike threshold {threshold:.2}"),
        }
    }
}

pub struct MarketQualityGate {
    pub max_spread_pct: f64,
    pub min_volume_atr_ratio: f64,
    pub news_spike_blocking_enabled: bool,
    pub news_volatility_spike_atr_multiple: f64,
}

impl MarketQualityGate {
    /// First violation wins, in the order: spread, volume, news spike.
    pub fn check(
        &self,
        spread_pct: Option<f64>,
        volume_atr_ratio: Option<f64>,
        atr_multiple_now: Option<f64>,
    ) -> Result<(), MarketQualityVeto> {
        if let Some(sp) = spread_pct {
            if sp > self.max_spread_pct {
                return Err(MarketQualityVeto::SpreadTooWide {
                    spread_pct: sp,
                    max: self.max_spread_pct,
                });
            }
        }
        if let Some(ratio) = volume_atr_ratio {
            if ratio < self.min_volume_atr_ratio {
                return Err(MarketQualityVeto::VolumeTooThin {
                    ratio,
                    min: self.min_volume_atr_ratio,
                });
            }
        }
        if self.news_spike_blocking_enabled {
            if let Some(atr_multiple) = atr_multiple_now {
                if atr_multiple >= self.news_volatility_spike_atr_multiple {
                    return Err(MarketQualityVeto::NewsVolatilitySpike {
                        atr_multiple,
                        threshold: self.news_volatility_spike_atr_multiple,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Do-not-trade filter on raw ATR% / spread%, independent of the relative
/// market-quality gate above.
pub struct VolatilityDoNotTrade {
    pub enabled: bool,
    pub max_atr_pct: f64,
    pub max_spread_pct: f64,
}

impl VolatilityDoNotTrade {
    pub fn check(&self, atr_pct: Option<f64>, spread_pct: Option<f64>) -> Result<(), String> {
        if !self.enabled {
            return Ok(());
        }
        if let Some(a) = atr_pct {
            if a > self.max_atr_pct {
                return Err(format!("volatility DNT: ATR% {a:.2} > {:.2}", self.max_atr_pct));
            }
        }
        if let Some(s) = spread_pct {
            if s > self.max_spread_pct {
                return Err(format!(
                    "volatility DNT: spread {s:.2}% > {:.2}%",
                    self.max_spread_pct
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> MarketQualityGate {
        MarketQualityGate {
            max_spread_pct: 0.5,
            min_volume_atr_ratio: 0.3,
            news_spike_blocking_enabled: true,
            news_volatility_spike_atr_multiple: 3.0,
        }
    }

    #[test]
    fn unknown_metrics_pass() {
        assert!(gate().check(None, None, None).is_ok());
    }

    #[test]
    fn wide_spread_is_vetoed_first() {
        let err = gate().check(Some(1.0), Some(0.0), Some(5.0)).unwrap_err();
        assert!(matches!(err, MarketQualityVeto::SpreadTooWide { .. }));
    }

    #[test]
    fn thin_volume_is_vetoed() {
        let err = gate().check(Some(0.1), Some(0.1), None).unwrap_err();
        assert!(matches!(err, MarketQualityVeto::VolumeTooThin { .. }));
    }

    #[test]
    fn news_spike_only_checked_when_enabled() {
        let mut g = gate();
        assert!(g.check(Some(0.1), Some(1.0), Some(5.0)).is_err());
        g.news_spike_blocking_enabled = false;
        assert!(g.check(Some(0.1), Some(1.0), Some(5.0)).is_ok());
    }

    #[test]
    fn volatility_dnt_disabled_always_passes() {
        let dnt = VolatilityDoNotTrade {
            enabled: false,
            max_atr_pct: 1.0,
            max_spread_pct: 1.0,
        };
        assert!(dnt.check(Some(99.0), Some(99.0)).is_ok());
    }

    #[test]
    fn volatility_dnt_blocks_over_threshold() {
        let dnt = VolatilityDoNotTrade {
            enabled: true,
            max_atr_pct: 2.5,
            max_spread_pct: 0.15,
        };
        assert!(dnt.check(Some(3.0), None).is_err());
        assert!(dnt.check(None, Some(0.2)).is_err());
        assert!(dnt.check(Some(1.0), Some(0.05)).is_ok());
    }
}
