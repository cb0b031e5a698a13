//! Risk-based position sizer: risk-per-trade sizing, symbol/sector exposure
//! caps, high-volatility size reduction, and the aggregate open-risk check.

use std::collections::HashMap;

use qte_schemas::PositionSizingResult;

pub struct HighVolReduction {
    pub enabled: bool,
    pub atr_pct_threshold: f64,
    pub size_multiplier: f64,
}

pub struct PositionSizer {
    pub risk_per_trade_pct: f64,
    pub max_open_risk_pct: f64,
    pub max_exposure_per_symbol_pct: f64,
    pub max_exposure_per_sector_pct: f64,
    pub high_vol_reduction: HighVolReduction,
}

impl PositionSizer {
    /// `current_positions` is accepted for interface parity with the caller's
    /// view of open exposure; this step doesn't consult it directly — the
    /// aggregate check happens in [`would_exceed_max_open_risk`].
    #[allow(clippy::too_many_arguments)]
    pub fn size_position(
        &self,
        account_equity: f64,
        price: f64,
        stop_distance_pct: f64,
        symbol: &str,
        _current_positions: &HashMap<String, f64>,
        sector_exposure_pct: &HashMap<String, f64>,
        symbol_sector: Option<&HashMap<String, String>>,
        atr_pct: Option<f64>,
    ) -> PositionSizingResult {
        if stop_distance_pct <= 0.0 {
            return PositionSizingResult::rejected("invalid stop_distance_pct");
        }

        let risk_per_share = price * (stop_distance_pct / 100.0);
        if risk_per_share <= 0.0 {
            return PositionSizingResult::rejected("risk_per_share <= 0");
        }

        let risk_amount = account_equity * (self.risk_per_trade_pct / 100.0);
        let shares_by_risk = (risk_amount / risk_per_share).floor() as i64;
        if shares_by_risk <= 0 {
            return PositionSizingResult::rejected("shares <= 0 (risk too small vs stop)");
        }

        let max_notional = account_equity * (self.max_exposure_per_symbol_pct / 100.0);
        let notional_by_risk = shares_by_risk as f64 * price;

        let (mut shares, mut notional, mut risk_amount, mut risk_pct);
        if notional_by_risk > max_notional {
            let capped_shares = (max_notional / price).floor() as i64;
            if capped_shares <= 0 {
                return PositionSizingResult::rejected("exposure cap yields zero shares");
            }
            shares = capped_shares;
            notional = shares as f64 * price;
            risk_amount = shares as f64 * risk_per_share;
            risk_pct = (risk_amount / account_equity) * 100.0;
        } else {
            shares = shares_by_risk;
            notional = notional_by_risk;
            risk_amount = account_equity * (self.risk_per_trade_pct / 100.0);
            risk_pct = self.risk_per_trade_pct;
        }

        if self.high_vol_reduction.enabled {
            if let Some(atr) = atr_pct {
                if atr > self.high_vol_reduction.atr_pct_threshold {
                    shares = ((shares as f64 * self.high_vol_reduction.size_multiplier).floor() as i64).max(1);
                    notional = shares as f64 * price;
                    risk_amount = shares as f64 * risk_per_share;
                    risk_pct = (risk_amount / account_equity) * 100.0;
                }
            }
        }

        let exposure_pct = (notional / account_equity) * 100.0;
        let sector = symbol_sector
            .and_then(|m| m.get(symbol))
            .cloned()
            .unwrap_or_else(|| "unknown".to_string());
        let current_sector_pct = sector_exposure_pct.get(&sector).copied().unwrap_or(0.0);
        if current_sector_pct + exposure_pct > self.max_exposure_per_sector_pct {
            return PositionSizingResult::rejected(format!(
                "sector {sector} would exceed {:.2}%",
                self.max_exposure_per_sector_pct
            ));
        }

        PositionSizingResult::accepted(shares as u64, notional, risk_amount, risk_pct)
    }

    pub fn total_open_risk_pct(
        &self,
        account_equity: f64,
        positions_with_stops: &[(f64, f64)],
    ) -> f64 {
        if account_equity <= 0.0 {
            return 0.0;
        }
        positions_with_stops
            .iter()
            .map(|(notional, stop_pct)| notional * (stop_pct / 100.0) / account_equity * 100.0)
            .sum()
    }

    pub fn would_exceed_max_open_risk(&self, current_open_risk_pct: f64, new_trade_risk_pct: f64) -> bool {
        current_open_risk_pct + new_trade_risk_pct > self.max_open_risk_pct
    }
}
