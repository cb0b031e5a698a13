//! Single-document YAML configuration tree for the trade-decision pipeline.
//!
//! Every section is optional; missing keys fall back to the defaults quoted
//! inline on each field. Unknown keys are ignored by `serde_yaml` rather
//! than rejected, matching an open configuration schema.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveTime;
use serde::Deserialize;

fn default_true() -> bool {
    true
}

fn parse_hhmm(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M").ok()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub firm: String,
    pub paper: bool,
    pub data_feed: String,
    pub check_interval_minutes: u32,
    pub api_retry_times: u32,
    pub api_retry_delay_sec: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            firm: "alpaca".to_string(),
            paper: true,
            data_feed: "iex".to_string(),
            check_interval_minutes: 5,
            api_retry_times: 3,
            api_retry_delay_sec: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UniverseConfig {
    pub symbols: Vec<String>,
    pub min_avg_dollar_volume_30d: f64,
    pub min_atr_multiple_for_volume: f64,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            symbols: vec!["SPY".to_string()],
            min_avg_dollar_volume_30d: 50_000_000.0,
            min_atr_multiple_for_volume: 0.5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionWindowConfig {
    pub start: String,
    pub end: String,
    #[serde(default = "default_true")]
    pub trade_allowed: bool,
}

impl SessionWindowConfig {
    /// Parses `start`/`end` into wall-clock times. Returns `None` if either
    /// field is not an `HH:MM` string, in which case the caller should treat
    /// the session as unconfigured and fall back to its own default.
    pub fn parsed(&self) -> Option<(NaiveTime, NaiveTime)> {
        Some((parse_hhmm(&self.start)?, parse_hhmm(&self.end)?))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarketSessionsConfig {
    pub pre_market: SessionWindowConfig,
    pub regular: SessionWindowConfig,
    pub after_hours: SessionWindowConfig,
}

impl Default for MarketSessionsConfig {
    fn default() -> Self {
        Self {
            pre_market: SessionWindowConfig {
                start: "04:00".to_string(),
                end: "09:30".to_string(),
                trade_allowed: true,
            },
            regular: SessionWindowConfig {
                start: "09:30".to_string(),
                end: "16:00".to_string(),
                trade_allowed: true,
            },
            after_hours: SessionWindowConfig {
                start: "16:00".to_string(),
                end: "20:00".to_string(),
                trade_allowed: true,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarketQualityConfig {
    pub max_spread_pct: f64,
    pub min_volume_atr_ratio: f64,
    pub block_on_news_spike: bool,
    pub news_volatility_spike_atr_multiple: f64,
}

impl Default for MarketQualityConfig {
    fn default() -> Self {
        Self {
            max_spread_pct: 0.10,
            min_volume_atr_ratio: 1.0,
            block_on_news_spike: true,
            news_volatility_spike_atr_multiple: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlayerFocusConfig {
    Neutral,
    Institutional,
    Retail,
}

impl Default for PlayerFocusConfig {
    fn default() -> Self {
        PlayerFocusConfig::Neutral
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrendFollowingSectionConfig {
    pub ma_fast: usize,
    pub ma_slow: usize,
    pub pullback_touch_ma_fast: bool,
    pub volatility_filter_atr_period: usize,
    pub max_atr_pct_for_entry: f64,
}

impl Default for TrendFollowingSectionConfig {
    fn default() -> Self {
        Self {
            ma_fast: 20,
            ma_slow: 200,
            pullback_touch_ma_fast: true,
            volatility_filter_atr_period: 14,
            max_atr_pct_for_entry: 2.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetailSectionConfig {
    pub ma_fast: usize,
    pub ma_slow: usize,
    pub time_bars_exit: u32,
}

impl Default for RetailSectionConfig {
    fn default() -> Self {
        Self {
            ma_fast: 10,
            ma_slow: 50,
            time_bars_exit: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InstitutionalSectionConfig {
    pub min_volume_ratio_vs_avg: f64,
}

impl Default for InstitutionalSectionConfig {
    fn default() -> Self {
        Self {
            min_volume_ratio_vs_avg: 1.2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KillSwitchConfig {
    pub max_spread_pct: f64,
    pub max_atr_multiple: f64,
}

impl Default for KillSwitchConfig {
    fn default() -> Self {
        Self {
            max_spread_pct: 0.25,
            max_atr_multiple: 3.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExitsConfig {
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub time_bars_exit: u32,
    pub kill_switch: KillSwitchConfig,
}

impl Default for ExitsConfig {
    fn default() -> Self {
        Self {
            stop_loss_pct: 1.5,
            take_profit_pct: 3.0,
            time_bars_exit: 20,
            kill_switch: KillSwitchConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CandlestickFilterConfig {
    pub enabled: bool,
    pub patterns: Vec<String>,
}

impl Default for CandlestickFilterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            patterns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub player_focus: PlayerFocusConfig,
    pub trend_following: TrendFollowingSectionConfig,
    pub retail: RetailSectionConfig,
    pub institutional: InstitutionalSectionConfig,
    pub exits: ExitsConfig,
    pub candlestick_filter: CandlestickFilterConfig,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            player_focus: PlayerFocusConfig::default(),
            trend_following: TrendFollowingSectionConfig::default(),
            retail: RetailSectionConfig::default(),
            institutional: InstitutionalSectionConfig::default(),
            exits: ExitsConfig::default(),
            candlestick_filter: CandlestickFilterConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HighVolReductionConfig {
    pub enabled: bool,
    pub atr_pct_threshold: f64,
    pub size_multiplier: f64,
}

impl Default for HighVolReductionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            atr_pct_threshold: 2.0,
            size_multiplier: 0.5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PositionSizingConfig {
    pub risk_per_trade_pct: f64,
    pub max_open_risk_pct: f64,
    pub max_exposure_per_symbol_pct: f64,
    pub max_exposure_per_sector_pct: f64,
    pub high_vol_reduction: HighVolReductionConfig,
}

impl Default for PositionSizingConfig {
    fn default() -> Self {
        Self {
            risk_per_trade_pct: 0.5,
            max_open_risk_pct: 3.0,
            max_exposure_per_symbol_pct: 20.0,
            max_exposure_per_sector_pct: 40.0,
            high_vol_reduction: HighVolReductionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PortfolioRiskConfig {
    pub daily_loss_limit_pct: f64,
    pub max_drawdown_pct: f64,
    pub safe_mode_after_max_dd: bool,
    pub recovery_criteria_pct: f64,
    pub max_trades_per_day: u32,
    pub max_trades_per_symbol_per_day: u32,
}

impl Default for PortfolioRiskConfig {
    fn default() -> Self {
        Self {
            daily_loss_limit_pct: -2.0,
            max_drawdown_pct: -10.0,
            safe_mode_after_max_dd: true,
            recovery_criteria_pct: -8.0,
            max_trades_per_day: 15,
            max_trades_per_symbol_per_day: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExecutionConfigSection {
    pub prefer_limit_orders: bool,
    pub limit_order_offset_ticks: u32,
    pub max_spread_pct_to_trade: f64,
    pub partial_fill_timeout_seconds: u64,
    pub cancel_replace_on_partial: bool,
    pub max_slippage_bps: f64,
    pub block_strategy_if_slippage_bps_avg_exceeds: f64,
}

impl Default for ExecutionConfigSection {
    fn default() -> Self {
        Self {
            prefer_limit_orders: true,
            limit_order_offset_ticks: 1,
            max_spread_pct_to_trade: 0.10,
            partial_fill_timeout_seconds: 30,
            cancel_replace_on_partial: true,
            max_slippage_bps: 10.0,
            block_strategy_if_slippage_bps_avg_exceeds: 25.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ComplianceConfig {
    pub pdt_min_equity: f64,
    pub pdt_enabled: bool,
    pub margin_account: bool,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            pdt_min_equity: 25_000.0,
            pdt_enabled: true,
            margin_account: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct BlackoutWindowConfig {
    pub date: String,
    #[serde(default = "default_start_of_day")]
    pub start: String,
    #[serde(default = "default_end_of_day")]
    pub end: String,
}

fn default_start_of_day() -> String {
    "00:00".to_string()
}

fn default_end_of_day() -> String {
    "23:59".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MacroBlackoutConfig {
    pub enabled: bool,
    pub blackout_dates: Vec<String>,
    pub blackout_windows: Vec<BlackoutWindowConfig>,
}

impl Default for MacroBlackoutConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            blackout_dates: Vec::new(),
            blackout_windows: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EarningsBlackoutConfig {
    pub enabled: bool,
    pub days_before: i64,
    pub days_after: i64,
    pub earnings_dates: std::collections::HashMap<String, Vec<String>>,
}

impl Default for EarningsBlackoutConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            days_before: 1,
            days_after: 1,
            earnings_dates: std::collections::HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VolatilityDoNotTradeConfig {
    pub enabled: bool,
    pub max_atr_pct: f64,
    pub max_spread_pct: f64,
}

impl Default for VolatilityDoNotTradeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_atr_pct: 2.5,
            max_spread_pct: 0.15,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TradeFiltersConfig {
    pub macro_blackout: MacroBlackoutConfig,
    pub earnings_blackout: EarningsBlackoutConfig,
    pub volatility_do_not_trade: VolatilityDoNotTradeConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub broker: BrokerConfig,
    pub universe: UniverseConfig,
    pub market_sessions: MarketSessionsConfig,
    pub holidays: Vec<String>,
    pub market_quality: MarketQualityConfig,
    pub strategy: StrategyConfig,
    pub position_sizing: PositionSizingConfig,
    pub portfolio_risk: PortfolioRiskConfig,
    pub execution: ExecutionConfigSection,
    pub compliance: ComplianceConfig,
    pub trade_filters: TradeFiltersConfig,
}

impl EngineConfig {
    /// Reads and parses the YAML document at `path`. A missing file or
    /// unparsable document is a fatal configuration error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: EngineConfig = serde_yaml::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }
}
