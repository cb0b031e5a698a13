//! Command handlers for the `qte` CLI. Each function owns one subcommand's
//! full behavior; `main.rs` only does argument parsing and error reporting.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;

use qte_broker::{BrokerAdapter, PaperBroker, Timeframe};
use qte_config::EngineConfig;
use qte_engine::EntryContext;

/// Loads and parses a configuration file, printing a short summary. Fails
/// with the parse error on malformed YAML, matching the same fatal-at-startup
/// treatment `run` and `check` give a bad config.
pub fn validate_config(path: &str) -> Result<()> {
    let config = EngineConfig::load(path)?;
    println!(
        "config ok: {} universe symbols, player_focus={:?}, check_interval_minutes={}",
        config.universe.symbols.len(),
        config.strategy.player_focus,
        config.broker.check_interval_minutes,
    );
    Ok(())
}

/// Evaluates the entry gate pipeline once for `symbol` against a freshly
/// constructed paper broker and prints the resulting decision. The paper
/// broker never fetches real market data on its own, so this is primarily
/// useful for exercising the gate pipeline against seeded fixtures rather
/// than a live market snapshot.
pub fn check(config_path: &str, symbol: &str) -> Result<()> {
    let config = EngineConfig::load(config_path)?;
    let tracker_path = std::env::temp_dir().join("qte-check-tracker.json");
    let (mut engine, _tracker) = qte_engine::build_engine(&config, tracker_path)?;

    let broker = PaperBroker::new(100_000.0);
    let now = Utc::now();
    let bars = broker.get_bars(symbol, Timeframe::OneDay, None, None, 210)?;
    let quote = broker.get_latest_quote(symbol)?;
    let equity = broker.get_equity()?;

    let decision = engine.evaluate_entry(EntryContext {
        symbol,
        now,
        equity,
        bars: &bars,
        quote,
        avg_dollar_volume_30d: None,
        volume_vs_atr: None,
        current_positions: &HashMap::new(),
        positions_with_stops: &[],
        sector_exposure_pct: &HashMap::new(),
        symbol_sector: None,
    });

    if decision.allowed {
        println!("ALLOW {symbol}: {:?}", decision.order_request);
    } else {
        println!("VETO {symbol}: {}", decision.reason.unwrap_or_default());
    }
    Ok(())
}

/// Builds the engine and control loop from a configuration file and runs it
/// against the paper broker until a shutdown signal arrives.
pub async fn run(config_path: &str, tracker_path: &str) -> Result<()> {
    let config = EngineConfig::load(config_path)?;
    let (engine, tracker) = qte_engine::build_engine(&config, tracker_path.to_string())?;

    let symbols = config.universe.symbols.clone();
    let default_stop_pct = config.strategy.exits.stop_loss_pct;
    let check_interval = Duration::from_secs(config.broker.check_interval_minutes as u64 * 60);

    let mut control_loop = qte_engine::ControlLoop::new(engine, tracker, symbols, default_stop_pct, check_interval);
    let mut broker = PaperBroker::new(100_000.0);

    control_loop.run(&mut broker).await
}
