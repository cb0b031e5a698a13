//! Orchestrates the gate pipeline: wires the leaf components (calendar,
//! universe, blackouts, market-quality, strategy, sizing, portfolio-risk,
//! compliance, execution) into entry/exit decisions, and drives the
//! single-threaded control loop that polls a [`qte_broker::BrokerAdapter`].

mod config_adapt;
mod control_loop;
mod decision;
mod engine;

pub use config_adapt::build_engine;
pub use control_loop::ControlLoop;
pub use decision::{EntryContext, TradeDecision};
pub use engine::{fits_buying_power, Engine};
