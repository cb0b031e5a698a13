//! Broker adapter trait and the retry wrapper around its I/O. A live venue
//! client (credential loading, real HTTP calls) is out of scope — this crate
//! ships only the seam and a deterministic test double.

mod adapter;
mod paper;
pub mod retry;

pub use adapter::{BrokerAdapter, BrokerOrderRecord, BrokerPosition, OrderAck, Timeframe};
pub use paper::PaperBroker;
