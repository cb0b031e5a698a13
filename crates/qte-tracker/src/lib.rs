//! Durable symbol -> position ledger, persisted as a single JSON document.
//!
//! Schema is open: unknown keys in the file are ignored on load (`serde`'s
//! default behavior), and the engine is the sole writer. The broker is the
//! source of truth for whether a position exists; [`Tracker::reconcile`]
//! brings the file back in line with broker state on restart.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackedPosition {
    pub qty: u64,
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
    pub stop_pct: f64,
}

/// `max(0, floor((now - entry).days))`, for daily-bar time exits.
pub fn bars_held(entry_time: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - entry_time).num_days().max(0)
}

pub struct Tracker {
    path: PathBuf,
    positions: BTreeMap<String, TrackedPosition>,
}

impl Tracker {
    /// Loads the JSON document at `path`, or starts empty if it doesn't
    /// exist yet. A malformed file is a fatal error — the operator should
    /// fix or remove it, not trade on a silently dropped ledger.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let positions = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("read position tracker: {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("parse position tracker: {}", path.display()))?
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, positions })
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create tracker dir: {}", parent.display()))?;
        }
        let raw = serde_json::to_string_pretty(&self.positions)?;
        std::fs::write(&self.path, raw)
            .with_context(|| format!("write position tracker: {}", self.path.display()))
    }

    pub fn get(&self, symbol: &str) -> Option<&TrackedPosition> {
        self.positions.get(&symbol.to_uppercase())
    }

    pub fn positions(&self) -> &BTreeMap<String, TrackedPosition> {
        &self.positions
    }

    pub fn add(
        &mut self,
        symbol: &str,
        qty: u64,
        entry_price: f64,
        stop_pct: f64,
        entry_time: DateTime<Utc>,
    ) -> Result<()> {
        self.positions.insert(
            symbol.to_uppercase(),
            TrackedPosition {
                qty,
                entry_price,
                entry_time,
                stop_pct,
            },
        );
        self.save()
    }

    pub fn remove(&mut self, symbol: &str) -> Result<()> {
        self.positions.remove(&symbol.to_uppercase());
        self.save()
    }

    /// Reconciles the tracker against the broker's live positions: symbols
    /// the broker holds but the tracker doesn't get added with
    /// `entry = cost_basis/qty` and `default_stop_pct`; symbols the tracker
    /// holds but the broker doesn't get dropped (the broker is the source of
    /// truth for existence).
    pub fn reconcile(
        &mut self,
        broker_positions: &[(String, u64, f64)],
        default_stop_pct: f64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let broker_symbols: BTreeMap<&str, (u64, f64)> = broker_positions
            .iter()
            .map(|(sym, qty, cost_basis)| (sym.as_str(), (*qty, *cost_basis)))
            .collect();

        for (symbol, (qty, cost_basis)) in &broker_symbols {
            let key = symbol.to_uppercase();
            if !self.positions.contains_key(&key) && *qty > 0 {
                self.positions.insert(
                    key,
                    TrackedPosition {
                        qty: *qty,
                        entry_price: cost_basis / *qty as f64,
                        entry_time: now,
                        stop_pct: default_stop_pct,
                    },
                );
            }
        }
        self.positions
            .retain(|sym, _| broker_symbols.contains_key(sym.as_str()));
        self.save()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        "2026-06-01T00:00:00Z".parse().unwrap()
    }

    #[test]
    fn bars_held_never_negative() {
        assert_eq!(bars_held(now(), now() - Duration::hours(2)), 0);
    }

    #[test]
    fn bars_held_counts_whole_days() {
        assert_eq!(bars_held(now() - Duration::days(3), now()), 3);
    }

    #[test]
    fn add_then_get_roundtrips_in_memory() {
        let dir = std::env::temp_dir().join(format!("qte-tracker-test-{}", std::process::id()));
        let path = dir.join("positions_tracked.json");
        let mut tracker = Tracker::load(&path).unwrap();
        tracker.add("aapl", 10, 150.0, 1.5, now()).unwrap();
        let pos = tracker.get("AAPL").unwrap();
        assert_eq!(pos.qty, 10);
        assert!((pos.entry_price - 150.0).abs() < 1e-9);

        let reloaded = Tracker::load(&path).unwrap();
        assert_eq!(reloaded.get("AAPL").unwrap().qty, 10);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn remove_deletes_entry() {
        let dir = std::env::temp_dir().join(format!("qte-tracker-test-rm-{}", std::process::id()));
        let path = dir.join("positions_tracked.json");
        let mut tracker = Tracker::load(&path).unwrap();
        tracker.add("aapl", 10, 150.0, 1.5, now()).unwrap();
        tracker.remove("aapl").unwrap();
        assert!(tracker.get("AAPL").is_none());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn reconcile_adds_broker_only_positions_and_drops_stale_ones() {
        let dir = std::env::temp_dir().join(format!("qte-tracker-test-rc-{}", std::process::id()));
        let path = dir.join("positions_tracked.json");
        let mut tracker = Tracker::load(&path).unwrap();
        tracker.add("stale", 5, 10.0, 1.5, now()).unwrap();

        tracker
            .reconcile(&[("AAPL".to_string(), 10, 1500.0)], 1.5, now())
            .unwrap();

        assert!(tracker.get("STALE").is_none());
        let aapl = tracker.get("AAPL").unwrap();
        assert_eq!(aapl.qty, 10);
        assert!((aapl.entry_price - 150.0).abs() < 1e-9);
        std::fs::remove_dir_all(&dir).ok();
    }
}
