// =============================================================================
// Snapshot Store — Recent weekly snapshots with atomic persistence
// =============================================================================
//
// In-repo stand-in for the persistence collaborator. Holds a capped ring of
// recent snapshots behind a parking_lot::RwLock so the runner (and any future
// serving layer) can read while a new week is appended.
//
// Persistence uses the atomic tmp + rename pattern to prevent corruption on
// crash. The scoring pipeline itself never touches this store — the previous
// week is always passed to it explicitly.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::snapshot::WeeklySnapshot;

/// Maximum number of snapshots retained (five years of weeks).
const MAX_SNAPSHOTS: usize = 260;

/// On-disk shape of the store.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SnapshotFile {
    #[serde(default)]
    snapshots: Vec<WeeklySnapshot>,
}

/// Thread-safe store of recent weekly snapshots, oldest first.
#[derive(Default)]
pub struct SnapshotStore {
    snapshots: RwLock<Vec<WeeklySnapshot>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from a JSON file at `path`.
    ///
    /// Missing file is an error so the caller can decide to start empty with
    /// a warning, mirroring the config-load fallback.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read snapshot store from {}", path.display()))?;

        let mut file: SnapshotFile = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse snapshot store from {}", path.display()))?;

        file.snapshots.sort_by_key(|s| s.week_ending);

        info!(
            path = %path.display(),
            snapshots = file.snapshots.len(),
            "snapshot store loaded"
        );

        Ok(Self {
            snapshots: RwLock::new(file.snapshots),
        })
    }

    /// Persist the store to `path` using an atomic write (write to `.tmp`,
    /// then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let file = SnapshotFile {
            snapshots: self.snapshots.read().clone(),
        };
        let content = serde_json::to_string_pretty(&file)
            .context("failed to serialise snapshot store to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp store to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp store to {}", path.display()))?;

        info!(path = %path.display(), "snapshot store saved (atomic)");
        Ok(())
    }

    /// Append a snapshot, keeping the ring ordered by week and capped at
    /// [`MAX_SNAPSHOTS`].
    pub fn push(&self, snapshot: WeeklySnapshot) {
        let mut snapshots = self.snapshots.write();
        snapshots.push(snapshot);
        snapshots.sort_by_key(|s| s.week_ending);
        while snapshots.len() > MAX_SNAPSHOTS {
            snapshots.remove(0);
        }
    }

    /// Most recent snapshot by week ending.
    pub fn latest(&self) -> Option<WeeklySnapshot> {
        self.snapshots.read().last().cloned()
    }

    /// Most recent snapshot strictly before `week_ending` — the explicit
    /// "previous week" input for delta computation.
    pub fn previous_before(&self, week_ending: NaiveDate) -> Option<WeeklySnapshot> {
        self.snapshots
            .read()
            .iter()
            .filter(|s| s.week_ending < week_ending)
            .last()
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.snapshots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.read().is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast_config::ForecastConfig;
    use crate::pipeline::evaluate_week;
    use crate::weekly::WeeklyInput;

    fn snapshot_for(week: NaiveDate) -> WeeklySnapshot {
        let mut cfg = ForecastConfig::default();
        for scenario in crate::types::Scenario::ALL {
            cfg.scenarios.insert(scenario, Default::default());
        }
        let input = WeeklyInput {
            week_ending: week,
            btc_close: None,
            spy_close: None,
            readings: Vec::new(),
            vix_stress: false,
        };
        evaluate_week(&cfg, &input, None)
    }

    fn week(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, day).unwrap()
    }

    #[test]
    fn push_keeps_week_order() {
        let store = SnapshotStore::new();
        store.push(snapshot_for(week(14)));
        store.push(snapshot_for(week(7)));
        store.push(snapshot_for(week(21)));

        assert_eq!(store.len(), 3);
        assert_eq!(store.latest().unwrap().week_ending, week(21));
    }

    #[test]
    fn previous_before_is_strictly_earlier() {
        let store = SnapshotStore::new();
        store.push(snapshot_for(week(7)));
        store.push(snapshot_for(week(14)));

        let prev = store.previous_before(week(14)).unwrap();
        assert_eq!(prev.week_ending, week(7));

        // The earliest week has no predecessor.
        assert!(store.previous_before(week(7)).is_none());
    }

    #[test]
    fn empty_store_accessors() {
        let store = SnapshotStore::new();
        assert!(store.is_empty());
        assert!(store.latest().is_none());
        assert!(store.previous_before(week(7)).is_none());
    }

    #[test]
    fn file_shape_round_trips() {
        let file = SnapshotFile {
            snapshots: vec![snapshot_for(week(7))],
        };
        let json = serde_json::to_string(&file).unwrap();
        let back: SnapshotFile = serde_json::from_str(&json).unwrap();
        assert_eq!(back.snapshots.len(), 1);
        assert_eq!(back.snapshots[0].week_ending, week(7));
    }

    #[test]
    fn empty_json_deserialises_to_empty_store_file() {
        let file: SnapshotFile = serde_json::from_str("{}").unwrap();
        assert!(file.snapshots.is_empty());
    }
}
