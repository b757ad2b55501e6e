//! Persistent progress tracking
//!
//! A small JSON document records the exclusive end of the committed prefix
//! of the enumeration, so an interrupted run can resume without re-deriving
//! earlier indices. Indices are serialized as decimal strings: the search
//! space can exceed what JSON consumers hold in a double. The file is
//! rewritten through a temp file and rename so a crash never leaves a
//! partial write behind.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Run lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Paused,
    Error,
}

/// The persisted progress record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressState {
    /// Exclusive end of the committed prefix: every index below this has
    /// been enumerated and forwarded for derivation. Never decreases.
    #[serde(with = "decimal_string")]
    pub last_processed_index: u128,

    /// Total enumeration count for the run
    #[serde(with = "decimal_string")]
    pub total_combinations: u128,

    pub start_time: DateTime<Utc>,
    pub last_update_time: DateTime<Utc>,

    /// Chunks acknowledged so far
    pub chunks_processed: u64,

    pub status: RunStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProgressState {
    fn fresh(total_combinations: u128) -> Self {
        let now = Utc::now();
        Self {
            last_processed_index: 0,
            total_combinations,
            start_time: now,
            last_update_time: now,
            chunks_processed: 0,
            status: RunStatus::Running,
            error: None,
        }
    }
}

/// Owner of the progress file; written only by the coordinator
#[derive(Debug)]
pub struct ProgressTracker {
    path: PathBuf,
    state: ProgressState,
}

impl ProgressTracker {
    /// Start a fresh run
    pub fn new(path: impl Into<PathBuf>, total_combinations: u128) -> Self {
        Self {
            path: path.into(),
            state: ProgressState::fresh(total_combinations),
        }
    }

    /// Load a prior run for resuming. A missing or unparseable file is not
    /// an error: a fresh state is returned.
    pub fn load_or_new(path: impl Into<PathBuf>, total_combinations: u128) -> Self {
        let path = path.into();
        let state = match Self::load_state(&path) {
            Some(mut prior) => {
                if prior.total_combinations != total_combinations {
                    warn!(
                        stored = %prior.total_combinations,
                        computed = %total_combinations,
                        "stored total differs from this run's search space"
                    );
                }
                prior.total_combinations = total_combinations;
                prior.status = RunStatus::Running;
                prior.error = None;
                prior
            }
            None => ProgressState::fresh(total_combinations),
        };
        Self { path, state }
    }

    fn load_state(path: &Path) -> Option<ProgressState> {
        let content = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&content) {
            Ok(state) => Some(state),
            Err(err) => {
                warn!(path = %path.display(), %err, "ignoring unparseable progress file");
                None
            }
        }
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    pub fn last_processed_index(&self) -> u128 {
        self.state.last_processed_index
    }

    /// Record a committed chunk ending at `end_index` (exclusive).
    ///
    /// The stored index is monotone; a stale end index advances the chunk
    /// counter but never moves progress backwards.
    pub fn record_chunk(&mut self, end_index: u128) -> Result<()> {
        if end_index > self.state.last_processed_index {
            self.state.last_processed_index = end_index;
        }
        self.state.chunks_processed += 1;
        self.state.last_update_time = Utc::now();
        self.save()?;
        debug!(
            index = %self.state.last_processed_index,
            chunks = self.state.chunks_processed,
            "progress committed"
        );
        Ok(())
    }

    /// Update run status, persisting immediately
    pub fn set_status(&mut self, status: RunStatus, error: Option<String>) -> Result<()> {
        self.state.status = status;
        self.state.error = error;
        self.state.last_update_time = Utc::now();
        self.save()
    }

    /// Atomic rewrite: temp file in the same directory, then rename
    fn save(&self) -> Result<()> {
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&self.state)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Serialize u128 as a decimal string for JSON safety
mod decimal_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<u128>()
            .map_err(|_| de::Error::custom(format!("invalid index: {raw}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");

        let mut tracker = ProgressTracker::new(&path, 2048);
        tracker.record_chunk(1000).unwrap();
        tracker.record_chunk(2000).unwrap();
        tracker.set_status(RunStatus::Paused, None).unwrap();

        let loaded = ProgressTracker::load_or_new(&path, 2048);
        assert_eq!(loaded.last_processed_index(), 2000);
        assert_eq!(loaded.state().chunks_processed, 2);
        // Resuming flips the status back to running.
        assert_eq!(loaded.state().status, RunStatus::Running);
        assert_eq!(loaded.state().start_time, tracker.state().start_time);
    }

    #[test]
    fn test_indices_serialize_as_decimal_strings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");

        // 2048^10 does not fit in a double or an i64.
        let total = 2048u128.pow(10);
        let mut tracker = ProgressTracker::new(&path, total);
        tracker.record_chunk(total - 1).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            raw["total_combinations"].as_str(),
            Some(total.to_string().as_str())
        );
        assert_eq!(
            raw["last_processed_index"].as_str(),
            Some((total - 1).to_string().as_str())
        );
        assert_eq!(raw["status"].as_str(), Some("running"));

        let loaded = ProgressTracker::load_or_new(&path, total);
        assert_eq!(loaded.last_processed_index(), total - 1);
    }

    #[test]
    fn test_progress_is_monotone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");

        let mut tracker = ProgressTracker::new(&path, 100);
        tracker.record_chunk(50).unwrap();
        tracker.record_chunk(30).unwrap();
        assert_eq!(tracker.last_processed_index(), 50);
        assert_eq!(tracker.state().chunks_processed, 2);
    }

    #[test]
    fn test_missing_file_yields_fresh_state() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = ProgressTracker::load_or_new(dir.path().join("absent.json"), 42);
        assert_eq!(tracker.last_processed_index(), 0);
        assert_eq!(tracker.state().total_combinations, 42);
        assert_eq!(tracker.state().status, RunStatus::Running);
    }

    #[test]
    fn test_corrupt_file_yields_fresh_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        fs::write(&path, "{not json").unwrap();

        let tracker = ProgressTracker::load_or_new(&path, 42);
        assert_eq!(tracker.last_processed_index(), 0);
    }

    #[test]
    fn test_error_status_persists_message() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");

        let mut tracker = ProgressTracker::new(&path, 10);
        tracker
            .set_status(RunStatus::Error, Some("worker pool collapsed".to_string()))
            .unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["status"].as_str(), Some("error"));
        assert_eq!(raw["error"].as_str(), Some("worker pool collapsed"));
    }
}
