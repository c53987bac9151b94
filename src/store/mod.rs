//! Validation Persistence
//!
//! Owns two files under the persistence directory:
//! - `validation_state.json`: the single current record, replaced atomically
//! - `validation_history.jsonl`: append-only event log
//!
//! No locking: concurrent writers must be serialized by the caller.

mod atomic;
mod history;
mod integrity;

pub use atomic::atomic_write;
pub use integrity::{integrity_violations, verify_integrity};

use crate::error::PersistenceError;
use crate::models::{ValidationEvent, ValidationState};
use std::path::{Path, PathBuf};

pub const STATE_FILE: &str = "validation_state.json";
pub const HISTORY_FILE: &str = "validation_history.jsonl";

pub struct PersistenceStore {
    dir: PathBuf,
}

impl PersistenceStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn state_path(&self) -> PathBuf {
        self.dir.join(STATE_FILE)
    }

    pub fn history_path(&self) -> PathBuf {
        self.dir.join(HISTORY_FILE)
    }

    // =========================================================================
    // State Record
    // =========================================================================

    /// Replace the state record
    pub fn save_state(&self, state: &ValidationState) -> Result<(), PersistenceError> {
        std::fs::create_dir_all(&self.dir)?;
        let content = serde_json::to_string_pretty(state)?;
        atomic_write(&self.state_path(), content.as_bytes())?;

        tracing::info!(
            path = %self.state_path().display(),
            hash = %state.validation_hash,
            "Saved validation state"
        );
        Ok(())
    }

    /// Load the state record; missing or corrupted reads as `None`
    ///
    /// A corrupted file is logged and left untouched for inspection.
    pub fn load_state(&self) -> Option<ValidationState> {
        match self.try_load_state() {
            Ok(state) => Some(state),
            Err(PersistenceError::NotFound(_)) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unusable validation state");
                None
            }
        }
    }

    pub fn try_load_state(&self) -> Result<ValidationState, PersistenceError> {
        let path = self.state_path();
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PersistenceError::NotFound(path));
            }
            Err(e) => return Err(PersistenceError::Io(e)),
        };

        let corrupted = |reason: String| PersistenceError::Corrupted {
            path: path.clone(),
            reason,
        };

        let raw: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| corrupted(format!("invalid JSON: {}", e)))?;

        let violations = integrity_violations(&raw);
        if !violations.is_empty() {
            return Err(corrupted(violations.join("; ")));
        }

        serde_json::from_value(raw).map_err(|e| corrupted(e.to_string()))
    }

    // =========================================================================
    // Event History
    // =========================================================================

    pub fn append_event(&self, event: &ValidationEvent) -> Result<(), PersistenceError> {
        std::fs::create_dir_all(&self.dir)?;
        history::append(&self.history_path(), event)?;
        Ok(())
    }

    /// Most recent `limit` events, newest first
    pub fn get_history(&self, limit: usize) -> Result<Vec<ValidationEvent>, PersistenceError> {
        let events = history::read_all(&self.history_path())?;
        Ok(events.into_iter().rev().take(limit).collect())
    }

    /// Keep only the newest `max_entries` events; returns how many were dropped
    pub fn trim_history(&self, max_entries: usize) -> Result<usize, PersistenceError> {
        let dropped = history::trim(&self.history_path(), max_entries)?;
        if dropped > 0 {
            tracing::info!(dropped, kept = max_entries, "Trimmed validation history");
        }
        Ok(dropped)
    }
}

// =============================================================================
// Tests
// =============================================================================
