//! Persistent history of state snapshots (Sled).
//!
//! Opt-in: nothing else in the crate opens an archive. Callers record the snapshots they want kept.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ArchiveError;
use crate::facts::State;

/// Default on-disk archive location.
pub const STATE_ARCHIVE_PATH: &str = "strips_state_archive";

const STATES_TREE: &str = "states";

/// One archived snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedState {
    pub sequence: u64,
    pub label: String,
    pub state: State,
}

/// Append-only snapshot store.
///
/// Keys are `{sequence:020}_{label}` so a tree scan yields snapshots in recording order.
#[derive(Debug, Clone)]
pub struct StateArchive {
    db: sled::Db,
}

impl StateArchive {
    /// Opens (or creates) the archive at `path`.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, ArchiveError> {
        Ok(Self::from_db(sled::open(path)?))
    }

    /// Wraps an already-open Sled handle.
    pub fn from_db(db: sled::Db) -> Self {
        Self { db }
    }

    /// Stores `state` under `label`. Returns the snapshot's sequence number.
    pub fn record(&self, label: &str, state: &State) -> Result<u64, ArchiveError> {
        let tree = self.db.open_tree(STATES_TREE)?;
        let sequence = self.db.generate_id()?;
        let entry = ArchivedState {
            sequence,
            label: label.to_string(),
            state: state.clone(),
        };

        let key = format!("{sequence:020}_{label}");
        tree.insert(key.as_bytes(), serde_json::to_vec(&entry)?)?;
        tree.flush()?;
        info!(target: "strips", sequence, label, facts = state.len(), "state archived");
        Ok(sequence)
    }

    /// The snapshot recorded with `sequence`, if any.
    pub fn load(&self, sequence: u64) -> Result<Option<ArchivedState>, ArchiveError> {
        let tree = self.db.open_tree(STATES_TREE)?;
        let prefix = format!("{sequence:020}_");
        match tree.scan_prefix(prefix.as_bytes()).next() {
            Some(entry) => {
                let (_, value) = entry?;
                Ok(Some(serde_json::from_slice(&value)?))
            }
            None => Ok(None),
        }
    }

    /// The most recently recorded snapshot.
    pub fn latest(&self) -> Result<Option<ArchivedState>, ArchiveError> {
        let tree = self.db.open_tree(STATES_TREE)?;
        match tree.last()? {
            Some((_, value)) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    /// Every snapshot recorded at or after `start`, oldest first.
    pub fn history(&self, start: u64) -> Result<Vec<ArchivedState>, ArchiveError> {
        let tree = self.db.open_tree(STATES_TREE)?;
        let mut out = Vec::new();
        for entry in tree.iter() {
            let (key, value) = entry?;
            let key = String::from_utf8_lossy(&key);
            let sequence = key
                .split_once('_')
                .and_then(|(seq, _)| seq.parse::<u64>().ok())
                .ok_or_else(|| ArchiveError::CorruptKey(key.to_string()))?;
            if sequence < start {
                continue;
            }
            out.push(serde_json::from_slice(&value)?);
        }
        Ok(out)
    }
}
