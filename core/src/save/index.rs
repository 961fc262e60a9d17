//! Per-title slot index (`{title}_info.json`)

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use retroplay_shared::snapshot::Snapshot;
use retroplay_shared::title::TitleId;

use super::SaveError;
use crate::fs::{MAX_RECORD_BYTES, read_with_limit, write_atomic};

/// Result of reading an index file
#[derive(Debug)]
pub enum IndexRead {
    Missing,
    Loaded(SaveSlotIndex),
    /// Present but unreadable or not a valid index
    Damaged,
}

/// Index metadata for one occupied slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotEntry {
    pub timestamp: f64,
    pub datetime: String,
    /// Snapshot file size in bytes
    pub size: u64,
    pub checksum: String,
}

/// Per-title record of which slots hold snapshots.
///
/// Slot keys are decimal strings on disk (`"0"`, `"1"`, ...). Entries are
/// only ever removed by an explicit delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveSlotIndex {
    pub game_id: TitleId,
    #[serde(default)]
    pub slots: BTreeMap<String, SlotEntry>,
    #[serde(default)]
    pub last_played: f64,
    #[serde(default)]
    pub total_saves: u64,
    #[serde(default)]
    pub created: f64,
}

impl SaveSlotIndex {
    pub fn new(title: &TitleId, now: f64) -> Self {
        Self {
            game_id: title.clone(),
            slots: BTreeMap::new(),
            last_played: 0.0,
            total_saves: 0,
            created: now,
        }
    }

    /// Read the index at `path`.
    ///
    /// An unreadable or unparseable file is logged and reported as
    /// [`IndexRead::Damaged`].
    pub fn read(path: &Path) -> IndexRead {
        let bytes = match read_with_limit(path, MAX_RECORD_BYTES) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return IndexRead::Missing,
            Err(e) => {
                warn!("Save index {} unreadable: {}", path.display(), e);
                return IndexRead::Damaged;
            }
        };

        match serde_json::from_slice::<Self>(&bytes) {
            Ok(index) => IndexRead::Loaded(index),
            Err(e) => {
                warn!("Save index {} corrupt: {}", path.display(), e);
                IndexRead::Damaged
            }
        }
    }

    pub fn write(&self, path: &Path) -> Result<(), SaveError> {
        let bytes = serde_json::to_vec_pretty(self).map_err(SaveError::Serialize)?;
        write_atomic(path, &bytes)?;
        Ok(())
    }

    pub fn entry(&self, slot: u32) -> Option<&SlotEntry> {
        self.slots.get(&slot.to_string())
    }

    /// Record a successful save of `snapshot` (`size` bytes) into `slot`.
    pub fn record_save(&mut self, slot: u32, snapshot: &Snapshot, size: u64) -> SlotEntry {
        let entry = SlotEntry {
            timestamp: snapshot.timestamp,
            datetime: snapshot.iso_time.clone(),
            size,
            checksum: snapshot.checksum.clone(),
        };
        self.slots.insert(slot.to_string(), entry.clone());
        self.last_played = snapshot.timestamp;
        self.total_saves += 1;
        entry
    }

    /// Re-add an entry for a slot file found on disk, without counting a save.
    pub fn restore(&mut self, slot: u32, snapshot: &Snapshot, size: u64) {
        let entry = SlotEntry {
            timestamp: snapshot.timestamp,
            datetime: snapshot.iso_time.clone(),
            size,
            checksum: snapshot.checksum.clone(),
        };
        self.slots.insert(slot.to_string(), entry);
        self.last_played = self.last_played.max(snapshot.timestamp);
    }

    pub fn remove(&mut self, slot: u32) -> Option<SlotEntry> {
        self.slots.remove(&slot.to_string())
    }
}
