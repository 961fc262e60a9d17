//! Save slots and the autosave worker
//!
//! Each title gets up to `max_slots` snapshot files plus one index:
//!
//! ```text
//! {saves_dir}/{title}_slot_0.save   <- autosave
//! {saves_dir}/{title}_slot_1.save   <- quick-save (F5 / Ctrl+1)
//! {saves_dir}/{title}_info.json     <- SaveSlotIndex
//! ```
//!
//! Both kinds of file are written temp-then-rename. Index read-modify-write
//! cycles are serialized so the autosave worker and a manual save from the
//! loop cannot interleave.

mod index;


use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use retroplay_shared::game_state::GameState;
use retroplay_shared::snapshot::{self, CodecError};
use retroplay_shared::title::TitleId;

use crate::config::SavesConfig;
use crate::fs::{MAX_RECORD_BYTES, read_with_limit, write_atomic};
use crate::state::unix_now;
use crate::worker::{WorkerHandle, lock_recover};

pub use index::{IndexRead, SaveSlotIndex, SlotEntry};

/// Slot written by the autosave worker and restored on title load
pub const AUTOSAVE_SLOT: u32 = 0;

/// Supplies the state to autosave. Returning `None` skips the tick.
pub type StateProvider = Box<dyn FnMut() -> Option<GameState> + Send>;

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("no save in slot {slot} for {title}")]
    NotFound { title: TitleId, slot: u32 },

    #[error("save is corrupt: {0}")]
    Corrupt(CodecError),

    #[error("unsupported save format: {0}")]
    UnsupportedFormat(String),

    #[error("slot {slot} is out of range (0..{max})")]
    InvalidSlot { slot: u32, max: u32 },

    #[error("save I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("failed to serialize save index: {0}")]
    Serialize(serde_json::Error),
}

impl SaveError {
    /// Missing and corrupt saves are handled the same way: start fresh.
    pub fn is_missing(&self) -> bool {
        matches!(self, SaveError::NotFound { .. } | SaveError::Corrupt(_))
    }
}

impl From<CodecError> for SaveError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::UnsupportedVersion(version) => SaveError::UnsupportedFormat(version),
            other => SaveError::Corrupt(other),
        }
    }
}

/// What `list` reports for one slot
#[derive(Debug, Clone, PartialEq)]
pub struct SlotListing {
    pub exists: bool,
    pub timestamp: Option<f64>,
    pub datetime: Option<String>,
    pub size: u64,
}

impl SlotListing {
    fn empty() -> Self {
        Self {
            exists: false,
            timestamp: None,
            datetime: None,
            size: 0,
        }
    }
}

/// Slot files and indexes under one directory.
///
/// Shared between the coordinator and its autosave worker.
struct SlotStore {
    dir: PathBuf,
    max_slots: u32,
    index_lock: Mutex<()>,
}

impl SlotStore {
    fn slot_path(&self, title: &TitleId, slot: u32) -> PathBuf {
        self.dir.join(format!("{}_slot_{}.save", title, slot))
    }

    fn index_path(&self, title: &TitleId) -> PathBuf {
        self.dir.join(format!("{}_info.json", title))
    }

    /// The title's index. A damaged index is rebuilt from the slot files
    /// that still decode; the next write replaces it on disk.
    fn load_index(&self, title: &TitleId, now: f64) -> SaveSlotIndex {
        match SaveSlotIndex::read(&self.index_path(title)) {
            IndexRead::Loaded(index) => index,
            IndexRead::Missing => SaveSlotIndex::new(title, now),
            IndexRead::Damaged => self.rebuild_index(title, now),
        }
    }

    fn rebuild_index(&self, title: &TitleId, now: f64) -> SaveSlotIndex {
        let mut index = SaveSlotIndex::new(title, now);
        for slot in 0..self.max_slots {
            let path = self.slot_path(title, slot);
            let bytes = match read_with_limit(&path, MAX_RECORD_BYTES) {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => {
                    warn!("Skipping {} while rebuilding index: {}", path.display(), e);
                    continue;
                }
            };
            match snapshot::from_bytes(&bytes) {
                Ok(snapshot) => index.restore(slot, &snapshot, bytes.len() as u64),
                Err(e) => warn!("Skipping {} while rebuilding index: {}", path.display(), e),
            }
        }
        info!("Rebuilt save index for {} from {} slot files", title, index.slots.len());
        index
    }

    fn check_slot(&self, slot: u32) -> Result<(), SaveError> {
        if slot >= self.max_slots {
            return Err(SaveError::InvalidSlot {
                slot,
                max: self.max_slots,
            });
        }
        Ok(())
    }

    fn save(&self, title: &TitleId, slot: u32, state: &GameState) -> Result<SlotEntry, SaveError> {
        self.check_slot(slot)?;

        let snapshot = snapshot::encode(state)?;
        let bytes = snapshot::to_bytes(&snapshot)?;

        // Held across both writes; concurrent saves share temp file names
        let _guard = lock_recover(&self.index_lock, "save index");
        write_atomic(&self.slot_path(title, slot), &bytes)?;

        let index_path = self.index_path(title);
        let mut index = self.load_index(title, snapshot.timestamp);
        let entry = index.record_save(slot, &snapshot, bytes.len() as u64);
        index.write(&index_path)?;

        debug!("Saved {} slot {} ({} bytes)", title, slot, bytes.len());
        Ok(entry)
    }

    fn load(&self, title: &TitleId, slot: u32) -> Result<GameState, SaveError> {
        self.check_slot(slot)?;

        let bytes = match read_with_limit(&self.slot_path(title, slot), MAX_RECORD_BYTES) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SaveError::NotFound {
                    title: title.clone(),
                    slot,
                });
            }
            Err(e) => return Err(e.into()),
        };

        let snapshot = snapshot::from_bytes(&bytes)?;
        Ok(snapshot::decode(&snapshot)?)
    }

    fn list(&self, title: &TitleId) -> BTreeMap<u32, SlotListing> {
        let index = {
            let _guard = lock_recover(&self.index_lock, "save index");
            self.load_index(title, 0.0)
        };

        (0..self.max_slots)
            .map(|slot| {
                let on_disk = std::fs::metadata(self.slot_path(title, slot)).ok();
                let listing = match (on_disk, index.entry(slot)) {
                    (Some(_), Some(entry)) => SlotListing {
                        exists: true,
                        timestamp: Some(entry.timestamp),
                        datetime: Some(entry.datetime.clone()),
                        size: entry.size,
                    },
                    // File written but index update lost
                    (Some(meta), None) => SlotListing {
                        exists: true,
                        size: meta.len(),
                        ..SlotListing::empty()
                    },
                    (None, _) => SlotListing::empty(),
                };
                (slot, listing)
            })
            .collect()
    }

    fn delete(&self, title: &TitleId, slot: u32) -> Result<(), SaveError> {
        self.check_slot(slot)?;

        let _guard = lock_recover(&self.index_lock, "save index");
        match std::fs::remove_file(self.slot_path(title, slot)) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SaveError::NotFound {
                    title: title.clone(),
                    slot,
                });
            }
            Err(e) => return Err(e.into()),
        }

        let index_path = self.index_path(title);
        let mut index = self.load_index(title, unix_now());
        if index.remove(slot).is_some() {
            index.write(&index_path)?;
        }
        info!("Deleted {} slot {}", title, slot);
        Ok(())
    }
}

/// Owns the save directory and the autosave worker.
pub struct SaveCoordinator {
    store: Arc<SlotStore>,
    autosave_interval: Duration,
    autosave_backoff: Duration,
    autosave: Option<WorkerHandle>,
    autosave_live: Arc<AtomicUsize>,
    last_save: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl SaveCoordinator {
    pub fn new(config: &SavesConfig) -> Self {
        Self::with_dir(config.resolved_dir(), config)
    }

    /// Use `dir` instead of the configured directory.
    pub fn with_dir(dir: impl Into<PathBuf>, config: &SavesConfig) -> Self {
        Self {
            store: Arc::new(SlotStore {
                dir: dir.into(),
                max_slots: config.max_slots,
                index_lock: Mutex::new(()),
            }),
            autosave_interval: config.autosave_interval(),
            autosave_backoff: config.autosave_backoff(),
            autosave: None,
            autosave_live: Arc::new(AtomicUsize::new(0)),
            last_save: Arc::new(Mutex::new(None)),
        }
    }

    /// Override the autosave interval and error back-off.
    pub fn with_autosave_timing(mut self, interval: Duration, backoff: Duration) -> Self {
        self.autosave_interval = interval;
        self.autosave_backoff = backoff;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.store.dir
    }

    pub fn max_slots(&self) -> u32 {
        self.store.max_slots
    }

    /// Snapshot `state` into `slot` and update the title's index.
    pub fn save(&self, title: &TitleId, slot: u32, state: &GameState) -> Result<SlotEntry, SaveError> {
        let entry = self.store.save(title, slot, state)?;
        info!("Saved {} to slot {}", title, slot);
        Ok(entry)
    }

    /// Read and verify the snapshot in `slot`.
    pub fn load(&self, title: &TitleId, slot: u32) -> Result<GameState, SaveError> {
        let state = self.store.load(title, slot)?;
        info!("Loaded {} from slot {}", title, slot);
        Ok(state)
    }

    /// Every slot in range, joined with whether its file is present.
    pub fn list(&self, title: &TitleId) -> BTreeMap<u32, SlotListing> {
        self.store.list(title)
    }

    pub fn delete(&self, title: &TitleId, slot: u32) -> Result<(), SaveError> {
        self.store.delete(title, slot)
    }

    /// Read the title's index, rebuilt from slot files if it is damaged.
    pub fn index(&self, title: &TitleId) -> SaveSlotIndex {
        let _guard = lock_recover(&self.store.index_lock, "save index");
        self.store.load_index(title, 0.0)
    }

    /// Start autosaving `title` into slot 0, replacing any running worker.
    ///
    /// The previous worker is stopped and joined before the new one spawns.
    pub fn start_autosave(&mut self, title: TitleId, mut provider: StateProvider) -> io::Result<()> {
        self.stop_autosave();

        let store = Arc::clone(&self.store);
        let last_save = Arc::clone(&self.last_save);
        let interval = self.autosave_interval;
        let backoff = self.autosave_backoff;

        let handle = WorkerHandle::spawn(
            "autosave",
            interval,
            backoff,
            Arc::clone(&self.autosave_live),
            move || {
                let Some(state) = provider() else {
                    return interval;
                };
                match store.save(&title, AUTOSAVE_SLOT, &state) {
                    Ok(_) => {
                        *lock_recover(&last_save, "last save") = Some(Utc::now());
                        debug!("Autosaved {}", title);
                        interval
                    }
                    Err(e) => {
                        warn!("Autosave of {} failed, retrying in {:?}: {}", title, backoff, e);
                        backoff
                    }
                }
            },
        )?;

        self.autosave = Some(handle);
        Ok(())
    }

    /// Stop and join the autosave worker. No-op when none is running.
    pub fn stop_autosave(&mut self) {
        if let Some(mut handle) = self.autosave.take() {
            handle.stop();
        }
    }

    pub fn autosave_running(&self) -> bool {
        self.autosave.as_ref().is_some_and(WorkerHandle::is_alive)
    }

    /// Number of autosave threads currently executing
    pub fn live_autosave_workers(&self) -> usize {
        self.autosave_live.load(Ordering::SeqCst)
    }

    /// When the autosave worker last succeeded
    pub fn last_save_time(&self) -> Option<DateTime<Utc>> {
        *lock_recover(&self.last_save, "last save")
    }
}

impl Drop for SaveCoordinator {
    fn drop(&mut self) {
        self.stop_autosave();
    }
}
