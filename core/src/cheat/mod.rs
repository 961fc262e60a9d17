//! Per-title cheat tables and the cheat monitor
//!
//! A cheat is a standing constraint: while enabled, the monitor writes its
//! value into one [`PatchField`] of the shared state on every tick. Each
//! write goes through [`SharedState::patch`], so the loop never sees a
//! half-written struct.
//!
//! Lifecycle: `Unloaded -> Loaded -> Monitoring -> Loaded -> Unloaded`.
//! Unloading stops the monitor before the table is written back to
//! `{cheats_dir}/{title}.json`. Entries that fail to parse are carried
//! through the write unchanged, and a file that cannot be read as a JSON
//! array is never overwritten.


use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use retroplay_shared::game_state::{FieldError, PatchField};
use retroplay_shared::title::TitleId;

use crate::config::CheatsConfig;
use crate::fs::{MAX_RECORD_BYTES, read_with_limit, write_atomic};
use crate::state::{SharedState, unix_now};
use crate::worker::{WorkerHandle, lock_recover, read_recover, write_recover};

/// One entry of a per-title cheat table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheatPatch {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Name of the [`PatchField`] to pin, e.g. `"lives"`
    pub target_key: String,
    #[serde(default)]
    pub value: i64,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub auto_enable: bool,
    /// Unix seconds of the last successful write
    #[serde(skip)]
    pub last_applied: Option<f64>,
}

impl CheatPatch {
    pub fn new(id: &str, name: &str, target_key: &str, value: i64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            target_key: target_key.to_string(),
            value,
            enabled: false,
            auto_enable: false,
            last_applied: None,
        }
    }

    /// The field this patch writes, if `target_key` names one.
    pub fn target(&self) -> Result<PatchField, FieldError> {
        self.target_key.parse()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CheatError {
    #[error("cheat '{id}' has an invalid target: {source}")]
    InvalidCheatTarget {
        id: String,
        #[source]
        source: FieldError,
    },

    #[error("no cheat with id '{0}'")]
    UnknownPatch(String),

    #[error("no cheat table is loaded")]
    NotLoaded,

    #[error("cheat table I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("cheat table is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheatPhase {
    Unloaded,
    Loaded,
    Monitoring,
}

/// Read model for the HUD
#[derive(Debug, Clone, PartialEq)]
pub struct CheatStatus {
    pub phase: CheatPhase,
    pub enabled_count: usize,
    pub patches: Vec<CheatPatch>,
}

/// Outcome of one application pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Ids written this pass
    pub applied: Vec<String>,
    /// Ids skipped because their target is invalid
    pub skipped: Vec<String>,
}

/// Entries of a table file that parsed, and the raw ones that did not.
#[derive(Debug, Default)]
struct ParsedTable {
    patches: Vec<CheatPatch>,
    rejected: Vec<serde_json::Value>,
}

fn parse_table(title: &TitleId, bytes: &[u8]) -> Result<ParsedTable, serde_json::Error> {
    let entries: Vec<serde_json::Value> = serde_json::from_slice(bytes)?;
    let mut table = ParsedTable::default();
    for (index, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<CheatPatch>(entry.clone()) {
            Ok(patch) => table.patches.push(patch),
            Err(e) => {
                warn!("Skipping cheat entry {} for {}: {}", index, title, e);
                table.rejected.push(entry);
            }
        }
    }
    Ok(table)
}

/// How the loaded table relates to the file it came from
#[derive(Debug, Default)]
enum TableSource {
    /// Missing or fully parsed
    #[default]
    Clean,
    /// Some entries failed to parse; they are written back as-is
    Partial(Vec<serde_json::Value>),
    /// The file exists but could not be read; it is left alone
    Unreadable,
}

/// Patch table shared with the monitor thread.
#[derive(Default)]
struct CheatTable {
    patches: RwLock<Vec<CheatPatch>>,
    /// Ids already warned about during the current monitor run
    warned: Mutex<HashSet<String>>,
}

impl CheatTable {
    fn apply_enabled(&self, state: &SharedState) -> ApplyReport {
        let enabled: Vec<(String, String, i64)> = read_recover(&self.patches, "cheat table")
            .iter()
            .filter(|p| p.enabled)
            .map(|p| (p.id.clone(), p.target_key.clone(), p.value))
            .collect();

        let mut report = ApplyReport::default();
        for (id, target_key, value) in enabled {
            let result = target_key
                .parse::<PatchField>()
                .and_then(|field| state.patch(field, value));
            match result {
                Ok(()) => report.applied.push(id),
                Err(source) => {
                    let err = CheatError::InvalidCheatTarget {
                        id: id.clone(),
                        source,
                    };
                    if lock_recover(&self.warned, "cheat warnings").insert(id.clone()) {
                        warn!("Skipping cheat: {}", err);
                    }
                    report.skipped.push(id);
                }
            }
        }

        if !report.applied.is_empty() {
            let now = unix_now();
            let mut patches = write_recover(&self.patches, "cheat table");
            for patch in patches.iter_mut() {
                if report.applied.contains(&patch.id) {
                    patch.last_applied = Some(now);
                }
            }
        }

        report
    }
}

/// Owns the loaded title's cheat table and the monitor worker.
pub struct CheatEngine {
    dir: PathBuf,
    interval: Duration,
    backoff: Duration,
    title: Option<TitleId>,
    source: TableSource,
    table: Arc<CheatTable>,
    monitor: Option<WorkerHandle>,
    monitor_live: Arc<AtomicUsize>,
}

impl CheatEngine {
    pub fn new(config: &CheatsConfig) -> Self {
        Self::with_dir(config.resolved_dir(), config)
    }

    /// Use `dir` instead of the configured directory.
    pub fn with_dir(dir: impl Into<PathBuf>, config: &CheatsConfig) -> Self {
        Self {
            dir: dir.into(),
            interval: config.monitor_interval(),
            backoff: config.monitor_backoff(),
            title: None,
            source: TableSource::Clean,
            table: Arc::new(CheatTable::default()),
            monitor: None,
            monitor_live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Override the monitor interval and error back-off.
    pub fn with_monitor_timing(mut self, interval: Duration, backoff: Duration) -> Self {
        self.interval = interval;
        self.backoff = backoff;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn table_path(&self, title: &TitleId) -> PathBuf {
        self.dir.join(format!("{}.json", title))
    }

    pub fn phase(&self) -> CheatPhase {
        match (&self.title, &self.monitor) {
            (None, _) => CheatPhase::Unloaded,
            (Some(_), None) => CheatPhase::Loaded,
            (Some(_), Some(_)) => CheatPhase::Monitoring,
        }
    }

    pub fn title(&self) -> Option<&TitleId> {
        self.title.as_ref()
    }

    fn load_table(&self, title: &TitleId) -> Result<ParsedTable, CheatError> {
        let bytes = match read_with_limit(&self.table_path(title), MAX_RECORD_BYTES) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(ParsedTable::default()),
            Err(e) => return Err(e.into()),
        };
        Ok(parse_table(title, &bytes)?)
    }

    /// Read a title's table from disk without loading it.
    ///
    /// Entries that fail to parse are skipped with a warning. Errors only
    /// when the file cannot be read or is not a JSON array.
    pub fn read_table(&self, title: &TitleId) -> Result<Vec<CheatPatch>, CheatError> {
        Ok(self.load_table(title)?.patches)
    }

    /// Load `title`'s table and enable every auto-enable patch.
    ///
    /// A missing or unreadable table loads as empty. Any previously loaded
    /// title is unloaded first. Returns the number of enabled patches.
    pub fn auto_enable(&mut self, title: &TitleId) -> usize {
        if self.title.is_some() {
            if let Err(e) = self.unload() {
                warn!("Failed to persist previous cheat table: {}", e);
            }
        }

        let (mut patches, source) = match self.load_table(title) {
            Ok(parsed) if parsed.rejected.is_empty() => (parsed.patches, TableSource::Clean),
            Ok(parsed) => (parsed.patches, TableSource::Partial(parsed.rejected)),
            Err(e) => {
                warn!("Ignoring cheat table for {}: {}", title, e);
                (Vec::new(), TableSource::Unreadable)
            }
        };
        for patch in patches.iter_mut().filter(|p| p.auto_enable) {
            patch.enabled = true;
        }
        let enabled = patches.iter().filter(|p| p.enabled).count();

        *write_recover(&self.table.patches, "cheat table") = patches;
        self.source = source;
        self.title = Some(title.clone());
        info!("Loaded cheats for {} ({} enabled)", title, enabled);
        enabled
    }

    /// Set a patch's enabled flag. Setting it to its current value is a no-op.
    pub fn toggle(&self, id: &str, enabled: bool) -> Result<(), CheatError> {
        let mut patches = write_recover(&self.table.patches, "cheat table");
        let patch = patches
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| CheatError::UnknownPatch(id.to_string()))?;
        if patch.enabled != enabled {
            patch.enabled = enabled;
            info!("Cheat '{}' {}", patch.name, if enabled { "enabled" } else { "disabled" });
        }
        Ok(())
    }

    /// Add or replace a patch in the loaded table.
    pub fn insert(&self, patch: CheatPatch) {
        let mut patches = write_recover(&self.table.patches, "cheat table");
        match patches.iter_mut().find(|p| p.id == patch.id) {
            Some(existing) => *existing = patch,
            None => patches.push(patch),
        }
    }

    /// Apply every enabled patch once, synchronously.
    pub fn apply_enabled(&self, state: &SharedState) -> ApplyReport {
        self.table.apply_enabled(state)
    }

    /// Start re-applying enabled patches to `state`, replacing any running monitor.
    pub fn start_monitor(&mut self, state: SharedState) -> Result<(), CheatError> {
        if self.title.is_none() {
            return Err(CheatError::NotLoaded);
        }
        self.stop_monitor();
        lock_recover(&self.table.warned, "cheat warnings").clear();

        let table = Arc::clone(&self.table);
        let interval = self.interval;
        let handle = WorkerHandle::spawn(
            "cheat-monitor",
            interval,
            self.backoff,
            Arc::clone(&self.monitor_live),
            move || {
                let report = table.apply_enabled(&state);
                debug!("Applied {} cheats", report.applied.len());
                interval
            },
        )?;
        self.monitor = Some(handle);
        Ok(())
    }

    /// Stop and join the monitor. No-op when none is running.
    pub fn stop_monitor(&mut self) {
        if let Some(mut handle) = self.monitor.take() {
            handle.stop();
        }
    }

    pub fn live_monitor_workers(&self) -> usize {
        self.monitor_live.load(Ordering::SeqCst)
    }

    /// Stop the monitor, then write the table back to disk.
    ///
    /// A table loaded from an unreadable file is not written.
    pub fn persist(&mut self) -> Result<(), CheatError> {
        self.stop_monitor();
        let title = self.title.as_ref().ok_or(CheatError::NotLoaded)?;
        let patches = read_recover(&self.table.patches, "cheat table").clone();
        let bytes = match &self.source {
            TableSource::Clean => serde_json::to_vec_pretty(&patches)?,
            TableSource::Partial(rejected) => {
                let mut entries = patches
                    .iter()
                    .map(serde_json::to_value)
                    .collect::<Result<Vec<_>, _>>()?;
                entries.extend(rejected.iter().cloned());
                serde_json::to_vec_pretty(&entries)?
            }
            TableSource::Unreadable => {
                warn!("Not overwriting unreadable cheat table for {}", title);
                return Ok(());
            }
        };
        write_atomic(&self.table_path(title), &bytes)?;
        debug!("Persisted {} cheats for {}", patches.len(), title);
        Ok(())
    }

    /// Stop, persist and forget the loaded table.
    ///
    /// The table is cleared even when persisting fails; the error is returned.
    pub fn unload(&mut self) -> Result<(), CheatError> {
        if self.title.is_none() {
            self.stop_monitor();
            return Ok(());
        }
        let persisted = self.persist();
        write_recover(&self.table.patches, "cheat table").clear();
        self.source = TableSource::Clean;
        if let Some(title) = self.title.take() {
            info!("Unloaded cheats for {}", title);
        }
        persisted
    }

    /// Snapshot of the table for the HUD
    pub fn status(&self) -> CheatStatus {
        let patches = read_recover(&self.table.patches, "cheat table").clone();
        CheatStatus {
            phase: self.phase(),
            enabled_count: patches.iter().filter(|p| p.enabled).count(),
            patches,
        }
    }
}

impl Drop for CheatEngine {
    fn drop(&mut self) {
        self.stop_monitor();
    }
}
