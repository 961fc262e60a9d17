//! Controller and audio sink tracking
//!
//! The registry keeps a process-wide table of attached controllers and
//! Bluetooth audio sinks. A monitor worker re-enumerates controllers on an
//! interval and diffs the result against the table; the loop reads the
//! active controller once per frame through [`DeviceRegistry::read_active_input`].

pub mod audio;
pub mod backend;
pub mod classify;
#[cfg(feature = "gamepad")]
pub mod gamepad;
pub mod mapping;


use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::DevicesConfig;
use crate::input::ControlState;
use crate::worker::{WorkerHandle, read_recover, write_recover};

use audio::{AudioSink, Platform, Shell};
use backend::InputBackend;
use classify::{CONTROLLER_FAMILIES, UNKNOWN_FAMILY, classify};

/// How many connect/disconnect events the HUD can look back on
pub const EVENT_LOG_LEN: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("device scan failed: {0}")]
    ScanFailure(String),

    #[error("failed to run {program}: {source}")]
    Shell {
        program: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Controller,
    Audio,
}

/// One tracked device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    pub id: String,
    pub name: String,
    pub kind: DeviceKind,
    /// Keyword-table classification, `"Unknown"` when nothing matched
    pub family: &'static str,
    pub connected: bool,
    pub guid: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    Connected { id: String, name: String, kind: DeviceKind },
    Disconnected { id: String, name: String, kind: DeviceKind },
}

impl DeviceEvent {
    fn connected(record: &DeviceRecord) -> Self {
        DeviceEvent::Connected {
            id: record.id.clone(),
            name: record.name.clone(),
            kind: record.kind,
        }
    }

    fn disconnected(record: &DeviceRecord) -> Self {
        DeviceEvent::Disconnected {
            id: record.id.clone(),
            name: record.name.clone(),
            kind: record.kind,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            DeviceEvent::Connected { id, .. } | DeviceEvent::Disconnected { id, .. } => id,
        }
    }
}

/// Read model for the HUD
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceStatus {
    pub controllers: Vec<DeviceRecord>,
    pub audio_sinks: Vec<DeviceRecord>,
    pub monitoring: bool,
    pub recent_events: Vec<DeviceEvent>,
}

#[derive(Debug, Default)]
struct DeviceTable {
    /// Enumeration order; index 0 is the default active controller
    controllers: Vec<DeviceRecord>,
    audio: Vec<DeviceRecord>,
    events: VecDeque<DeviceEvent>,
}

impl DeviceTable {
    fn log(&mut self, event: DeviceEvent) {
        if self.events.len() == EVENT_LOG_LEN {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

/// State shared between the registry and its monitor worker
struct Inner {
    backend: Arc<dyn InputBackend>,
    shell: Arc<dyn Shell>,
    platform: Platform,
    deadzone: f32,
    table: RwLock<DeviceTable>,
}

impl Inner {
    fn scan_controllers(&self) -> Result<Vec<DeviceRecord>, DeviceError> {
        let count = self.backend.count()?;
        (0..count)
            .map(|index| {
                let pad = self.backend.open(index)?;
                Ok(DeviceRecord {
                    family: classify(&pad.name, CONTROLLER_FAMILIES),
                    id: pad.id,
                    name: pad.name,
                    kind: DeviceKind::Controller,
                    connected: true,
                    guid: (!pad.guid.is_empty()).then_some(pad.guid),
                    address: None,
                })
            })
            .collect()
    }

    /// Re-enumerate controllers and reconcile the table.
    ///
    /// Returns the events in the order they were logged: every disconnect,
    /// then every connect.
    fn refresh_controllers(&self) -> Result<Vec<DeviceEvent>, DeviceError> {
        let current = self.scan_controllers()?;

        let mut table = write_recover(&self.table, "device table");
        let mut events = Vec::new();

        let (kept, gone): (Vec<_>, Vec<_>) = std::mem::take(&mut table.controllers)
            .into_iter()
            .partition(|known| current.iter().any(|c| c.id == known.id));
        for record in &gone {
            info!("Controller disconnected: {} ({})", record.name, record.id);
            events.push(DeviceEvent::disconnected(record));
        }
        table.controllers = kept;

        for record in current {
            if !table.controllers.iter().any(|known| known.id == record.id) {
                info!("Controller connected: {} [{}]", record.name, record.family);
                events.push(DeviceEvent::connected(&record));
                table.controllers.push(record);
            }
        }

        for event in &events {
            table.log(event.clone());
        }
        Ok(events)
    }
}

/// Owns the device table and the device monitor worker.
pub struct DeviceRegistry {
    inner: Arc<Inner>,
    interval: Duration,
    backoff: Duration,
    monitor: Option<WorkerHandle>,
    monitor_live: Arc<AtomicUsize>,
}

impl DeviceRegistry {
    pub fn new(
        config: &DevicesConfig,
        backend: Arc<dyn InputBackend>,
        shell: Arc<dyn Shell>,
        platform: Platform,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                shell,
                platform,
                deadzone: config.deadzone,
                table: RwLock::new(DeviceTable::default()),
            }),
            interval: config.monitor_interval(),
            backoff: config.scan_backoff(),
            monitor: None,
            monitor_live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Override the monitor interval and scan-failure back-off.
    pub fn with_monitor_timing(mut self, interval: Duration, backoff: Duration) -> Self {
        self.interval = interval;
        self.backoff = backoff;
        self
    }

    /// Full enumeration of attached controllers. Does not touch the table.
    pub fn scan_controllers(&self) -> Result<Vec<DeviceRecord>, DeviceError> {
        self.inner.scan_controllers()
    }

    /// Bluetooth audio devices. Unsupported platforms report none.
    pub fn scan_audio_sinks(&self) -> Result<Vec<DeviceRecord>, DeviceError> {
        let sinks = audio::scan(self.inner.shell.as_ref(), self.inner.platform)?;
        Ok(sinks.iter().map(sink_record).collect())
    }

    /// Scan everything once, record what is connected and try to connect
    /// known audio sinks that are not.
    ///
    /// Returns `(controllers_connected, audio_connected)`. Individual
    /// failures are logged and skipped.
    pub fn auto_connect(&self) -> (usize, usize) {
        let controllers = match self.inner.refresh_controllers() {
            Ok(_) => read_recover(&self.inner.table, "device table").controllers.len(),
            Err(e) => {
                warn!("Controller scan failed: {}", e);
                0
            }
        };

        let sinks = match audio::scan(self.inner.shell.as_ref(), self.inner.platform) {
            Ok(sinks) => Some(sinks),
            Err(e) => {
                warn!("Audio scan failed: {}", e);
                None
            }
        };

        let mut audio_connected = 0;
        let mut failures = 0;
        if let Some(sinks) = sinks {
            let mut ready = Vec::new();
            for mut sink in sinks.into_iter().filter(|s| s.family != UNKNOWN_FAMILY) {
                if !sink.connected {
                    match audio::connect(self.inner.shell.as_ref(), self.inner.platform, &sink) {
                        Ok(true) => sink.connected = true,
                        Ok(false) => {
                            warn!("Could not connect audio device '{}'", sink.name);
                            failures += 1;
                            continue;
                        }
                        Err(e) => {
                            warn!("Could not connect audio device '{}': {}", sink.name, e);
                            failures += 1;
                            continue;
                        }
                    }
                }
                ready.push(sink_record(&sink));
            }
            audio_connected = ready.len();
            self.reconcile_audio(ready);
        }

        info!(
            "Devices ready: {} controllers, {} audio ({} failed)",
            controllers, audio_connected, failures
        );
        (controllers, audio_connected)
    }

    /// Replace the audio table with `current`, logging sinks that left
    /// before sinks that arrived.
    fn reconcile_audio(&self, current: Vec<DeviceRecord>) {
        let mut table = write_recover(&self.inner.table, "device table");

        let (kept, gone): (Vec<_>, Vec<_>) = std::mem::take(&mut table.audio)
            .into_iter()
            .partition(|known| current.iter().any(|c| c.id == known.id));
        for record in &gone {
            info!("Audio device disconnected: {} ({})", record.name, record.id);
            table.log(DeviceEvent::disconnected(record));
        }

        for record in &current {
            if !kept.iter().any(|known| known.id == record.id) {
                info!("Audio device connected: {} [{}]", record.name, record.family);
                table.log(DeviceEvent::connected(record));
            }
        }
        table.audio = current;
    }

    /// One monitor tick, run synchronously.
    pub fn refresh_controllers(&self) -> Result<Vec<DeviceEvent>, DeviceError> {
        self.inner.refresh_controllers()
    }

    /// Start re-scanning controllers, replacing any running monitor.
    pub fn start_monitor(&mut self) -> io::Result<()> {
        self.stop_monitor();

        let inner = Arc::clone(&self.inner);
        let interval = self.interval;
        let backoff = self.backoff;
        let handle = WorkerHandle::spawn(
            "device-monitor",
            interval,
            backoff,
            Arc::clone(&self.monitor_live),
            move || match inner.refresh_controllers() {
                Ok(events) => {
                    if !events.is_empty() {
                        debug!("Device monitor: {} changes", events.len());
                    }
                    interval
                }
                Err(e) => {
                    warn!("Device scan failed, retrying in {:?}: {}", backoff, e);
                    backoff
                }
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

    pub fn monitoring(&self) -> bool {
        self.monitor.as_ref().is_some_and(WorkerHandle::is_alive)
    }

    pub fn live_monitor_workers(&self) -> usize {
        self.monitor_live.load(Ordering::SeqCst)
    }

    pub fn controllers(&self) -> Vec<DeviceRecord> {
        read_recover(&self.inner.table, "device table").controllers.clone()
    }

    /// Logical buttons from the `index`th tracked controller.
    ///
    /// `None` when there is no such controller or it has since detached.
    pub fn read_active_input(&self, index: usize) -> Option<ControlState> {
        let id = read_recover(&self.inner.table, "device table")
            .controllers
            .get(index)
            .map(|record| record.id.clone())?;
        let pad = self.inner.backend.poll(&id)?;
        Some(mapping::control_state(&pad, self.inner.deadzone))
    }

    pub fn status(&self) -> DeviceStatus {
        let table = read_recover(&self.inner.table, "device table");
        DeviceStatus {
            controllers: table.controllers.clone(),
            audio_sinks: table.audio.clone(),
            monitoring: self.monitoring(),
            recent_events: table.events.iter().cloned().collect(),
        }
    }
}

impl Drop for DeviceRegistry {
    fn drop(&mut self) {
        self.stop_monitor();
    }
}

fn sink_record(sink: &AudioSink) -> DeviceRecord {
    DeviceRecord {
        id: sink.id().to_string(),
        name: sink.name.clone(),
        kind: DeviceKind::Audio,
        family: sink.family,
        connected: sink.connected,
        guid: None,
        address: sink.address.clone(),
    }
}
