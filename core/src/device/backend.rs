//! Controller enumeration seam
//!
//! The monitor thread only ever talks to an [`InputBackend`]. The desktop
//! build fills a [`PadTable`] from gilrs on the loop thread; tests fill one
//! by hand.

use std::sync::{Arc, RwLock};

use super::DeviceError;
use crate::worker::{read_recover, write_recover};

/// Identity and current readings of one controller
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PadSnapshot {
    /// Stable for as long as the controller stays attached
    pub id: String,
    pub name: String,
    pub guid: String,
    /// Normalized -1.0..=1.0; index 0 is X, 1 is Y (negative = up)
    pub axes: Vec<f32>,
    pub buttons: Vec<bool>,
    /// `(x, y)` with y = 1 meaning up
    pub hats: Vec<(i8, i8)>,
}

/// OS input subsystem as seen by the registry
pub trait InputBackend: Send + Sync {
    /// Number of attached controllers
    fn count(&self) -> Result<usize, DeviceError>;

    /// Controller at position `index` in enumeration order
    fn open(&self, index: usize) -> Result<PadSnapshot, DeviceError>;

    /// Latest readings for `id`, or `None` once it is gone
    fn poll(&self, id: &str) -> Option<PadSnapshot>;
}

/// Shared, lock-protected list of attached controllers
#[derive(Debug, Clone, Default)]
pub struct PadTable {
    pads: Arc<RwLock<Vec<PadSnapshot>>>,
}

impl PadTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole table (one pump of the OS backend)
    pub fn replace(&self, pads: Vec<PadSnapshot>) {
        *write_recover(&self.pads, "pad table") = pads;
    }

    /// Insert or update a controller, keeping its position
    pub fn upsert(&self, pad: PadSnapshot) {
        let mut pads = write_recover(&self.pads, "pad table");
        match pads.iter_mut().find(|p| p.id == pad.id) {
            Some(existing) => *existing = pad,
            None => pads.push(pad),
        }
    }

    pub fn remove(&self, id: &str) -> bool {
        let mut pads = write_recover(&self.pads, "pad table");
        let before = pads.len();
        pads.retain(|p| p.id != id);
        pads.len() != before
    }

    pub fn len(&self) -> usize {
        read_recover(&self.pads, "pad table").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl InputBackend for PadTable {
    fn count(&self) -> Result<usize, DeviceError> {
        Ok(self.len())
    }

    fn open(&self, index: usize) -> Result<PadSnapshot, DeviceError> {
        read_recover(&self.pads, "pad table")
            .get(index)
            .cloned()
            .ok_or_else(|| DeviceError::ScanFailure(format!("controller {} detached during scan", index)))
    }

    fn poll(&self, id: &str) -> Option<PadSnapshot> {
        read_recover(&self.pads, "pad table")
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }
}
