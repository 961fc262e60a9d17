//! Shared test utilities for unit and integration tests

use std::collections::VecDeque;
use std::io;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use hashbrown::{HashMap, HashSet};

use crate::device::DeviceError;
use crate::device::audio::{Shell, ShellOutput};
use crate::device::backend::{InputBackend, PadSnapshot, PadTable};
use crate::hud::HudStatus;
use crate::input::KeyboardState;
use crate::render::Frame;
use crate::runtime::{Frontend, FrontendEvent};

/// Poll `cond` until it holds or five seconds pass
pub fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

// ============================================================================
// Scripted shell
// ============================================================================

/// Shell that answers from a table of canned responses
///
/// Commands are keyed by `program` and `args` joined with single spaces.
/// Anything not scripted fails as if the program were missing.
#[derive(Default)]
pub struct ScriptedShell {
    programs: HashSet<String>,
    responses: Mutex<HashMap<String, ShellOutput>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedShell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `program` as present on `PATH`
    pub fn with_program(mut self, program: &str) -> Self {
        self.programs.insert(program.to_string());
        self
    }

    pub fn respond(self, command: &str, status: i32, stdout: &str) -> Self {
        self.rescript(command, status, stdout);
        self
    }

    /// Replace the response for `command` on a shared shell
    pub fn rescript(&self, command: &str, status: i32, stdout: &str) {
        self.responses.lock().unwrap().insert(
            command.to_string(),
            ShellOutput {
                status,
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        );
    }

    /// Every command run so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Shell for ScriptedShell {
    fn run(&self, program: &str, args: &[&str]) -> Result<ShellOutput, DeviceError> {
        let mut command = program.to_string();
        for arg in args {
            command.push(' ');
            command.push_str(arg);
        }
        self.calls.lock().unwrap().push(command.clone());

        self.responses
            .lock()
            .unwrap()
            .get(&command)
            .cloned()
            .ok_or_else(|| DeviceError::Shell {
                program: program.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "not scripted"),
            })
    }

    fn available(&self, program: &str) -> bool {
        self.programs.contains(program)
    }
}

// ============================================================================
// Controller backends
// ============================================================================

/// A pad with a name, a GUID and everything centered
pub fn test_pad(id: &str, name: &str) -> PadSnapshot {
    PadSnapshot {
        id: id.to_string(),
        name: name.to_string(),
        guid: format!("guid-{}", id),
        axes: vec![0.0, 0.0],
        buttons: vec![false; 4],
        hats: vec![(0, 0)],
    }
}

/// Wraps a [`PadTable`] and can be told to fail enumeration
#[derive(Default)]
pub struct FlakyBackend {
    pub pads: PadTable,
    failing: AtomicBool,
}

impl FlakyBackend {
    pub fn new(pads: PadTable) -> Self {
        Self {
            pads,
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl InputBackend for FlakyBackend {
    fn count(&self) -> Result<usize, DeviceError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DeviceError::ScanFailure("input subsystem unavailable".into()));
        }
        self.pads.count()
    }

    fn open(&self, index: usize) -> Result<PadSnapshot, DeviceError> {
        self.pads.open(index)
    }

    fn poll(&self, id: &str) -> Option<PadSnapshot> {
        self.pads.poll(id)
    }
}

// ============================================================================
// Front-end
// ============================================================================

/// Front-end that replays one list of events per frame, then quits
#[derive(Default)]
pub struct ScriptedFrontend {
    frames: VecDeque<Vec<FrontendEvent>>,
    pub presented: usize,
    pub last_hud: Option<HudStatus>,
}

impl ScriptedFrontend {
    pub fn new(frames: Vec<Vec<FrontendEvent>>) -> Self {
        Self {
            frames: frames.into(),
            ..Self::default()
        }
    }
}

impl Frontend for ScriptedFrontend {
    fn poll(&mut self, _keys: &mut KeyboardState) -> Vec<FrontendEvent> {
        self.frames
            .pop_front()
            .unwrap_or_else(|| vec![FrontendEvent::Quit])
    }

    fn present(&mut self, _frame: &Frame, hud: &HudStatus) -> anyhow::Result<()> {
        self.presented += 1;
        self.last_hud = Some(hud.clone());
        Ok(())
    }
}
