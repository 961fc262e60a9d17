//! Bluetooth audio sink discovery through platform shell tools
//!
//! | Platform | Scan                                         | Connect                 |
//! |----------|----------------------------------------------|-------------------------|
//! | Linux    | `bluetoothctl devices` + `bluetoothctl info` | `bluetoothctl connect`  |
//! | macOS    | `system_profiler SPBluetoothDataType -json`  | left to the OS          |
//! | Windows  | PowerShell `Get-PnpDevice` as JSON           | left to the OS          |
//! | other    | nothing                                      | nothing                 |

use std::process::Command;

use serde_json::Value;
use tracing::{debug, info};

use super::DeviceError;
use super::classify::{AUDIO_FAMILIES, classify};

const PNP_QUERY: &str = "Get-PnpDevice | Where-Object {$_.Class -eq 'Bluetooth' -and $_.Status -eq 'OK'} | Select-Object FriendlyName, Status | ConvertTo-Json";

/// Captured result of one shell command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ShellOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Runs platform tools. Only the exit status and text output are used.
pub trait Shell: Send + Sync {
    fn run(&self, program: &str, args: &[&str]) -> Result<ShellOutput, DeviceError>;

    /// Whether `program` can be found on `PATH`
    fn available(&self, program: &str) -> bool;
}

/// Spawns real processes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemShell;

impl Shell for SystemShell {
    fn run(&self, program: &str, args: &[&str]) -> Result<ShellOutput, DeviceError> {
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|source| DeviceError::Shell {
                program: program.to_string(),
                source,
            })?;
        Ok(ShellOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn available(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "linux") {
            Platform::Linux
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else {
            Platform::Other
        }
    }
}

/// One Bluetooth device as reported by the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSink {
    pub name: String,
    pub family: &'static str,
    pub connected: bool,
    /// MAC address where the platform exposes one
    pub address: Option<String>,
}

impl AudioSink {
    fn new(name: &str, connected: bool, address: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            family: classify(name, AUDIO_FAMILIES),
            connected,
            address,
        }
    }

    /// Registry key: the address if known, otherwise the name
    pub fn id(&self) -> &str {
        self.address.as_deref().unwrap_or(&self.name)
    }
}

/// Enumerate Bluetooth devices on `platform`.
pub fn scan(shell: &dyn Shell, platform: Platform) -> Result<Vec<AudioSink>, DeviceError> {
    match platform {
        Platform::Linux => scan_linux(shell),
        Platform::MacOs => {
            let out = checked(shell, "system_profiler", &["SPBluetoothDataType", "-json"])?;
            parse_system_profiler(&out.stdout)
        }
        Platform::Windows => {
            let out = checked(shell, "powershell", &["-NoProfile", "-Command", PNP_QUERY])?;
            parse_pnp_devices(&out.stdout)
        }
        Platform::Other => Ok(Vec::new()),
    }
}

/// Ask the platform to connect `sink`. `Ok(false)` means the tool refused.
pub fn connect(shell: &dyn Shell, platform: Platform, sink: &AudioSink) -> Result<bool, DeviceError> {
    match platform {
        Platform::Linux => {
            let Some(address) = sink.address.as_deref() else {
                return Ok(false);
            };
            let out = shell.run("bluetoothctl", &["connect", address])?;
            if !out.success() {
                debug!("bluetoothctl connect {} failed: {}", address, out.stderr.trim());
            }
            Ok(out.success())
        }
        Platform::MacOs | Platform::Windows => {
            info!("Connect '{}' from the system Bluetooth settings", sink.name);
            Ok(true)
        }
        Platform::Other => Ok(false),
    }
}

fn checked(shell: &dyn Shell, program: &str, args: &[&str]) -> Result<ShellOutput, DeviceError> {
    let out = shell.run(program, args)?;
    if !out.success() {
        return Err(DeviceError::ScanFailure(format!(
            "{} exited with {}: {}",
            program,
            out.status,
            out.stderr.trim()
        )));
    }
    Ok(out)
}

fn scan_linux(shell: &dyn Shell) -> Result<Vec<AudioSink>, DeviceError> {
    if !shell.available("bluetoothctl") {
        debug!("bluetoothctl not on PATH, skipping audio scan");
        return Ok(Vec::new());
    }

    let out = checked(shell, "bluetoothctl", &["devices"])?;
    let sinks = parse_bluetoothctl_devices(&out.stdout)
        .into_iter()
        .map(|(address, name)| {
            let connected = shell
                .run("bluetoothctl", &["info", &address])
                .map(|info| info.success() && info.stdout.contains("Connected: yes"))
                .unwrap_or(false);
            AudioSink::new(&name, connected, Some(address))
        })
        .collect();
    Ok(sinks)
}

/// `Device AA:BB:CC:DD:EE:FF Some Name` lines into `(address, name)`
pub fn parse_bluetoothctl_devices(stdout: &str) -> Vec<(String, String)> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut parts = line.trim().splitn(3, ' ');
            match (parts.next(), parts.next(), parts.next()) {
                (Some("Device"), Some(address), Some(name)) if !name.is_empty() => {
                    Some((address.to_string(), name.to_string()))
                }
                _ => None,
            }
        })
        .collect()
}

/// Parse `system_profiler SPBluetoothDataType -json`.
///
/// Accepts both the flat `{"_name": ..}` entries and the keyed
/// `{"<name>": {..}}` entries different macOS releases emit.
pub fn parse_system_profiler(stdout: &str) -> Result<Vec<AudioSink>, DeviceError> {
    let root: Value = serde_json::from_str(stdout)
        .map_err(|e| DeviceError::ScanFailure(format!("system_profiler output: {}", e)))?;

    let mut sinks = Vec::new();
    let sections = root["SPBluetoothDataType"].as_array().cloned().unwrap_or_default();
    for section in &sections {
        for list_key in ["device_title", "device_connected", "device_not_connected"] {
            let Some(entries) = section[list_key].as_array() else {
                continue;
            };
            for entry in entries {
                if let Some(name) = entry["_name"].as_str() {
                    let connected = entry["device_isconnected"].as_str() == Some("Yes")
                        || list_key == "device_connected";
                    sinks.push(AudioSink::new(name, connected, None));
                } else if let Some(map) = entry.as_object() {
                    for (name, info) in map {
                        let address = info["device_address"].as_str().map(str::to_string);
                        let connected = info["device_isconnected"].as_str() == Some("Yes")
                            || list_key == "device_connected";
                        sinks.push(AudioSink::new(name, connected, address));
                    }
                }
            }
        }
    }
    Ok(sinks)
}

/// Parse PowerShell `ConvertTo-Json` output (an object or a list of them).
pub fn parse_pnp_devices(stdout: &str) -> Result<Vec<AudioSink>, DeviceError> {
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }
    let root: Value = serde_json::from_str(stdout)
        .map_err(|e| DeviceError::ScanFailure(format!("Get-PnpDevice output: {}", e)))?;

    let entries = match root {
        Value::Array(items) => items,
        single => vec![single],
    };
    Ok(entries
        .iter()
        .map(|entry| {
            let name = entry["FriendlyName"].as_str().unwrap_or("Unknown");
            AudioSink::new(name, entry["Status"].as_str() == Some("OK"), None)
        })
        .collect())
}
