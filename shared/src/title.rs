//! Title identity.
//!
//! The runtime never looks inside a ROM. A title is identified by a content
//! hash computed by whoever acquired the ROM; [`TitleId::from_rom_bytes`] is
//! the default scheme used by the launcher.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Number of hex characters kept from the content digest
pub const TITLE_ID_LEN: usize = 16;

/// Stable identifier for a loaded title.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TitleId(String);

impl TitleId {
    /// Wrap an externally computed id.
    ///
    /// Ids are used verbatim in file names, so anything outside
    /// `[A-Za-z0-9_-]` is replaced with `_`.
    pub fn new(id: impl AsRef<str>) -> Self {
        let sanitized = id
            .as_ref()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        Self(sanitized)
    }

    /// Hash ROM contents into a title id.
    pub fn from_rom_bytes(bytes: &[u8]) -> Self {
        let digest = hex::encode(Sha256::digest(bytes));
        Self(digest[..TITLE_ID_LEN].to_string())
    }

    /// Hash the ROM at `path`, falling back to its file name when unreadable.
    pub fn from_rom_path(path: &Path) -> Self {
        match std::fs::read(path) {
            Ok(bytes) => Self::from_rom_bytes(&bytes),
            Err(_) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                Self::from_rom_bytes(name.as_bytes())
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TitleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A title handed to the runtime by the acquisition layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleInfo {
    pub id: TitleId,
    /// Human-readable name for the HUD
    pub name: String,
}

impl TitleInfo {
    pub fn new(id: TitleId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Identify a ROM file: content hash for the id, file stem for the name.
    pub fn from_rom_path(path: &Path) -> Self {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "untitled".to_string());
        Self::new(TitleId::from_rom_path(path), name)
    }
}
