//! Checksummed snapshot envelope for persisted game state.
//!
//! The checksum is the SHA-256 of the compact JSON encoding of the
//! [`GameState`] and is recomputed on every decode. A snapshot is only ever
//! accepted if the stored and recomputed digests agree.
//!
//! On disk a snapshot is a JSON object:
//!
//! ```json
//! {"timestamp": 1719400000.5, "datetime": "2024-06-26T11:06:40+00:00",
//!  "game_state": {...}, "version": "1.0", "checksum": "9f86d0..."}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::game_state::GameState;

/// Snapshot format version written by this build
pub const FORMAT_VERSION: &str = "1.0";

/// A serialized, checksummed copy of [`GameState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Unix seconds when the snapshot was taken
    pub timestamp: f64,
    /// RFC 3339 rendering of `timestamp`
    #[serde(rename = "datetime")]
    pub iso_time: String,
    pub game_state: GameState,
    #[serde(rename = "version")]
    pub format_version: String,
    /// Lowercase hex SHA-256 of the canonical `game_state` encoding
    pub checksum: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("snapshot checksum mismatch (stored {stored}, computed {computed})")]
    CorruptSnapshot { stored: String, computed: String },

    #[error("unsupported snapshot format version '{0}'")]
    UnsupportedVersion(String),

    #[error("snapshot is not a valid envelope: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl CodecError {
    /// True for failures caused by damaged bytes rather than a newer format.
    pub fn is_corruption(&self) -> bool {
        matches!(self, CodecError::CorruptSnapshot { .. } | CodecError::Malformed(_))
    }
}

/// Canonical byte encoding used for the checksum.
pub fn canonical_bytes(state: &GameState) -> Result<Vec<u8>, CodecError> {
    Ok(serde_json::to_vec(state)?)
}

/// Hex SHA-256 over the canonical encoding of `state`.
pub fn checksum(state: &GameState) -> Result<String, CodecError> {
    let mut hasher = Sha256::new();
    hasher.update(canonical_bytes(state)?);
    Ok(hex::encode(hasher.finalize()))
}

/// Deep-copy `state` into a snapshot stamped with the current time.
pub fn encode(state: &GameState) -> Result<Snapshot, CodecError> {
    encode_at(state, Utc::now())
}

/// Deep-copy `state` into a snapshot stamped with `now`.
pub fn encode_at(state: &GameState, now: DateTime<Utc>) -> Result<Snapshot, CodecError> {
    let game_state = state.clone();
    let checksum = checksum(&game_state)?;
    Ok(Snapshot {
        timestamp: now.timestamp_millis() as f64 / 1000.0,
        iso_time: now.to_rfc3339(),
        game_state,
        format_version: FORMAT_VERSION.to_string(),
        checksum,
    })
}

/// Verify `snapshot` and return its game state.
///
/// The version is checked first so a newer envelope is reported as
/// unsupported rather than corrupt.
pub fn decode(snapshot: &Snapshot) -> Result<GameState, CodecError> {
    if snapshot.format_version != FORMAT_VERSION {
        return Err(CodecError::UnsupportedVersion(snapshot.format_version.clone()));
    }

    let computed = checksum(&snapshot.game_state)?;
    if !computed.eq_ignore_ascii_case(&snapshot.checksum) {
        return Err(CodecError::CorruptSnapshot {
            stored: snapshot.checksum.clone(),
            computed,
        });
    }

    Ok(snapshot.game_state.clone())
}

/// Serialize a snapshot to its on-disk JSON envelope.
pub fn to_bytes(snapshot: &Snapshot) -> Result<Vec<u8>, CodecError> {
    Ok(serde_json::to_vec_pretty(snapshot)?)
}

/// Parse an on-disk envelope. Does not verify the checksum; see [`decode`].
pub fn from_bytes(bytes: &[u8]) -> Result<Snapshot, CodecError> {
    Ok(serde_json::from_slice(bytes)?)
}
