//! Filesystem helpers shared by the save and cheat stores.

use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Maximum size accepted when reading a snapshot, index or cheat table.
pub const MAX_RECORD_BYTES: u64 = 16 * 1024 * 1024; // 16 MiB

/// Read a file into memory with a size cap.
pub fn read_with_limit(path: &Path, max_bytes: u64) -> io::Result<Vec<u8>> {
    let len = fs::metadata(path)?.len();
    if len > max_bytes {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "file too large: {} ({} bytes, max {} bytes)",
                path.display(),
                len,
                max_bytes
            ),
        ));
    }
    fs::read(path)
}

fn tmp_path_for(path: &Path) -> io::Result<PathBuf> {
    match path.file_name() {
        Some(name) => {
            let mut tmp_name = OsString::from(name);
            tmp_name.push(".tmp");
            Ok(path.with_file_name(tmp_name))
        }
        None => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "destination path has no file name",
        )),
    }
}

/// Replace `path` with `bytes` via a synced temp file and a rename.
///
/// Readers see either the old contents or the new ones, never a prefix.
/// On failure the previous file is left in place.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = tmp_path_for(path)?;

    let written = (|| {
        let mut f = fs::File::create(&tmp_path)?;
        f.write_all(bytes)?;
        f.sync_all()
    })();
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    #[cfg(windows)]
    {
        if path.exists() {
            // Windows rename fails if destination exists.
            fs::remove_file(path)?;
        }
    }

    fs::rename(&tmp_path, path)
}
