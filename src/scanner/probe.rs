use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;
const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Size of a probed file, in binary units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileSize {
    pub bytes: u64,
}

impl FileSize {
    pub fn from_bytes(bytes: u64) -> Self {
        Self { bytes }
    }

    pub fn mib(self) -> f64 {
        self.bytes as f64 / BYTES_PER_MIB
    }

    pub fn gib(self) -> f64 {
        self.bytes as f64 / BYTES_PER_GIB
    }
}

/// Why a path was skipped. Never fatal to a scan.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("cannot stat {}: {source}", path.display())]
    Inaccessible {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} is not a regular file", path.display())]
    NotAFile { path: PathBuf },
}

/// Stat a path, following symlinks.
///
/// Permission errors, files deleted since listing and dangling links all
/// come back as `Inaccessible`.
pub fn probe(path: &Path) -> Result<FileSize, ProbeError> {
    let meta = fs::metadata(path).map_err(|source| ProbeError::Inaccessible {
        path: path.to_path_buf(),
        source,
    })?;

    if !meta.is_file() {
        return Err(ProbeError::NotAFile {
            path: path.to_path_buf(),
        });
    }

    Ok(FileSize::from_bytes(meta.len()))
}
