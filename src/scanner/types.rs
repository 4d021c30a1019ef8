use std::io;
use std::path::{Path, PathBuf};

use compact_str::CompactString;

use crate::tree::extensions::ExtensionFilter;

/// Threshold used when the caller does not supply one (GiB).
pub const DEFAULT_THRESHOLD_GIB: f64 = 0.1;

/// Files above this size (GiB) are flagged for highlighting.
pub const LARGE_FILE_GIB: f64 = 5.0;

/// A file that passed the extension filter and the size threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    /// File name (last path component)
    pub name: CompactString,
    /// Absolute path to the file
    pub path: PathBuf,
    /// Raw size in bytes
    pub size_bytes: u64,
    /// Size in MiB (exact; displayed with two decimals)
    pub size_mib: f64,
    /// Size in GiB (exact; displayed with two decimals)
    pub size_gib: f64,
}

impl FileRecord {
    pub fn new(path: PathBuf, size_bytes: u64) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let size = super::probe::FileSize::from_bytes(size_bytes);

        Self {
            name: CompactString::new(&name),
            path,
            size_bytes,
            size_mib: size.mib(),
            size_gib: size.gib(),
        }
    }

    /// Directory containing this file.
    pub fn folder(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new(""))
    }

    pub fn is_large(&self) -> bool {
        self.size_gib > LARGE_FILE_GIB
    }
}

/// Everything that defines one scan. Validated at construction.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    root: PathBuf,
    threshold_gib: f64,
    filter: ExtensionFilter,
}

impl ScanRequest {
    pub fn new(
        root: impl Into<PathBuf>,
        threshold_gib: Option<f64>,
        filter: ExtensionFilter,
    ) -> Result<Self, ScanError> {
        let root = root.into();
        if root.as_os_str().is_empty() {
            return Err(ScanError::invalid("root directory is empty"));
        }

        let threshold_gib = threshold_gib.unwrap_or(DEFAULT_THRESHOLD_GIB);
        if !threshold_gib.is_finite() || threshold_gib <= 0.0 {
            return Err(ScanError::invalid(format!(
                "threshold must be a positive number of GiB, got {threshold_gib}"
            )));
        }

        if !root.is_dir() {
            return Err(ScanError::invalid(format!(
                "{} is not an existing directory",
                root.display()
            )));
        }

        // Lexical only: symlinked roots keep their spelling in emitted paths.
        let root = std::path::absolute(&root).map_err(|e| {
            ScanError::invalid(format!("cannot resolve {}: {e}", root.display()))
        })?;

        Ok(Self {
            root,
            threshold_gib,
            filter,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn threshold_gib(&self) -> f64 {
        self.threshold_gib
    }

    pub fn filter(&self) -> &ExtensionFilter {
        &self.filter
    }
}

/// Progress attached to each emitted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanProgress {
    /// 0..=100, integer truncated
    pub percent: u8,
    /// Human-readable status line
    pub message: String,
    /// Estimated seconds remaining
    pub eta_secs: u64,
}

impl ScanProgress {
    /// The ETA-only signal, e.g. for a window title.
    pub fn eta_label(&self) -> String {
        format!("ETA: ~{}s", self.eta_secs)
    }
}

/// Events streamed from a running scan to its consumer.
///
/// Every stream ends with exactly one of `Completed`, `Cancelled` or `Failed`.
#[derive(Debug)]
pub enum ScanEvent {
    /// Enumeration of the root began
    Started { root: PathBuf },
    /// Enumeration finished; emission of this many candidates follows
    Enumerated { candidates: usize },
    /// A qualifying file
    FileDiscovered(FileRecord),
    /// Emitted right after each `FileDiscovered`, or alone for an empty result
    Progress(ScanProgress),
    /// All candidates were emitted
    Completed { total_found: usize },
    /// The scan stopped on request
    Cancelled,
    /// The scan could not run at all
    Failed(ScanError),
}

impl ScanEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScanEvent::Completed { .. } | ScanEvent::Cancelled | ScanEvent::Failed(_)
        )
    }
}

/// Whole-scan errors.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("invalid scan request: {reason}")]
    InvalidRequest { reason: String },

    #[error("cannot read root directory {}: {source}", path.display())]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ScanError {
    fn invalid(reason: impl Into<String>) -> Self {
        ScanError::InvalidRequest {
            reason: reason.into(),
        }
    }
}
