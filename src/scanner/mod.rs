pub mod control;
pub mod probe;
pub mod progress;
pub mod types;

use std::fs;
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use jwalk::{Parallelism, WalkDir};

use crate::config::ScanConfig;

pub use control::ScanControl;
pub use types::{FileRecord, ScanError, ScanEvent, ScanProgress, ScanRequest};

use progress::ProgressTracker;

/// Outcome of the enumeration phase.
enum Enumeration {
    Candidates(Vec<FileRecord>),
    Cancelled,
    Failed(ScanError),
}

/// Run a scan on the current thread, handing every event to `sink`.
///
/// Per-file failures are skipped. The last event is always `Completed`,
/// `Cancelled` or `Failed`.
pub fn run_scan<F>(request: &ScanRequest, config: &ScanConfig, control: &ScanControl, mut sink: F)
where
    F: FnMut(ScanEvent),
{
    let root = request.root();
    tracing::info!(
        "Scanning {} for files over {} GiB (filter: {:?})",
        root.display(),
        request.threshold_gib(),
        request.filter().suffixes().collect::<Vec<_>>()
    );
    sink(ScanEvent::Started {
        root: root.to_path_buf(),
    });

    let start = Instant::now();
    let candidates = match enumerate(request, control) {
        Enumeration::Candidates(candidates) => candidates,
        Enumeration::Cancelled => {
            tracing::info!("Scan cancelled during enumeration");
            sink(ScanEvent::Cancelled);
            return;
        }
        Enumeration::Failed(e) => {
            tracing::warn!("Scan failed: {}", e);
            sink(ScanEvent::Failed(e));
            return;
        }
    };

    let total = candidates.len();
    tracing::info!(
        "Enumeration finished in {:.2}s: {} candidates",
        start.elapsed().as_secs_f64(),
        total
    );
    sink(ScanEvent::Enumerated { candidates: total });

    if total == 0 {
        sink(ScanEvent::Progress(progress::empty_result()));
        sink(ScanEvent::Completed { total_found: 0 });
        return;
    }

    let mut tracker = ProgressTracker::new(total);
    for (i, record) in candidates.into_iter().enumerate() {
        if i > 0 && !config.pace().is_zero() && !control.sleep_unless_cancelled(config.pace()) {
            tracing::info!("Scan cancelled after {} of {} files", i, total);
            sink(ScanEvent::Cancelled);
            return;
        }
        if !control.wait_while_paused(config.pause_poll()) {
            tracing::info!("Scan cancelled after {} of {} files", i, total);
            sink(ScanEvent::Cancelled);
            return;
        }

        let name = record.name.clone();
        sink(ScanEvent::FileDiscovered(record));
        sink(ScanEvent::Progress(tracker.advance(&name)));
    }

    tracing::info!(
        "Scan completed: {} files in {:.2}s",
        total,
        start.elapsed().as_secs_f64()
    );
    sink(ScanEvent::Completed { total_found: total });
}

/// Run a scan to completion and collect its events.
pub fn run_scan_blocking(request: &ScanRequest, config: &ScanConfig) -> Vec<ScanEvent> {
    let control = ScanControl::new();
    let mut events = Vec::new();
    run_scan(request, config, &control, |event| events.push(event));
    events
}

/// Walk the tree sequentially and collect every file that passes the
/// extension filter and is strictly larger than the threshold.
fn enumerate(request: &ScanRequest, control: &ScanControl) -> Enumeration {
    let root = request.root();

    // Only the root is fatal; unreadable subdirectories are skipped by the walk.
    if let Err(source) = fs::read_dir(root) {
        return Enumeration::Failed(ScanError::RootUnreadable {
            path: root.to_path_buf(),
            source,
        });
    }

    let walker = WalkDir::new(root)
        .parallelism(Parallelism::Serial)
        .sort(true)
        .skip_hidden(false)
        .follow_links(false);

    let mut candidates = Vec::new();
    let mut files_seen: u64 = 0;
    let mut skipped: u64 = 0;

    for entry in walker {
        if control.is_cancelled() {
            return Enumeration::Cancelled;
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("Skipping unreadable entry: {}", e);
                skipped += 1;
                continue;
            }
        };

        if entry.file_type().is_dir() {
            continue;
        }
        files_seen += 1;

        let name = entry.file_name().to_string_lossy();
        if !request.filter().matches(&name) {
            continue;
        }

        let path = entry.path();
        let size = match probe::probe(&path) {
            Ok(size) => size,
            Err(e) => {
                tracing::debug!("Skipping: {}", e);
                skipped += 1;
                continue;
            }
        };

        if size.gib() > request.threshold_gib() {
            candidates.push(FileRecord::new(path, size.bytes));
        }
    }

    tracing::debug!(
        "Walked {} files, skipped {} inaccessible entries",
        files_seen,
        skipped
    );
    Enumeration::Candidates(candidates)
}

/// Cloneable handle to a running scan's control surface.
#[derive(Debug, Clone)]
pub struct ScanController {
    control: Arc<ScanControl>,
}

impl ScanController {
    pub fn cancel(&self) {
        self.control.cancel();
    }

    pub fn pause(&self) {
        self.control.pause();
    }

    pub fn resume(&self) {
        self.control.resume();
    }

    pub fn is_paused(&self) -> bool {
        self.control.is_paused()
    }

    pub fn is_cancelled(&self) -> bool {
        self.control.is_cancelled()
    }
}

/// A scan running on a background thread.
///
/// Events arrive on `receiver()` in order. Dropping the session cancels the
/// scan and waits for the thread to exit.
pub struct ScanSession {
    receiver: mpsc::Receiver<ScanEvent>,
    controller: ScanController,
    join: Option<JoinHandle<()>>,
}

impl ScanSession {
    pub fn receiver(&self) -> &mpsc::Receiver<ScanEvent> {
        &self.receiver
    }

    /// Blocking iterator over events; ends when the scan thread exits.
    pub fn events(&self) -> mpsc::Iter<'_, ScanEvent> {
        self.receiver.iter()
    }

    pub fn controller(&self) -> ScanController {
        self.controller.clone()
    }

    pub fn cancel(&self) {
        self.controller.cancel();
    }

    pub fn pause(&self) {
        self.controller.pause();
    }

    pub fn resume(&self) {
        self.controller.resume();
    }

    pub fn is_paused(&self) -> bool {
        self.controller.is_paused()
    }

    /// Wait for the scan thread to finish. Pending events stay readable.
    pub fn join(&mut self) {
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                tracing::error!("Scan thread panicked");
            }
        }
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        self.cancel();
        self.join();
    }
}

/// Start scanning in a background thread.
pub fn start(request: ScanRequest, config: ScanConfig) -> ScanSession {
    let (tx, rx) = mpsc::channel();
    let control = Arc::new(ScanControl::new());
    let thread_control = Arc::clone(&control);

    let join = thread::spawn(move || {
        run_scan(&request, &config, &thread_control, |event| {
            // Consumer went away: stop at the next checkpoint.
            if tx.send(event).is_err() {
                thread_control.cancel();
            }
        });
    });

    ScanSession {
        receiver: rx,
        controller: ScanController { control },
        join: Some(join),
    }
}
