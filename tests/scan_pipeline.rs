use std::collections::BTreeSet;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use bigfiles_rs::config::ScanConfig;
use bigfiles_rs::scanner::{self, ScanControl, ScanError, ScanEvent, ScanRequest};
use bigfiles_rs::tree::extensions::ExtensionFilter;
use bigfiles_rs::tree::FolderIndex;

const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * MIB;
/// One MiB expressed in GiB
const ONE_MIB_GIB: f64 = 1.0 / 1024.0;

/// Create a sparse file of the given length, creating parents as needed.
fn sparse(root: &Path, rel: &str, len: u64) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    File::create(&path).unwrap().set_len(len).unwrap();
    path
}

fn request(root: &Path, threshold: f64, filter: &str) -> ScanRequest {
    ScanRequest::new(root, Some(threshold), ExtensionFilter::parse(filter)).unwrap()
}

fn discovered(events: &[ScanEvent]) -> Vec<PathBuf> {
    events
        .iter()
        .filter_map(|e| match e {
            ScanEvent::FileDiscovered(r) => Some(r.path.clone()),
            _ => None,
        })
        .collect()
}

fn percents(events: &[ScanEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|e| match e {
            ScanEvent::Progress(p) => Some(p.percent),
            _ => None,
        })
        .collect()
}

/// Mixed tree used by several tests.
fn fixture() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    sparse(root, "movies/a.mp4", 3 * MIB);
    sparse(root, "movies/b.MP4", 5 * MIB);
    sparse(root, "movies/tiny.mp4", MIB / 2);
    sparse(root, "movies/notes.txt", 4 * MIB);
    sparse(root, "archive/old.zip", 2 * MIB);
    sparse(root, "archive/deep/nested/clip.mp4", 6 * MIB);
    sparse(root, "archive/deep/exact.mp4", MIB);
    sparse(root, "top.bin", 8 * MIB);
    sparse(root, ".hidden/secret.mp4", 9 * MIB);
    dir
}

/// Independent filter-and-threshold pass using plain recursion.
fn reference(root: &Path, threshold_gib: f64, filter: &ExtensionFilter) -> BTreeSet<PathBuf> {
    let mut out = BTreeSet::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let entry = entry.unwrap();
            let path = entry.path();
            let meta = fs::metadata(&path).unwrap();
            if meta.is_dir() {
                stack.push(path);
            } else if filter.matches(&entry.file_name().to_string_lossy())
                && meta.len() as f64 / GIB as f64 > threshold_gib
            {
                out.insert(path);
            }
        }
    }
    out
}

#[test]
fn emits_exactly_the_files_above_threshold() {
    let dir = fixture();
    let req = request(dir.path(), ONE_MIB_GIB, "");
    let events = scanner::run_scan_blocking(&req, &ScanConfig::immediate());

    let found = discovered(&events);
    let unique: BTreeSet<_> = found.iter().cloned().collect();
    assert_eq!(unique.len(), found.len(), "no duplicates");
    assert_eq!(unique, reference(req.root(), ONE_MIB_GIB, req.filter()));

    // exactly 1 MiB is not strictly above the threshold
    assert!(!unique.iter().any(|p| p.ends_with("exact.mp4")));
    assert!(unique.iter().any(|p| p.ends_with(".hidden/secret.mp4")));

    for event in &events {
        if let ScanEvent::FileDiscovered(r) = event {
            assert!(r.size_bytes as f64 / GIB as f64 > ONE_MIB_GIB);
            assert!(r.size_gib > req.threshold_gib());
            assert!(r.path.is_absolute());
        }
    }
}

#[test]
fn extension_filter_is_a_case_insensitive_suffix_test() {
    let dir = fixture();
    let req = request(dir.path(), ONE_MIB_GIB, ".mp4");
    let events = scanner::run_scan_blocking(&req, &ScanConfig::immediate());

    let names: BTreeSet<String> = discovered(&events)
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    let expected: BTreeSet<String> = ["a.mp4", "b.MP4", "clip.mp4", "secret.mp4"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(names, expected);
    assert_eq!(
        discovered(&events).into_iter().collect::<BTreeSet<_>>(),
        reference(req.root(), ONE_MIB_GIB, req.filter())
    );
}

#[test]
fn stream_shape_and_progress() {
    let dir = fixture();
    let req = request(dir.path(), ONE_MIB_GIB, "");
    let events = scanner::run_scan_blocking(&req, &ScanConfig::immediate());

    assert!(matches!(events.first(), Some(ScanEvent::Started { .. })));
    let total = discovered(&events).len();
    assert!(events
        .iter()
        .any(|e| matches!(e, ScanEvent::Enumerated { candidates } if *candidates == total)));
    assert!(matches!(
        events.last(),
        Some(ScanEvent::Completed { total_found }) if *total_found == total
    ));
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);

    // every discovery is followed directly by its progress event
    for (i, event) in events.iter().enumerate() {
        if matches!(event, ScanEvent::FileDiscovered(_)) {
            assert!(matches!(events[i + 1], ScanEvent::Progress(_)));
        }
    }

    let p = percents(&events);
    assert_eq!(p.len(), total);
    assert!(p.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(p.last(), Some(&100));

    let last_progress = events.iter().rev().find_map(|e| match e {
        ScanEvent::Progress(p) => Some(p),
        _ => None,
    });
    let message = &last_progress.unwrap().message;
    assert!(message.contains(&format!("{} of {}", total, total)), "{message}");
    assert!(message.ends_with("s left"));
}

#[test]
fn big_file_scenario() {
    let dir = TempDir::new().unwrap();
    sparse(dir.path(), "big.mp4", 2 * GIB);
    sparse(dir.path(), "small.txt", GIB / 100);

    let req = request(dir.path(), 1.0, "");
    let events = scanner::run_scan_blocking(&req, &ScanConfig::immediate());

    let records: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            ScanEvent::FileDiscovered(r) => Some(r),
            _ => None,
        })
        .collect();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "big.mp4");
    assert_eq!(records[0].size_gib, 2.0);
    assert_eq!(records[0].size_mib, 2048.0);
    assert!(matches!(
        events.last(),
        Some(ScanEvent::Completed { total_found: 1 })
    ));
}

#[test]
fn records_just_over_the_default_threshold_keep_their_exact_size() {
    let dir = TempDir::new().unwrap();
    // 0.102 GiB: above 0.1 GiB, but "0.10" once shown with two decimals
    let bytes = (0.102 * GIB as f64) as u64;
    sparse(dir.path(), "clip.mp4", bytes);
    sparse(dir.path(), "under.mp4", GIB / 10);

    let req = ScanRequest::new(dir.path(), None, ExtensionFilter::default()).unwrap();
    let events = scanner::run_scan_blocking(&req, &ScanConfig::immediate());

    let records: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            ScanEvent::FileDiscovered(r) => Some(r),
            _ => None,
        })
        .collect();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "clip.mp4");
    assert_eq!(records[0].size_bytes, bytes);
    assert!(records[0].size_gib > req.threshold_gib());
}

#[test]
fn empty_directory_reports_no_files() {
    let dir = TempDir::new().unwrap();
    let req = request(dir.path(), 0.5, "");
    let events = scanner::run_scan_blocking(&req, &ScanConfig::immediate());

    assert!(discovered(&events).is_empty());
    let n = events.len();
    match &events[n - 2] {
        ScanEvent::Progress(p) => {
            assert_eq!(p.percent, 100);
            assert!(p.message.starts_with("No files found"));
        }
        other => panic!("expected progress, got {other:?}"),
    }
    assert!(matches!(events[n - 1], ScanEvent::Completed { total_found: 0 }));
}

#[test]
fn vanished_root_is_a_distinct_failure() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("gone");
    fs::create_dir(&root).unwrap();
    sparse(&root, "a.bin", 4 * MIB);
    let req = request(&root, ONE_MIB_GIB, "");
    fs::remove_dir_all(&root).unwrap();

    let events = scanner::run_scan_blocking(&req, &ScanConfig::immediate());
    assert!(discovered(&events).is_empty());
    assert!(matches!(
        events.last(),
        Some(ScanEvent::Failed(ScanError::RootUnreadable { .. }))
    ));
    assert!(!events
        .iter()
        .any(|e| matches!(e, ScanEvent::Completed { .. } | ScanEvent::Cancelled)));
}

#[cfg(unix)]
#[test]
fn unreadable_root_is_a_distinct_failure() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let root = dir.path().join("locked");
    fs::create_dir(&root).unwrap();
    sparse(&root, "a.bin", 4 * MIB);
    let req = request(&root, ONE_MIB_GIB, "");
    fs::set_permissions(&root, fs::Permissions::from_mode(0o000)).unwrap();

    // Permission bits do not stop a privileged user.
    if fs::read_dir(&root).is_ok() {
        fs::set_permissions(&root, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let events = scanner::run_scan_blocking(&req, &ScanConfig::immediate());
    fs::set_permissions(&root, fs::Permissions::from_mode(0o755)).unwrap();

    assert!(discovered(&events).is_empty());
    match events.last() {
        Some(ScanEvent::Failed(ScanError::RootUnreadable { path, source })) => {
            assert_eq!(path, req.root());
            assert_eq!(source.kind(), std::io::ErrorKind::PermissionDenied);
        }
        other => panic!("expected RootUnreadable, got {other:?}"),
    }
    assert!(!events
        .iter()
        .any(|e| matches!(e, ScanEvent::Enumerated { .. } | ScanEvent::Completed { .. })));
}

#[cfg(unix)]
#[test]
fn broken_links_are_skipped() {
    let dir = TempDir::new().unwrap();
    sparse(dir.path(), "real.bin", 4 * MIB);
    std::os::unix::fs::symlink(dir.path().join("missing"), dir.path().join("broken.bin")).unwrap();

    let req = request(dir.path(), ONE_MIB_GIB, "");
    let events = scanner::run_scan_blocking(&req, &ScanConfig::immediate());
    let found = discovered(&events);
    assert_eq!(found.len(), 1);
    assert!(found[0].ends_with("real.bin"));
    assert!(matches!(events.last(), Some(ScanEvent::Completed { total_found: 1 })));
}

#[test]
fn cancel_before_start_emits_nothing() {
    let dir = fixture();
    let req = request(dir.path(), ONE_MIB_GIB, "");
    let control = ScanControl::new();
    control.cancel();

    let mut events = Vec::new();
    scanner::run_scan(&req, &ScanConfig::immediate(), &control, |e| events.push(e));

    assert!(discovered(&events).is_empty());
    assert!(matches!(events.last(), Some(ScanEvent::Cancelled)));
    assert!(!events.iter().any(|e| matches!(e, ScanEvent::Completed { .. })));
}

#[test]
fn cancel_during_enumeration_skips_emission() {
    let dir = fixture();
    let req = request(dir.path(), ONE_MIB_GIB, "");
    let control = ScanControl::new();

    let mut events = Vec::new();
    scanner::run_scan(&req, &ScanConfig::immediate(), &control, |e| {
        // the walk has not looked at a single entry yet
        if matches!(e, ScanEvent::Started { .. }) {
            control.cancel();
        }
        events.push(e);
    });

    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], ScanEvent::Started { .. }));
    assert!(matches!(events[1], ScanEvent::Cancelled));
    assert!(!events
        .iter()
        .any(|e| matches!(e, ScanEvent::Enumerated { .. } | ScanEvent::Progress(_))));
}

#[test]
fn cancel_after_n_files_stops_exactly_there() {
    let dir = fixture();
    let req = request(dir.path(), ONE_MIB_GIB, "");
    let control = ScanControl::new();
    let cancel_after = 2;

    let mut events = Vec::new();
    let mut seen = 0;
    scanner::run_scan(&req, &ScanConfig::immediate(), &control, |e| {
        if matches!(e, ScanEvent::FileDiscovered(_)) {
            seen += 1;
            if seen == cancel_after {
                control.cancel();
            }
        }
        events.push(e);
    });

    assert_eq!(discovered(&events).len(), cancel_after);
    assert!(matches!(events.last(), Some(ScanEvent::Cancelled)));
    assert!(!events.iter().any(|e| matches!(e, ScanEvent::Completed { .. })));

    // nothing but the matching progress event between the last discovery and the cancel
    let last_found = events
        .iter()
        .rposition(|e| matches!(e, ScanEvent::FileDiscovered(_)))
        .unwrap();
    assert_eq!(events.len() - last_found, 3);
}

#[test]
fn pause_holds_emission_until_resume() {
    let dir = fixture();
    let req = request(dir.path(), ONE_MIB_GIB, "");
    let control = Arc::new(ScanControl::new());
    let config = ScanConfig::immediate().with_pause_poll(Duration::from_millis(10));
    let hold = Duration::from_millis(200);

    let mut stamped: Vec<(Instant, ScanEvent)> = Vec::new();
    let mut resumer = None;
    scanner::run_scan(&req, &config, &control, |e| {
        if matches!(&e, ScanEvent::Progress(p) if p.message.contains(" 1 of ")) {
            control.pause();
            let control = Arc::clone(&control);
            resumer = Some(thread::spawn(move || {
                thread::sleep(hold);
                control.resume();
            }));
        }
        stamped.push((Instant::now(), e));
    });
    resumer.unwrap().join().unwrap();

    let first_progress = stamped
        .iter()
        .position(|(_, e)| matches!(e, ScanEvent::Progress(_)))
        .unwrap();
    let (paused_at, _) = &stamped[first_progress];
    let (next_at, next) = &stamped[first_progress + 1];
    assert!(matches!(next, ScanEvent::FileDiscovered(_)));
    assert!(next_at.duration_since(*paused_at) >= hold - Duration::from_millis(20));

    let events: Vec<_> = stamped.into_iter().map(|(_, e)| e).collect();
    assert!(matches!(events.last(), Some(ScanEvent::Completed { .. })));
    assert!(percents(&events).windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn cancel_while_paused_needs_no_resume() {
    let dir = fixture();
    let req = request(dir.path(), ONE_MIB_GIB, "");
    let control = Arc::new(ScanControl::new());
    let config = ScanConfig::immediate().with_pause_poll(Duration::from_secs(30));

    let mut events = Vec::new();
    let mut canceller = None;
    let start = Instant::now();
    scanner::run_scan(&req, &config, &control, |e| {
        if matches!(e, ScanEvent::FileDiscovered(_)) && canceller.is_none() {
            control.pause();
            let control = Arc::clone(&control);
            canceller = Some(thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                control.cancel();
            }));
        }
        events.push(e);
    });
    canceller.unwrap().join().unwrap();

    assert!(start.elapsed() < Duration::from_secs(10));
    assert_eq!(discovered(&events).len(), 1);
    assert!(matches!(events.last(), Some(ScanEvent::Cancelled)));
}

#[test]
fn session_streams_to_completion() {
    let dir = fixture();
    let req = request(dir.path(), ONE_MIB_GIB, "");
    let expected = reference(req.root(), ONE_MIB_GIB, req.filter());

    let mut session = scanner::start(req, ScanConfig::immediate());
    let mut index = FolderIndex::new();
    let mut terminal = None;
    for event in session.events() {
        index.apply(&event);
        if event.is_terminal() {
            terminal = Some(event);
        }
    }
    session.join();

    assert!(matches!(terminal, Some(ScanEvent::Completed { .. })));
    let got: BTreeSet<_> = index.records().map(|r| r.path.clone()).collect();
    assert_eq!(got, expected);
    for group in index.groups() {
        for child in &group.children {
            assert_eq!(child.path.parent().unwrap(), group.folder_path);
        }
    }
}

#[test]
fn session_pause_stops_the_stream() {
    let dir = fixture();
    let req = request(dir.path(), ONE_MIB_GIB, "");
    let config = ScanConfig::default()
        .with_pace(Duration::from_millis(150))
        .with_pause_poll(Duration::from_millis(10));
    let session = scanner::start(req, config);

    // wait for the first file, then pause
    for event in session.events() {
        if matches!(event, ScanEvent::Progress(_)) {
            break;
        }
    }
    session.pause();
    assert!(session.is_paused());

    let quiet_until = Instant::now() + Duration::from_millis(400);
    while Instant::now() < quiet_until {
        if let Ok(event) = session.receiver().recv_timeout(Duration::from_millis(50)) {
            assert!(
                !matches!(event, ScanEvent::FileDiscovered(_) | ScanEvent::Progress(_)),
                "emitted while paused: {event:?}"
            );
        }
    }

    session.resume();
    let rest: Vec<_> = session.events().collect();
    assert!(!discovered(&rest).is_empty());
    assert!(matches!(rest.last(), Some(ScanEvent::Completed { .. })));
}

#[test]
fn dropping_a_session_cancels_it() {
    let dir = fixture();
    let req = request(dir.path(), ONE_MIB_GIB, "");
    let session = scanner::start(req, ScanConfig::default().with_pace(Duration::from_secs(30)));

    for event in session.events() {
        if matches!(event, ScanEvent::Progress(_)) {
            break;
        }
    }
    let start = Instant::now();
    drop(session);
    assert!(start.elapsed() < Duration::from_secs(10));
}
