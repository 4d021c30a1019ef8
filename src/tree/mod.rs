pub mod aggregate;
pub mod extensions;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use compact_str::CompactString;

use crate::scanner::types::{FileRecord, ScanEvent};

/// All discovered files that share a parent directory.
#[derive(Debug, Clone, PartialEq)]
pub struct FolderGroup {
    /// Full path of the directory
    pub folder_path: PathBuf,
    /// Directory name for display (full path for roots)
    pub label: CompactString,
    /// Files in the order they were discovered
    pub children: Vec<FileRecord>,
}

impl FolderGroup {
    fn new(folder_path: PathBuf) -> Self {
        let label = folder_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| folder_path.to_string_lossy().to_string());

        Self {
            label: CompactString::new(&label),
            folder_path,
            children: Vec::new(),
        }
    }

    /// Sum of the children's rounded GiB sizes.
    pub fn total_gib(&self) -> f64 {
        self.children.iter().map(|c| c.size_gib).sum()
    }

    pub fn total_bytes(&self) -> u64 {
        self.children.iter().map(|c| c.size_bytes).sum()
    }
}

/// Folder-level index of discovered files, fed from the event stream.
///
/// Groups appear in the order their folder was first seen; children keep
/// discovery order. Ingesting the same path twice is a no-op.
#[derive(Debug, Default)]
pub struct FolderIndex {
    groups: Vec<FolderGroup>,
    /// folder path → index into `groups`
    path_map: HashMap<PathBuf, usize>,
    seen: HashSet<PathBuf>,
}

impl FolderIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record to its folder's group. Returns `false` if the record's
    /// path was already ingested.
    pub fn ingest(&mut self, record: &FileRecord) -> bool {
        if !self.seen.insert(record.path.clone()) {
            tracing::debug!("Ignoring duplicate record {}", record.path.display());
            return false;
        }

        let folder = record.folder();
        let idx = match self.path_map.get(folder) {
            Some(&idx) => idx,
            None => {
                let idx = self.groups.len();
                self.groups.push(FolderGroup::new(folder.to_path_buf()));
                self.path_map.insert(folder.to_path_buf(), idx);
                idx
            }
        };

        self.groups[idx].children.push(record.clone());
        true
    }

    /// Feed one scan event; only `FileDiscovered` changes the index.
    pub fn apply(&mut self, event: &ScanEvent) -> bool {
        match event {
            ScanEvent::FileDiscovered(record) => self.ingest(record),
            _ => false,
        }
    }

    pub fn groups(&self) -> &[FolderGroup] {
        &self.groups
    }

    pub fn group(&self, folder: &Path) -> Option<&FolderGroup> {
        self.path_map.get(folder).map(|&idx| &self.groups[idx])
    }

    /// Records in folder-then-child order.
    pub fn records(&self) -> impl Iterator<Item = &FileRecord> {
        self.groups.iter().flat_map(|g| g.children.iter())
    }

    pub fn file_count(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn clear(&mut self) {
        self.groups.clear();
        self.path_map.clear();
        self.seen.clear();
    }
}
