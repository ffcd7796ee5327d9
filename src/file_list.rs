use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{structs::file_entry::FileEntry, util::files::is_image_file};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AddOutcome {
    Added,
    Duplicate,
    Unsupported,
    Missing,
}

impl AddOutcome {
    pub fn is_added(self) -> bool {
        self == AddOutcome::Added
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AddSummary {
    pub added: usize,
    pub duplicates: usize,
    pub unsupported: usize,
    pub missing: usize,
}

impl AddSummary {
    fn record(&mut self, outcome: AddOutcome) {
        match outcome {
            AddOutcome::Added => self.added += 1,
            AddOutcome::Duplicate => self.duplicates += 1,
            AddOutcome::Unsupported => self.unsupported += 1,
            AddOutcome::Missing => self.missing += 1,
        }
    }
}

/// Ordered set of files queued for conversion. Paths are unique.
#[derive(Debug, Default)]
pub struct FileList {
    entries: Vec<FileEntry>,
}

impl FileList {
    pub fn add(&mut self, path: &Path) -> AddOutcome {
        if !path.is_file() {
            return AddOutcome::Missing;
        }
        if !is_image_file(path) {
            return AddOutcome::Unsupported;
        }

        let path = normalize(path);
        if self.contains(&path) {
            return AddOutcome::Duplicate;
        }

        match FileEntry::new(path) {
            Ok(entry) => {
                log::debug!("Queued '{}'", entry.path().display());
                self.entries.push(entry);
                AddOutcome::Added
            }
            Err(e) => {
                log::warn!("Cannot queue file: {}", e);
                AddOutcome::Missing
            }
        }
    }

    pub fn add_all<I, P>(&mut self, paths: I) -> AddSummary
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut summary = AddSummary::default();
        for path in paths {
            let path = path.as_ref();
            let outcome = self.add(path);
            if !outcome.is_added() {
                log::debug!("Skipped '{}': {:?}", path.display(), outcome);
            }
            summary.record(outcome);
        }
        summary
    }

    pub fn remove(&mut self, path: &Path) -> bool {
        let path = normalize(path);
        match self.entries.iter().position(|entry| entry.path() == path) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Empties the list, but only once the user has confirmed.
    pub fn clear(&mut self, confirmed: bool) -> usize {
        if !confirmed {
            return 0;
        }
        let removed = self.entries.len();
        self.entries.clear();
        removed
    }

    pub fn list(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(FileEntry::size).sum()
    }

    fn contains(&self, path: &Path) -> bool {
        self.entries.iter().any(|entry| entry.path() == path)
    }
}

fn normalize(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
