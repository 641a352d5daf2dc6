//! On-disk index store.
//!
//! The store holds only the index path. Every call re-reads the file, so
//! an out-of-band reindex is picked up on the next request without
//! coordination. There is no lock against a concurrent writer; a reader
//! can observe a partially written file during a non-atomic replace.
//! Writers should publish a new index with an atomic rename.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::IndexResult;
use crate::record::CaptureRecord;
use crate::search;

/// Whole-index counters surfaced on the landing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    /// Number of well-formed capture lines.
    pub memento_count: u64,
    /// Number of distinct canonical keys among them.
    pub unique_uris: u64,
}

/// Read-side handle on the sorted capture index file.
pub struct IndexStore {
    path: PathBuf,
    skipped_lines: AtomicU64,
}

impl IndexStore {
    /// Creates a store for the index at `path`. The file is not opened
    /// until the first search call.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            skipped_lines: AtomicU64::new(0),
        }
    }

    /// The index file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Total malformed lines skipped during scans since this store was
    /// created. A growing value indicates index corruption.
    pub fn skipped_lines(&self) -> u64 {
        self.skipped_lines.load(Ordering::Relaxed)
    }

    fn read_lines(&self) -> IndexResult<Vec<String>> {
        let text = std::fs::read_to_string(&self.path)?;
        Ok(text.lines().map(|l| l.to_string()).collect())
    }

    /// Exact-key lookup: `key` alone, or `key` at a specific timestamp.
    ///
    /// Returns `Ok(None)` when no line matches; a malformed line at the
    /// match position is an error, not a miss.
    pub fn lookup_exact(
        &self,
        key: &str,
        timestamp: Option<&str>,
    ) -> IndexResult<Option<CaptureRecord>> {
        let needle = match timestamp {
            Some(ts) => format!("{key} {ts}"),
            None => key.to_string(),
        };
        let only_uri = timestamp.is_none();

        let lines = self.read_lines()?;
        let refs: Vec<&str> = lines.iter().map(|l| l.as_str()).collect();
        match search::find_exact(&refs, &needle, only_uri) {
            Some(idx) => Ok(Some(CaptureRecord::parse(refs[idx], idx + 1)?)),
            None => Ok(None),
        }
    }

    /// All captures for one canonical key, in the search layer's
    /// encounter order (anchor first). Empty when the key is unknown.
    pub fn captures_for_uri(&self, key: &str) -> IndexResult<Vec<CaptureRecord>> {
        let lines = self.read_lines()?;
        let refs: Vec<&str> = lines.iter().map(|l| l.as_str()).collect();
        let (records, skipped) = search::collect_for_key(&refs, key);
        if skipped > 0 {
            self.skipped_lines.fetch_add(skipped, Ordering::Relaxed);
        }
        Ok(records)
    }

    /// Raw physical line access, metadata lines included.
    pub fn raw_line(&self, idx: usize) -> IndexResult<Option<String>> {
        let lines = self.read_lines()?;
        Ok(lines.get(idx).cloned())
    }

    /// Full-scan statistics: memento count and distinct URI-R count.
    pub fn stats(&self) -> IndexResult<IndexStats> {
        let lines = self.read_lines()?;
        let refs: Vec<&str> = lines.iter().map(|l| l.as_str()).collect();
        let (meta, data) = search::sections(&refs);

        let mut memento_count = 0u64;
        let mut keys = std::collections::HashSet::new();
        let mut skipped = 0u64;
        for (offset, line) in refs[meta..meta + data].iter().enumerate() {
            match CaptureRecord::parse(line, meta + offset + 1) {
                Ok(rec) => {
                    memento_count += 1;
                    keys.insert(rec.canonical_key);
                }
                Err(err) => {
                    skipped += 1;
                    tracing::warn!(line = meta + offset + 1, %err, "skipping malformed index line");
                }
            }
        }
        if skipped > 0 {
            self.skipped_lines.fetch_add(skipped, Ordering::Relaxed);
        }

        Ok(IndexStats {
            memento_count,
            unique_uris: keys.len() as u64,
        })
    }
}
