//! JSON-file-backed slug store.
//!
//! The file holds a JSON-encoded list of `[slug, [channel-id, ...]]` pairs.
//! It is read once at startup and rewritten wholesale on every mutation;
//! between writes the in-memory list is the source of truth. Slug insertion
//! order and channel order are both preserved.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Error type for slug store operations.
#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "IO error: {}", e),
            StoreError::Parse(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

type Entries = Vec<(String, Vec<String>)>;

/// Persisted slug → ordered channel list mapping.
pub struct SlugStore {
    path: PathBuf,
    entries: Mutex<Entries>,
}

impl SlugStore {
    /// Load the store from `path`. A missing file yields an empty store;
    /// a malformed file is an error rather than silent data loss.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let entries = match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).map_err(StoreError::Parse)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Entries::new(),
            Err(e) => return Err(StoreError::Io(e)),
        };

        tracing::info!(path = %path.display(), slugs = entries.len(), "Slug directory loaded");

        Ok(Self {
            path: path.to_path_buf(),
            entries: Mutex::new(entries),
        })
    }

    /// Snapshot of all entries in insertion order.
    pub fn list(&self) -> Entries {
        self.entries.lock().expect("slug store mutex poisoned").clone()
    }

    /// Channel list for `slug`, if present.
    pub fn get(&self, slug: &str) -> Option<Vec<String>> {
        self.entries
            .lock()
            .expect("slug store mutex poisoned")
            .iter()
            .find(|(s, _)| s == slug)
            .map(|(_, channels)| channels.clone())
    }

    /// Insert or replace the channel list for `slug` and rewrite the file.
    pub fn upsert(&self, slug: &str, channels: Vec<String>) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().expect("slug store mutex poisoned");
        match entries.iter_mut().find(|(s, _)| s == slug) {
            Some((_, existing)) => *existing = channels,
            None => entries.push((slug.to_string(), channels)),
        }
        self.persist(&entries)
    }

    /// Remove `slug` and rewrite the file. Returns whether it existed.
    pub fn remove(&self, slug: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock().expect("slug store mutex poisoned");
        let before = entries.len();
        entries.retain(|(s, _)| s != slug);
        if entries.len() == before {
            return Ok(false);
        }
        self.persist(&entries)?;
        Ok(true)
    }

    // Caller holds the entries lock, so file writes are serialized.
    fn persist(&self, entries: &Entries) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(entries).map_err(StoreError::Parse)?;
        fs::write(&self.path, json).map_err(StoreError::Io)
    }
}
