//! A store backed by one JSON file.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::{KeyValueStore, StoreError};

/// A store that keeps every key in a single JSON object on disk:
///
/// ```json
/// { "auth.token": "...", "auth.expiresAt": "2026-10-18T12:00:00Z" }
/// ```
///
/// The file is read once in [`open`](FileStore::open) and cached. Every
/// `set`/`remove` rewrites it in full: the new contents go to a sibling
/// temp file which is then renamed over the original, so a crash mid-write
/// leaves either the old file or the new one, never half of each.
/// The cache only changes once the write has landed, so a failed write can
/// be retried with the same value.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Opens (or prepares to create) the store at `path`.
    ///
    /// A missing file is an empty store. A file that isn't a JSON object
    /// of strings is logged and treated as empty; it is replaced on the
    /// next write.
    ///
    /// # Errors
    /// [`StoreError::Io`] if the file exists but can't be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => parse_entries(&path, &raw).unwrap_or_else(|err| {
                warn!(path = %path.display(), error = %err, "ignoring unreadable session file");
                BTreeMap::new()
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };

        debug!(path = %path.display(), keys = entries.len(), "session file opened");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Where the store lives on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Writes `entries` to disk via temp file + rename.
    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(entries)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.tmp_path();
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries();
        if entries.get(key).is_some_and(|current| current == value) {
            return Ok(());
        }
        let mut next = entries.clone();
        next.insert(key.to_owned(), value.to_owned());
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries();
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut next = entries.clone();
        next.remove(key);
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }
}

fn parse_entries(path: &Path, raw: &str) -> Result<BTreeMap<String, String>, StoreError> {
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(raw).map_err(|err| StoreError::Corrupted {
        key: path.display().to_string(),
        reason: err.to_string(),
    })
}
