//! Recently viewed issues, persisted in a small key-value store.
//!
//! The list is newest first, deduplicated by id and capped. Persistence is
//! best effort: storage failures are logged and the in-memory list stays
//! authoritative for the session.

use crate::clock::Clock;
use crate::error::ErrorCode;
use crate::lock::{DEFAULT_LOCK_TIMEOUT, LockError, ReadLock, WriteLock, lock_path_for};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Storage key holding the serialized list.
pub const STORAGE_KEY: &str = "recentlyAccessedIssues";

pub const DEFAULT_CAPACITY: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error("corrupt storage file {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

impl StorageError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Io(_) | Self::Corrupt { .. } => ErrorCode::StorageWriteFailed,
            Self::Lock(err) => err.code(),
        }
    }
}

/// String-valued durable storage.
pub trait KvStore {
    /// # Errors
    ///
    /// [`StorageError`] if the backing medium cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// # Errors
    ///
    /// [`StorageError`] if the value cannot be written.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// [`StorageError`] if the key cannot be removed.
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// Volatile store, for tests and sessions without a state file.
#[derive(Debug, Clone, Default)]
pub struct MemoryKvStore {
    values: BTreeMap<String, String>,
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.values.remove(key);
        Ok(())
    }
}

/// A JSON object on disk mapping keys to string values.
///
/// Writes are read-modify-write under an exclusive lock on a sibling
/// `.lock` file, then renamed into place.
#[derive(Debug, Clone)]
pub struct FileKvStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl FileKvStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let lock_path = lock_path_for(&path);
        Self { path, lock_path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(err.into()),
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|err| StorageError::Corrupt {
            path: self.path.clone(),
            reason: err.to_string(),
        })
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(map).map_err(io::Error::other)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update(
        &self,
        edit: impl FnOnce(&mut BTreeMap<String, String>),
    ) -> Result<(), StorageError> {
        let _lock = WriteLock::acquire(&self.lock_path, DEFAULT_LOCK_TIMEOUT)?;
        let mut map = match self.read_map() {
            Err(StorageError::Corrupt { path, reason }) => {
                warn!(path = %path.display(), %reason, "rewriting corrupt state file");
                BTreeMap::new()
            }
            other => other?,
        };
        edit(&mut map);
        self.write_map(&map)
    }
}

impl KvStore for FileKvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _lock = ReadLock::acquire(&self.lock_path, DEFAULT_LOCK_TIMEOUT)?;
        Ok(self.read_map()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|map| {
            map.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.update(|map| {
            map.remove(key);
        })
    }
}

/// One visited issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentEntry {
    pub id: String,
    pub title: String,
    /// Epoch milliseconds.
    pub accessed_at: i64,
}

/// Newest-first list of visited issues.
#[derive(Debug)]
pub struct RecentlyAccessed<S, C> {
    storage: S,
    clock: C,
    capacity: usize,
    entries: Vec<RecentEntry>,
}

impl<S: KvStore, C: Clock> RecentlyAccessed<S, C> {
    /// An empty list. Call [`Self::load`] to restore a persisted one.
    #[must_use]
    pub fn new(storage: S, clock: C, capacity: usize) -> Self {
        Self {
            storage,
            clock,
            capacity: capacity.max(1),
            entries: Vec::new(),
        }
    }

    /// Replace the in-memory list with the persisted one. Unreadable or
    /// corrupt storage leaves the list as it was.
    pub fn load(&mut self) {
        let raw = match self.storage.get(STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(err) => {
                warn!(code = %err.code(), error = %err, "failed to load recently accessed issues");
                return;
            }
        };
        match serde_json::from_str::<Vec<RecentEntry>>(&raw) {
            Ok(mut entries) => {
                entries.truncate(self.capacity);
                self.entries = entries;
            }
            Err(err) => warn!(error = %err, "ignoring corrupt recently accessed list"),
        }
    }

    /// Move `id` to the front, stamped with the current time.
    pub fn record(&mut self, id: &str, title: &str) {
        self.entries.retain(|entry| entry.id != id);
        self.entries.insert(
            0,
            RecentEntry {
                id: id.to_string(),
                title: title.to_string(),
                accessed_at: self.clock.now_millis(),
            },
        );
        self.entries.truncate(self.capacity);
        self.persist();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        if let Err(err) = self.storage.remove(STORAGE_KEY) {
            warn!(code = %err.code(), error = %err, "failed to clear recently accessed issues");
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[RecentEntry] {
        &self.entries
    }

    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    fn persist(&mut self) {
        let result = serde_json::to_string(&self.entries)
            .map_err(|err| StorageError::Io(io::Error::other(err)))
            .and_then(|json| self.storage.set(STORAGE_KEY, &json));
        if let Err(err) = result {
            warn!(code = %err.code(), error = %err, "failed to save recently accessed issues");
        }
    }
}
