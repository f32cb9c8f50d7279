//! Key-value credential stores.

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use super::{CredentialPair, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, TOUR_COMPLETED_KEY};

/// Persisted key-value store holding the session credentials.
///
/// Implementations must be safe to share between concurrent requests.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str);

    fn remove(&self, key: &str);

    /// Current access credential, if any.
    fn access_token(&self) -> Option<String> {
        self.get(ACCESS_TOKEN_KEY).filter(|t| !t.is_empty())
    }

    /// Current refresh credential, if any.
    fn refresh_token(&self) -> Option<String> {
        self.get(REFRESH_TOKEN_KEY).filter(|t| !t.is_empty())
    }

    fn set_access_token(&self, token: &str) {
        self.set(ACCESS_TOKEN_KEY, token);
    }

    fn save_pair(&self, pair: &CredentialPair) {
        self.set(ACCESS_TOKEN_KEY, &pair.access_token);
        self.set(REFRESH_TOKEN_KEY, &pair.refresh_token);
    }

    /// Drop both credentials. Unrelated keys are left alone.
    fn clear(&self) {
        self.remove(ACCESS_TOKEN_KEY);
        self.remove(REFRESH_TOKEN_KEY);
    }

    fn clear_tour_flag(&self) {
        self.remove(TOUR_COMPLETED_KEY);
    }
}

/// In-memory store; contents live as long as the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<DashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with a credential pair.
    pub fn with_pair(pair: &CredentialPair) -> Self {
        let store = Self::new();
        store.save_pair(pair);
        store
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).map(|r| r.value().clone())
    }

    fn set(&self, key: &str, value: &str) {
        self.inner.insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.inner.remove(key);
    }
}

/// Store persisted as a JSON object on disk, rewritten on every mutation.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store, loading existing entries if the file exists.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            let entries: BTreeMap<String, String> = serde_json::from_reader(reader)?;
            tracing::debug!(path = %path.display(), entries = entries.len(), "Loaded credential store");
            entries
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn persist(&self, entries: &BTreeMap<String, String>) {
        if let Err(e) = self.write_file(entries) {
            tracing::error!(path = %self.path.display(), error = %e, "Failed to persist credentials");
        }
    }

    fn write_file(&self, entries: &BTreeMap<String, String>) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(writer, entries)?;
        Ok(())
    }

    fn mutate<F>(&self, f: F)
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> bool,
    {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if f(&mut entries) {
            self.persist(&entries);
        }
    }
}

impl CredentialStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.mutate(|entries| {
            entries.insert(key.to_string(), value.to_string()).as_deref() != Some(value)
        });
    }

    fn remove(&self, key: &str) {
        self.mutate(|entries| entries.remove(key).is_some());
    }
}
