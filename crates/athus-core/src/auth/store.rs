use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use thiserror::Error;
use tracing::debug;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Keychain error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("Store lock poisoned")]
    Poisoned,
}

/// Key/value persistence for session data.
///
/// Implementations synchronize internally; callers may share one store
/// across tasks behind an `Arc`.
pub trait TokenStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Write several keys together. Stores that can persist them in one
    /// operation override this; the default writes them one by one.
    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StoreError> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Remove every session key.
    fn clear(&self) -> Result<(), StoreError>;
}

/// In-process store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let values = self.values.read().map_err(|_| StoreError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.values.write().map_err(|_| StoreError::Poisoned)?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StoreError> {
        let mut values = self.values.write().map_err(|_| StoreError::Poisoned)?;
        for (key, value) in entries {
            values.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut values = self.values.write().map_err(|_| StoreError::Poisoned)?;
        values.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut values = self.values.write().map_err(|_| StoreError::Poisoned)?;
        values.clear();
        Ok(())
    }
}

/// JSON map persisted at `<cache_dir>/session.json`.
///
/// Every write rewrites the whole file; the file is removed once empty.
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            path: cache_dir.join(SESSION_FILE),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, StoreError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if map.is_empty() {
            if self.path.exists() {
                std::fs::remove_file(&self.path)?;
                debug!(path = ?self.path, "Session file removed");
            }
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(map)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

impl TokenStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut map = self.read_map()?;
        for (key, value) in entries {
            map.insert(key.to_string(), value.to_string());
        }
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        self.write_map(&BTreeMap::new())
    }
}
