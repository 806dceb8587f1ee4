use keyring::Entry;

use super::store::{StoreError, TokenStore};
use super::SESSION_KEYS;

const SERVICE_NAME: &str = "athus";

/// Session values kept in the OS keychain, one entry per key.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    /// Use a different keychain service name (separate profiles, tests)
    pub fn with_service(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry, StoreError> {
        Ok(Entry::new(&self.service, key)?)
    }

    /// Check if the keychain backend is reachable at all
    pub fn is_available(&self) -> bool {
        let Ok(entry) = self.entry(SESSION_KEYS[0]) else {
            return false;
        };
        match entry.get_password() {
            Ok(_) | Err(keyring::Error::NoEntry) => true,
            Err(_) => false,
        }
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entry(key)?.set_password(value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn clear(&self) -> Result<(), StoreError> {
        for key in SESSION_KEYS {
            self.remove(key)?;
        }
        Ok(())
    }
}
