use std::fmt;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::store::{StoreError, TokenStore};
use super::{AUTH_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY};
use crate::models::User;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Credential storage failed: {0}")]
    Store(#[from] StoreError),

    #[error("Stored credentials were incomplete; the session was cleared")]
    PartialCredentials,

    #[error("Cached user is unreadable: {0}")]
    CorruptUser(#[from] serde_json::Error),
}

/// Access and refresh token, always handled together.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl CredentialPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

// Tokens never reach logs through Debug.
impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// The logged-in session: credential pair plus the cached user profile.
///
/// Reads and writes of the pair are serialized by an internal lock so a
/// reader never observes half of a pair this session is writing.
pub struct Session {
    store: Arc<dyn TokenStore>,
    lock: Mutex<()>,
}

impl Session {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>, SessionError> {
        self.lock
            .lock()
            .map_err(|_| SessionError::Store(StoreError::Poisoned))
    }

    /// Load the credential pair.
    ///
    /// Both absent is `Ok(None)`. Exactly one present clears the session and
    /// returns `PartialCredentials`.
    pub fn credentials(&self) -> Result<Option<CredentialPair>, SessionError> {
        let _guard = self.guard()?;
        let access = self.store.get(AUTH_TOKEN_KEY)?;
        let refresh = self.store.get(REFRESH_TOKEN_KEY)?;

        match (access, refresh) {
            (Some(access_token), Some(refresh_token)) => Ok(Some(CredentialPair {
                access_token,
                refresh_token,
            })),
            (None, None) => Ok(None),
            (access, refresh) => {
                warn!(
                    has_access = access.is_some(),
                    has_refresh = refresh.is_some(),
                    "Partial credential state, forcing logout"
                );
                self.store.clear()?;
                Err(SessionError::PartialCredentials)
            }
        }
    }

    /// The stored access token, if any
    pub fn access_token(&self) -> Result<Option<String>, SessionError> {
        let _guard = self.guard()?;
        Ok(self.store.get(AUTH_TOKEN_KEY)?)
    }

    /// The stored refresh token, if any
    pub fn refresh_token(&self) -> Result<Option<String>, SessionError> {
        let _guard = self.guard()?;
        Ok(self.store.get(REFRESH_TOKEN_KEY)?)
    }

    /// Persist a new credential pair
    pub fn store_credentials(&self, pair: &CredentialPair) -> Result<(), SessionError> {
        let _guard = self.guard()?;
        self.store.set_many(&[
            (AUTH_TOKEN_KEY, pair.access_token.as_str()),
            (REFRESH_TOKEN_KEY, pair.refresh_token.as_str()),
        ])?;
        debug!("Credential pair stored");
        Ok(())
    }

    /// Clear all session data (tokens and cached user)
    pub fn clear(&self) -> Result<(), SessionError> {
        let _guard = self.guard()?;
        self.store.clear()?;
        debug!("Session cleared");
        Ok(())
    }

    /// Check if a complete credential pair is stored
    pub fn is_authenticated(&self) -> bool {
        matches!(self.credentials(), Ok(Some(_)))
    }

    pub fn user(&self) -> Result<Option<User>, SessionError> {
        let _guard = self.guard()?;
        self.read_user()
    }

    pub fn store_user(&self, user: &User) -> Result<(), SessionError> {
        let _guard = self.guard()?;
        self.write_user(user)
    }

    /// Modify the cached user in place.
    ///
    /// Read and write happen under one lock, so a concurrent `clear` either
    /// wins entirely (nothing cached, `Ok(None)`) or runs after the write.
    pub fn update_user<F>(&self, apply: F) -> Result<Option<User>, SessionError>
    where
        F: FnOnce(&mut User),
    {
        let _guard = self.guard()?;
        let Some(mut user) = self.read_user()? else {
            return Ok(None);
        };
        apply(&mut user);
        self.write_user(&user)?;
        Ok(Some(user))
    }

    fn read_user(&self) -> Result<Option<User>, SessionError> {
        match self.store.get(USER_KEY)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn write_user(&self, user: &User) -> Result<(), SessionError> {
        let json = serde_json::to_string(user)?;
        self.store.set(USER_KEY, &json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::auth::MemoryStore;

    fn session() -> (Arc<MemoryStore>, Session) {
        let store = Arc::new(MemoryStore::new());
        let session = Session::new(store.clone());
        (store, session)
    }

    #[test]
    fn test_credentials_absent() {
        let (_, session) = session();
        assert!(session.credentials().unwrap().is_none());
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_store_and_load_pair() {
        let (_, session) = session();
        session
            .store_credentials(&CredentialPair::new("A1", "R1"))
            .unwrap();

        let pair = session.credentials().unwrap().unwrap();
        assert_eq!(pair, CredentialPair::new("A1", "R1"));
        assert!(session.is_authenticated());
    }

    #[test]
    fn test_partial_state_forces_logout() {
        let (store, session) = session();
        store.set(AUTH_TOKEN_KEY, "A1").unwrap();
        store.set(USER_KEY, "{}").unwrap();

        let err = session.credentials().unwrap_err();
        assert!(matches!(err, SessionError::PartialCredentials));
        assert_eq!(store.get(AUTH_TOKEN_KEY).unwrap(), None);
        assert_eq!(store.get(USER_KEY).unwrap(), None);
    }

    #[test]
    fn test_clear_removes_user_too() {
        let (store, session) = session();
        session
            .store_credentials(&CredentialPair::new("A1", "R1"))
            .unwrap();
        session.store_user(&User::new(5, "Ana Souza", "ana@example.com")).unwrap();

        session.clear().unwrap();
        assert!(session.credentials().unwrap().is_none());
        assert!(session.user().unwrap().is_none());
        assert_eq!(store.get(USER_KEY).unwrap(), None);
    }

    #[test]
    fn test_user_roundtrip() {
        let (_, session) = session();
        let user = User::new(7, "Carlos Lima", "carlos@example.com");
        session.store_user(&user).unwrap();
        assert_eq!(session.user().unwrap(), Some(user));
    }

    #[test]
    fn test_update_user_after_clear_writes_nothing() {
        let (store, session) = session();
        session
            .store_credentials(&CredentialPair::new("A1", "R1"))
            .unwrap();
        session.store_user(&User::new(5, "Ana Souza", "ana@example.com")).unwrap();

        let updated = session
            .update_user(|user| user.cidade = Some("Recife".to_string()))
            .unwrap()
            .unwrap();
        assert_eq!(updated.cidade.as_deref(), Some("Recife"));
        assert_eq!(session.user().unwrap(), Some(updated));

        session.clear().unwrap();
        let after_clear = session
            .update_user(|user| user.cidade = Some("Olinda".to_string()))
            .unwrap();
        assert!(after_clear.is_none());
        assert_eq!(store.get(USER_KEY).unwrap(), None);
    }

    /// Counts single-key writes and batched writes.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryStore,
        sets: AtomicUsize,
        batches: AtomicUsize,
    }

    impl TokenStore for CountingStore {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            self.sets.fetch_add(1, Ordering::SeqCst);
            self.inner.set(key, value)
        }

        fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StoreError> {
            self.batches.fetch_add(1, Ordering::SeqCst);
            self.inner.set_many(entries)
        }

        fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.inner.remove(key)
        }

        fn clear(&self) -> Result<(), StoreError> {
            self.inner.clear()
        }
    }

    #[test]
    fn test_pair_is_written_in_one_batch() {
        let store = Arc::new(CountingStore::default());
        let session = Session::new(store.clone());

        session
            .store_credentials(&CredentialPair::new("A1", "R1"))
            .unwrap();

        assert_eq!(store.batches.load(Ordering::SeqCst), 1);
        assert_eq!(store.sets.load(Ordering::SeqCst), 0);
        assert_eq!(
            session.credentials().unwrap(),
            Some(CredentialPair::new("A1", "R1"))
        );
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let pair = CredentialPair::new("secret-access", "secret-refresh");
        let printed = format!("{:?}", pair);
        assert!(!printed.contains("secret"));
    }
}
