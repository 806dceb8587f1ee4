//! Authentication state for the client.
//!
//! This module provides:
//! - `Session`: the credential pair (access + refresh token) and cached user,
//!   injected into the request client instead of living in global storage
//! - `TokenStore`: the persistence seam, with `FileStore`, `KeyringStore`
//!   and `MemoryStore` implementations
//!
//! The access and refresh tokens are always stored and cleared as a pair.

pub mod credentials;
pub mod session;
pub mod store;

pub use credentials::KeyringStore;
pub use session::{CredentialPair, Session, SessionError};
pub use store::{FileStore, MemoryStore, StoreError, TokenStore};

/// Storage key for the access token
pub const AUTH_TOKEN_KEY: &str = "authToken";

/// Storage key for the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Storage key for the cached logged-in user (JSON)
pub const USER_KEY: &str = "user";

/// Every key the session writes; `clear()` removes all of them.
pub const SESSION_KEYS: [&str; 3] = [AUTH_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY];
