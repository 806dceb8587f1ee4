//! Core library for the Athus marketplace client.
//!
//! This crate holds everything below the screens:
//!
//! - `api`: the authenticated request client with refresh-and-replay, plus
//!   the auth, user and address services built on top of it
//! - `auth`: the explicit `Session` object and its token stores
//! - `validation`: CPF, birth date and registration form rules
//! - `search`: provider filtering for the listing screen
//! - `models`: wire types shared with the backend
//! - `config`: on-disk configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod search;
pub mod utils;
pub mod validation;

pub use api::{
    AddressClient, ApiError, ApiRequest, ApiResponse, AuthClient, AuthService, SessionEvent,
    UserService,
};
pub use auth::{CredentialPair, FileStore, KeyringStore, MemoryStore, Session, TokenStore};
pub use config::{Config, StoreKind};
