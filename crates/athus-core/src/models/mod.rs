//! Data models shared with the Athus backend.
//!
//! - `User`, `SignUpPayload`, `ProfileUpdate`: account and profile data
//! - `Address`: CEP lookup result
//! - `ServiceProvider`, `Service`, `Review`: provider listing data
//! - `Envelope`: the `{ "body": ... }` wrapper most endpoints respond with

pub mod provider;
pub mod user;

use serde::Deserialize;

pub use provider::{Review, Service, ServiceProvider};
pub use user::{Address, ProfileUpdate, SignUpPayload, User};

/// Response wrapper used by the backend: `{ "body": <payload> }`.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub body: T,
}

/// Some endpoints wrap their payload in `body`, some don't.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MaybeEnveloped<T> {
    Wrapped { body: T },
    Bare(T),
}

impl<T> MaybeEnveloped<T> {
    pub fn into_inner(self) -> T {
        match self {
            MaybeEnveloped::Wrapped { body } => body,
            MaybeEnveloped::Bare(value) => value,
        }
    }
}
