//! REST API client module for the Athus backend.
//!
//! This module provides the `AuthClient` for authenticated requests with
//! transparent token refresh, and the services built on it:
//! `AuthService` (login, signup, verification), `UserService` (profile)
//! and `AddressClient` (ViaCEP lookup, unauthenticated).
//!
//! The API uses bearer access tokens renewed through `/auth/refresh`.

pub mod address;
pub mod auth;
pub mod client;
pub mod error;
pub mod request;
pub mod users;

pub use address::AddressClient;
pub use auth::{AuthService, LoginOutcome};
pub use client::{AuthClient, SessionEvent};
pub use error::ApiError;
pub use request::{ApiRequest, ApiResponse};
pub use users::UserService;
