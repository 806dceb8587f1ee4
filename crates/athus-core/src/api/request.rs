//! Request and response values passed through `AuthClient::send`.
//!
//! An `ApiRequest` is plain data so the client can keep it around after a
//! 401 and replay it once with a fresh access token.

use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};

use super::ApiError;

/// Any path containing this segment is an authentication endpoint
/// (login, signup, refresh, code verification) and never carries a bearer.
pub const AUTH_PATH_MARKER: &str = "/auth/";

/// The token refresh endpoint
pub const REFRESH_PATH: &str = "/auth/refresh";

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<serde_json::Value>,
    retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body
    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to serialize body: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn with_header(mut self, name: HeaderName, value: &str) -> Result<Self, ApiError> {
        let value = HeaderValue::from_str(value)
            .map_err(|e| ApiError::InvalidRequest(format!("Invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn is_auth_endpoint(&self) -> bool {
        self.path.contains(AUTH_PATH_MARKER)
    }

    pub fn is_refresh_endpoint(&self) -> bool {
        self.path.contains(REFRESH_PATH)
    }

    /// Whether this request already went through a refresh-and-replay
    pub fn is_retried(&self) -> bool {
        self.retried
    }

    pub(crate) fn mark_retried(&mut self) {
        self.retried = true;
    }

    /// The token currently in the `Authorization: Bearer` header
    pub fn bearer_token(&self) -> Option<&str> {
        self.headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    }

    pub(crate) fn set_bearer(&mut self, token: &str) -> Result<(), ApiError> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| ApiError::InvalidRequest(format!("Invalid access token: {}", e)))?;
        value.set_sensitive(true);
        self.headers.insert(header::AUTHORIZATION, value);
        Ok(())
    }
}

/// A response with a fully read body.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_str(&self.body).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response: {}", e))
        })
    }

    /// Turn a non-2xx response into the matching `ApiError`
    pub fn error_for_status(self) -> Result<Self, ApiError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ApiError::from_response(self.status, &self.headers, &self.body))
        }
    }
}
