use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use thiserror::Error;

use crate::auth::{SessionError, StoreError};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized - credentials rejected")]
    Unauthorized { body: String, headers: HeaderMap },

    #[error("Access denied: {}", truncate_body(.0))]
    AccessDenied(String),

    #[error("Resource not found: {}", truncate_body(.0))]
    NotFound(String),

    #[error("Conflict: {}", truncate_body(.0))]
    Conflict(String),

    #[error("Rate limited - please wait before retrying: {}", truncate_body(.body))]
    RateLimited { body: String, headers: HeaderMap },

    #[error("Server error ({status}): {}", truncate_body(.body))]
    ServerError { status: u16, body: String },

    #[error("Status {status}: {}", truncate_body(.body))]
    UnexpectedStatus { status: u16, body: String },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Session is no longer valid: {0}")]
    SessionInvalid(String),

    #[error("Credential storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Truncate a response body to avoid logging excessive data.
/// The full body stays available on the error value.
fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        body.to_string()
    } else {
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!(
            "{}... (truncated, {} total bytes)",
            &body[..end],
            body.len()
        )
    }
}

impl ApiError {
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        Self::from_response(status, &HeaderMap::new(), body)
    }

    /// Map a non-2xx response. 401 and 429 keep the response headers
    /// (`WWW-Authenticate`, `Retry-After`).
    pub fn from_response(status: StatusCode, headers: &HeaderMap, body: &str) -> Self {
        let body = body.to_string();
        match status.as_u16() {
            401 => ApiError::Unauthorized {
                body,
                headers: headers.clone(),
            },
            403 => ApiError::AccessDenied(body),
            404 => ApiError::NotFound(body),
            409 => ApiError::Conflict(body),
            429 => ApiError::RateLimited {
                body,
                headers: headers.clone(),
            },
            code @ 500..=599 => ApiError::ServerError { status: code, body },
            code => ApiError::UnexpectedStatus { status: code, body },
        }
    }

    /// HTTP status behind this error, when there was a response
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { .. } => Some(401),
            ApiError::AccessDenied(_) => Some(403),
            ApiError::NotFound(_) => Some(404),
            ApiError::Conflict(_) => Some(409),
            ApiError::RateLimited { .. } => Some(429),
            ApiError::ServerError { status, .. } | ApiError::UnexpectedStatus { status, .. } => {
                Some(*status)
            }
            ApiError::NetworkError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Response headers, for the statuses that keep them
    pub fn headers(&self) -> Option<&HeaderMap> {
        match self {
            ApiError::Unauthorized { headers, .. } | ApiError::RateLimited { headers, .. } => {
                Some(headers)
            }
            _ => None,
        }
    }

    /// `Retry-After` value of a 429, as sent
    pub fn retry_after(&self) -> Option<&str> {
        match self {
            ApiError::RateLimited { headers, .. } => headers
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok()),
            _ => None,
        }
    }

    /// True when the session is gone and the user has to log in again
    pub fn is_session_invalid(&self) -> bool {
        matches!(self, ApiError::SessionInvalid(_))
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Store(e) => ApiError::Storage(e),
            SessionError::PartialCredentials => ApiError::SessionInvalid(err.to_string()),
            SessionError::CorruptUser(e) => ApiError::InvalidResponse(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(
            ApiError::from_status(StatusCode::UNAUTHORIZED, ""),
            ApiError::Unauthorized { .. }
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::CONFLICT, "exists"),
            ApiError::Conflict(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_GATEWAY, ""),
            ApiError::ServerError { status: 502, .. }
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::UNPROCESSABLE_ENTITY, ""),
            ApiError::UnexpectedStatus { status: 422, .. }
        ));
    }

    #[test]
    fn test_body_kept_verbatim() {
        let body = "x".repeat(2000);
        let err = ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, &body);
        match &err {
            ApiError::ServerError { body: kept, .. } => assert_eq!(kept.len(), 2000),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("truncated, 2000 total bytes"));
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn test_rate_limited_keeps_body_and_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(reqwest::header::RETRY_AFTER, "30".parse().unwrap());
        let err = ApiError::from_response(StatusCode::TOO_MANY_REQUESTS, &headers, "slow down");

        assert!(matches!(&err, ApiError::RateLimited { body, .. } if body == "slow down"));
        assert_eq!(err.retry_after(), Some("30"));
        assert_eq!(err.status(), Some(429));
        assert!(err.to_string().ends_with("slow down"));

        let err = ApiError::from_status(StatusCode::NOT_FOUND, "gone");
        assert!(err.headers().is_none());
        assert_eq!(err.retry_after(), None);
    }

    #[test]
    fn test_partial_credentials_is_session_invalid() {
        let err: ApiError = SessionError::PartialCredentials.into();
        assert!(err.is_session_invalid());
    }
}
