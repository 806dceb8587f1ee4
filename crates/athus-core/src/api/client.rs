//! Authenticated request client for the Athus backend.
//!
//! `AuthClient` attaches the stored access token to every non-auth request.
//! On a 401 it refreshes the credential pair once and replays the request
//! once. A failed refresh clears the session and surfaces `SessionInvalid`.

use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

use super::request::{ApiRequest, ApiResponse, REFRESH_PATH};
use super::ApiError;
use crate::auth::{CredentialPair, Session, SessionError};
use crate::config::Config;
use crate::models::Envelope;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Buffered session events per subscriber before old ones are dropped.
const SESSION_EVENT_CAPACITY: usize = 16;

/// Session lifecycle notifications for the surrounding application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn,
    Refreshed,
    LoggedOut,
    /// The session was cleared after a failed refresh; route to login.
    Invalidated { reason: String },
}

/// One refresh call shared by every request that hit a 401 meanwhile.
type RefreshFuture = Shared<BoxFuture<'static, Result<CredentialPair, String>>>;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// HTTP client plus base URL; one round trip per call.
#[derive(Clone)]
struct Transport {
    client: Client,
    base_url: String,
}

/// What a running refresh needs. Owned by the shared future, so it must
/// not hold the in-flight slot itself.
struct RefreshTask {
    transport: Transport,
    session: Arc<Session>,
    events: broadcast::Sender<SessionEvent>,
}

/// API client for the Athus backend.
/// Clone is cheap - reqwest::Client and the session are shared.
#[derive(Clone)]
pub struct AuthClient {
    transport: Transport,
    session: Arc<Session>,
    refresh_in_flight: Arc<Mutex<Option<RefreshFuture>>>,
    events: broadcast::Sender<SessionEvent>,
}

impl AuthClient {
    pub fn new(base_url: &str, session: Arc<Session>) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, session, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(
        base_url: &str,
        session: Arc<Session>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        let (events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);

        Ok(Self {
            transport: Transport {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
            },
            session,
            refresh_in_flight: Arc::new(Mutex::new(None)),
            events,
        })
    }

    pub fn from_config(config: &Config, session: Arc<Session>) -> Result<Self, ApiError> {
        Self::with_timeout(&config.base_url(), session, config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.transport.base_url
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Subscribe to session lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub(crate) fn notify(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    // ===== Request pipeline =====

    /// Send a request, refreshing and replaying once on a 401.
    pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse, ApiError> {
        if !request.is_auth_endpoint() {
            self.attach_access_token(&mut request)?;
        }

        let response = self.transport.dispatch(&request).await?;

        if response.status != StatusCode::UNAUTHORIZED
            || request.is_retried()
            || request.is_refresh_endpoint()
        {
            return response.error_for_status();
        }

        request.mark_retried();
        info!(method = %request.method, path = %request.path, "Access token rejected, refreshing session");

        let rejected = request.bearer_token().map(str::to_string);
        let pair = self.refresh_after(rejected.as_deref()).await?;

        if !request.is_auth_endpoint() {
            request.set_bearer(&pair.access_token)?;
        }

        debug!(method = %request.method, path = %request.path, "Replaying request");
        self.transport.dispatch(&request).await?.error_for_status()
    }

    fn attach_access_token(&self, request: &mut ApiRequest) -> Result<(), ApiError> {
        match self.session.credentials() {
            Ok(Some(pair)) => request.set_bearer(&pair.access_token),
            Ok(None) => Ok(()),
            Err(SessionError::PartialCredentials) => {
                let reason = SessionError::PartialCredentials.to_string();
                self.notify(SessionEvent::Invalidated {
                    reason: reason.clone(),
                });
                Err(ApiError::SessionInvalid(reason))
            }
            Err(e) => Err(e.into()),
        }
    }

    // ===== Refresh =====

    /// Exchange the stored refresh token for a new pair.
    ///
    /// Concurrent callers share one in-flight refresh. On failure the
    /// session is cleared and `SessionInvalid` is returned.
    pub async fn refresh_session(&self) -> Result<CredentialPair, ApiError> {
        self.refresh_after(None).await
    }

    /// Obtain a usable pair after `rejected` got a 401.
    ///
    /// Checked under the slot lock: if no refresh is pending and the stored
    /// access token already differs from the rejected one, another task
    /// rotated the pair after this request went out, so it is reused.
    async fn refresh_after(&self, rejected: Option<&str>) -> Result<CredentialPair, ApiError> {
        let pending = {
            let mut slot = self.refresh_in_flight.lock().await;
            match slot.as_ref() {
                Some(pending) if pending.peek().is_none() => {
                    debug!("Joining in-flight refresh");
                    pending.clone()
                }
                _ => {
                    if let (Some(rejected), Ok(Some(current))) =
                        (rejected, self.session.credentials())
                    {
                        if current.access_token != rejected {
                            debug!("Credential pair already rotated, skipping refresh");
                            return Ok(current);
                        }
                    }

                    let task = RefreshTask {
                        transport: self.transport.clone(),
                        session: self.session.clone(),
                        events: self.events.clone(),
                    };
                    let pending = task.run().boxed().shared();
                    *slot = Some(pending.clone());
                    pending
                }
            }
        };

        let outcome = pending.await;

        {
            let mut slot = self.refresh_in_flight.lock().await;
            if slot.as_ref().is_some_and(|p| p.peek().is_some()) {
                *slot = None;
            }
        }

        outcome.map_err(ApiError::SessionInvalid)
    }

    // ===== Convenience =====

    pub async fn get(&self, path: &str) -> Result<ApiResponse, ApiError> {
        self.send(ApiRequest::get(path)).await
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse, ApiError> {
        self.send(ApiRequest::post(path).with_json(body)?).await
    }

    pub async fn put<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse, ApiError> {
        self.send(ApiRequest::put(path).with_json(body)?).await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse, ApiError> {
        self.send(ApiRequest::delete(path)).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.get(path).await?.json()
    }

    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.post(path, body).await?.json()
    }
}

impl Transport {
    /// Issue a single HTTP round trip, no interception
    async fn dispatch(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = self.url_for(&request.path);

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .headers(request.headers.clone());
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        debug!(method = %request.method, path = %request.path, status = status.as_u16(), "Response received");

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

impl RefreshTask {
    async fn run(self) -> Result<CredentialPair, String> {
        let outcome = match self.request_new_pair().await {
            Ok(pair) => self
                .session
                .store_credentials(&pair)
                .map(|_| pair)
                .map_err(|e| format!("Failed to store refreshed credentials: {}", e)),
            Err(reason) => Err(reason),
        };

        match outcome {
            Ok(pair) => {
                info!("Session refreshed");
                let _ = self.events.send(SessionEvent::Refreshed);
                Ok(pair)
            }
            Err(reason) => {
                warn!(reason = %reason, "Refresh failed, clearing session");
                if let Err(e) = self.session.clear() {
                    error!(error = %e, "Failed to clear session after refresh failure");
                }
                let _ = self.events.send(SessionEvent::Invalidated {
                    reason: reason.clone(),
                });
                Err(reason)
            }
        }
    }

    async fn request_new_pair(&self) -> Result<CredentialPair, String> {
        let refresh_token = self
            .session
            .refresh_token()
            .map_err(|e| e.to_string())?
            .ok_or_else(|| "Refresh token missing".to_string())?;

        let request = ApiRequest::post(REFRESH_PATH)
            .with_json(&RefreshRequest {
                refresh_token: &refresh_token,
            })
            .map_err(|e| e.to_string())?;

        let response = self
            .transport
            .dispatch(&request)
            .await
            .map_err(|e| format!("Refresh request failed: {}", e))?;

        if !response.is_success() {
            return Err(format!("Refresh rejected with status {}", response.status));
        }

        let envelope: Envelope<CredentialPair> = response.json().map_err(|e| e.to_string())?;
        Ok(envelope.body)
    }
}
