use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::client::{AuthClient, SessionEvent};
use super::ApiError;
use crate::auth::CredentialPair;
use crate::models::{MaybeEnveloped, SignUpPayload, User};

/// Length of the emailed verification code
const VERIFICATION_CODE_LENGTH: usize = 6;

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    senha: &'a str,
}

#[derive(Serialize)]
struct VerifyEmailRequest<'a> {
    email: &'a str,
    codigo: &'a str,
}

#[derive(Serialize)]
struct GoogleLoginRequest<'a> {
    access_token: &'a str,
}

/// Result of a login call.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// The user built from the login body, when the backend sent one
    pub user: Option<User>,
    /// Whether the backend issued a credential pair (it was stored)
    pub tokens_issued: bool,
}

/// Login, signup and verification against the `/auth/` endpoints.
#[derive(Clone)]
pub struct AuthService {
    client: AuthClient,
}

impl AuthService {
    pub fn new(client: AuthClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &AuthClient {
        &self.client
    }

    /// Log in with email and password, storing tokens and user on success
    pub async fn login(&self, email: &str, senha: &str) -> Result<LoginOutcome, ApiError> {
        let response = self
            .client
            .post("/auth/login", &LoginRequest { email, senha })
            .await?;

        let body = response.json::<MaybeEnveloped<Value>>()?.into_inner();
        self.accept_login_body(body)
    }

    fn accept_login_body(&self, body: Value) -> Result<LoginOutcome, ApiError> {
        let tokens = serde_json::from_value::<CredentialPair>(body.clone()).ok();
        let user = serde_json::from_value::<User>(body).ok();

        if let Some(ref pair) = tokens {
            let session = self.client.session();
            session.store_credentials(pair)?;
            if let Some(ref user) = user {
                session.store_user(user)?;
            }
            info!(user_id = user.as_ref().map(|u| u.id), "Login successful");
            self.client.notify(SessionEvent::LoggedIn);
        } else {
            warn!("Login response carried no credentials");
        }

        Ok(LoginOutcome {
            user,
            tokens_issued: tokens.is_some(),
        })
    }

    /// Register a new account. A 409 means the email is already taken.
    pub async fn sign_up(&self, payload: &SignUpPayload) -> Result<Value, ApiError> {
        let response = self.client.post("/auth/cadastrar", payload).await?;
        debug!("Signup accepted");
        body_or_null(&response.body)
    }

    /// Confirm the 6-digit code sent to the user's email
    pub async fn verify_email(&self, email: &str, codigo: &str) -> Result<Value, ApiError> {
        let codigo = codigo.trim();
        if codigo.len() != VERIFICATION_CODE_LENGTH || !codigo.chars().all(|c| c.is_ascii_digit())
        {
            return Err(ApiError::InvalidRequest(format!(
                "Verification code must be {} digits",
                VERIFICATION_CODE_LENGTH
            )));
        }

        let response = self
            .client
            .post("/auth/validarcodigo", &VerifyEmailRequest { email, codigo })
            .await?;
        body_or_null(&response.body)
    }

    /// Exchange a Google access token for a backend credential pair
    pub async fn login_with_google(&self, access_token: &str) -> Result<LoginOutcome, ApiError> {
        let response = self
            .client
            .post("/oauth2/google/autenticado", &GoogleLoginRequest { access_token })
            .await?;

        let body = response.json::<MaybeEnveloped<Value>>()?.into_inner();
        let pair: CredentialPair = serde_json::from_value(body.clone()).map_err(|e| {
            ApiError::InvalidResponse(format!("Google login returned no credentials: {}", e))
        })?;

        let session = self.client.session();
        session.store_credentials(&pair)?;

        let user = match body.get("id").and_then(Value::as_i64) {
            Some(id) => {
                let user = self
                    .client
                    .get_json::<MaybeEnveloped<User>>(&format!("/usuarios/{}", id))
                    .await?
                    .into_inner();
                session.store_user(&user)?;
                Some(user)
            }
            None => None,
        };

        info!("Google login successful");
        self.client.notify(SessionEvent::LoggedIn);

        Ok(LoginOutcome {
            user,
            tokens_issued: true,
        })
    }

    /// Clear tokens and cached user
    pub fn logout(&self) -> Result<(), ApiError> {
        self.client.session().clear()?;
        info!("Logged out");
        self.client.notify(SessionEvent::LoggedOut);
        Ok(())
    }
}

/// Parse a possibly empty response body
pub(crate) fn body_or_null(body: &str) -> Result<Value, ApiError> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body)
        .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse JSON response: {}", e)))
}
