//! Authentication against the hosted identity service.
//!
//! Wraps the GoTrue-style REST endpoints (sign up, password grant, token
//! refresh, sign out) and persists the session to disk so a restart can
//! resume without re-entering credentials. The signed-in state lives in a
//! [`SessionContext`] handed to whoever needs it; nothing reads ambient
//! globals.

use crate::remote::RemoteConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Auth errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("network error: {0}")]
    Network(String),

    #[error("auth error: {status} - {message}")]
    Backend { status: u16, message: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("session store error: {0}")]
    Store(#[from] std::io::Error),
}

/// Signed-in user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

/// Tokens plus identity for one signed-in session.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: AuthUser,
    pub access_token: String,
    pub refresh_token: String,
}

/// Shared handle to the current session.
///
/// Read-mostly: sync and services read it per operation, auth replaces it
/// on sign-in, refresh and sign-out.
#[derive(Clone, Default)]
pub struct SessionContext {
    inner: Arc<RwLock<Option<AuthSession>>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Option<AuthSession> {
        self.inner.read().expect("session lock").clone()
    }

    pub fn user(&self) -> Option<AuthUser> {
        self.snapshot().map(|s| s.user)
    }

    pub fn is_signed_in(&self) -> bool {
        self.inner.read().expect("session lock").is_some()
    }

    pub fn set(&self, session: Option<AuthSession>) {
        *self.inner.write().expect("session lock") = session;
    }
}

/// Session file contents.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedSession {
    access_token: String,
    refresh_token: String,
    user_id: Uuid,
    email: String,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    id: Uuid,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    user: ApiUser,
}

#[derive(Debug, Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

/// Client for the identity endpoints.
pub struct AuthManager {
    client: Client,
    base_url: String,
    api_key: String,
    session_path: PathBuf,
    session: SessionContext,
}

impl AuthManager {
    pub fn new(config: RemoteConfig, session_path: PathBuf, session: SessionContext) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            session_path,
            session,
        }
    }

    fn auth_url(&self, endpoint: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, endpoint)
    }

    /// Currently signed-in user, if any.
    pub fn current_user(&self) -> Option<AuthUser> {
        self.session.user()
    }

    /// Register a new account.
    ///
    /// Returns `None` when the service requires email confirmation before
    /// issuing a session; the user signs in normally after confirming.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Option<AuthUser>, AuthError> {
        let resp = self
            .client
            .post(self.auth_url("signup"))
            .header("apikey", &self.api_key)
            .json(&PasswordGrant { email, password })
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(AuthError::Backend { status, message });
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| AuthError::Parse(e.to_string()))?;
        if body.get("access_token").is_none() {
            info!(email, "sign-up accepted, awaiting confirmation");
            return Ok(None);
        }
        let token: TokenResponse =
            serde_json::from_value(body).map_err(|e| AuthError::Parse(e.to_string()))?;
        let user = self.adopt_session(token)?;
        info!(user_id = %user.id, "signed up");
        Ok(Some(user))
    }

    /// Sign in with email and password.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let token = self
            .token_request("password", &PasswordGrant { email, password })
            .await?;
        let user = self.adopt_session(token)?;
        info!(user_id = %user.id, "signed in");
        Ok(user)
    }

    /// Sign out, clearing the shared session and the persisted file.
    ///
    /// The remote revocation is best-effort; local state is cleared even
    /// when the service is unreachable.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        if let Some(session) = self.session.snapshot() {
            let result = self
                .client
                .post(self.auth_url("logout"))
                .header("apikey", &self.api_key)
                .bearer_auth(&session.access_token)
                .send()
                .await;
            if let Err(e) = result {
                debug!(error = %e, "remote sign-out skipped");
            }
        }
        self.session.set(None);
        self.clear_persisted()?;
        info!("signed out");
        Ok(())
    }

    /// Resume the persisted session, if it is still valid.
    ///
    /// An expired access token is refreshed with the stored refresh token;
    /// a session the service no longer accepts is deleted. Network errors
    /// keep the file so the next launch can try again.
    pub async fn restore_session(&self) -> Result<Option<AuthUser>, AuthError> {
        let persisted = match self.load_persisted()? {
            Some(p) => p,
            None => return Ok(None),
        };

        let resp = self
            .client
            .get(self.auth_url("user"))
            .header("apikey", &self.api_key)
            .bearer_auth(&persisted.access_token)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if resp.status().is_success() {
            let api_user: ApiUser = resp
                .json()
                .await
                .map_err(|e| AuthError::Parse(e.to_string()))?;
            let user = AuthUser {
                id: api_user.id,
                email: api_user.email.unwrap_or(persisted.email),
            };
            self.session.set(Some(AuthSession {
                user: user.clone(),
                access_token: persisted.access_token,
                refresh_token: persisted.refresh_token,
            }));
            info!(user_id = %user.id, "session restored");
            return Ok(Some(user));
        }

        // Access token rejected. Try the refresh grant before giving up.
        debug!(status = resp.status().as_u16(), "stored access token rejected");
        match self
            .token_request(
                "refresh_token",
                &RefreshGrant {
                    refresh_token: &persisted.refresh_token,
                },
            )
            .await
        {
            Ok(token) => {
                let user = self.adopt_session(token)?;
                info!(user_id = %user.id, "session refreshed");
                Ok(Some(user))
            }
            Err(AuthError::Backend { status, .. }) => {
                warn!(status, "stored session invalid, clearing");
                self.clear_persisted()?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn token_request<B: Serialize + Sync>(
        &self,
        grant_type: &str,
        body: &B,
    ) -> Result<TokenResponse, AuthError> {
        let resp = self
            .client
            .post(self.auth_url("token"))
            .query(&[("grant_type", grant_type)])
            .header("apikey", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(AuthError::Backend { status, message });
        }

        resp.json().await.map_err(|e| AuthError::Parse(e.to_string()))
    }

    fn adopt_session(&self, token: TokenResponse) -> Result<AuthUser, AuthError> {
        let user = AuthUser {
            id: token.user.id,
            email: token.user.email.unwrap_or_default(),
        };
        let session = AuthSession {
            user: user.clone(),
            access_token: token.access_token,
            refresh_token: token.refresh_token,
        };
        self.persist_session(&session)?;
        self.session.set(Some(session));
        Ok(user)
    }

    fn persist_session(&self, session: &AuthSession) -> Result<(), AuthError> {
        let persisted = PersistedSession {
            access_token: session.access_token.clone(),
            refresh_token: session.refresh_token.clone(),
            user_id: session.user.id,
            email: session.user.email.clone(),
        };
        if let Some(parent) = self.session_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&persisted)
            .map_err(|e| AuthError::Parse(e.to_string()))?;
        std::fs::write(&self.session_path, contents)?;
        Ok(())
    }

    fn load_persisted(&self) -> Result<Option<PersistedSession>, AuthError> {
        let contents = match std::fs::read_to_string(&self.session_path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&contents) {
            Ok(p) => Ok(Some(p)),
            Err(e) => {
                // A corrupt file cannot be resumed; start signed out.
                warn!(error = %e, "discarding unreadable session file");
                self.clear_persisted()?;
                Ok(None)
            }
        }
    }

    fn clear_persisted(&self) -> Result<(), AuthError> {
        match std::fs::remove_file(&self.session_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_context_round_trips() {
        let ctx = SessionContext::new();
        assert!(!ctx.is_signed_in());

        let user = AuthUser {
            id: Uuid::new_v4(),
            email: "student@example.com".to_string(),
        };
        ctx.set(Some(AuthSession {
            user: user.clone(),
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
        }));
        assert!(ctx.is_signed_in());
        assert_eq!(ctx.user(), Some(user));

        ctx.set(None);
        assert!(!ctx.is_signed_in());
    }

    #[test]
    fn clones_share_state() {
        let ctx = SessionContext::new();
        let other = ctx.clone();
        ctx.set(Some(AuthSession {
            user: AuthUser {
                id: Uuid::new_v4(),
                email: String::new(),
            },
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
        }));
        assert!(other.is_signed_in());
    }
}
