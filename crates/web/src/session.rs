//! Per-request session context.
//!
//! Sessions live in a `MemoryStore` for the lifetime of the process and
//! are addressed by a signed cookie. Two keys are used: the pending login
//! (CSRF state + nonce) between `/login` and the callback, and the signed-in
//! [`UserProfile`].

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Redirect, Response};
use hkdf::Hkdf;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tower_sessions::cookie::Key;
use tower_sessions::Session;
use tracing::warn;

use mailsig_core::UserProfile;

use crate::error::AppError;

/// Session key for the signed-in user's profile.
pub const USER_KEY: &str = "user";

/// Session key for the login attempt in flight.
pub const PENDING_LOGIN_KEY: &str = "auth_state";

/// State remembered between the login redirect and the callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingLogin {
    pub csrf_state: String,
    pub nonce: String,
}

impl PendingLogin {
    /// Compare the callback's `state` parameter with the stored one.
    pub fn state_matches(&self, returned: &str) -> bool {
        self.csrf_state.as_bytes().ct_eq(returned.as_bytes()).into()
    }
}

/// Derive the 64-byte cookie signing key from the configured secret.
pub fn derive_cookie_key(secret: &str) -> Result<Key, AppError> {
    let hkdf = Hkdf::<Sha256>::new(None, secret.as_bytes());
    let mut key_bytes = [0u8; 64];
    hkdf.expand(b"mailsig-session-cookie", &mut key_bytes)
        .map_err(|e| AppError::Internal(format!("cookie key derivation failed: {}", e)))?;
    Ok(Key::from(&key_bytes[..]))
}

/// The signed-in user, loaded from the session.
///
/// Requests without a user in the session are redirected to `/login`.
pub struct CurrentUser(pub UserProfile);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        match session.get::<UserProfile>(USER_KEY).await {
            Ok(Some(user)) => Ok(CurrentUser(user)),
            Ok(None) => Err(Redirect::to("/login").into_response()),
            Err(e) => {
                warn!(error = %e, "failed to read user from session");
                Err(AppError::Session(e.to_string()).into_response())
            }
        }
    }
}
