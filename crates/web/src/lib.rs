//! mailsig web server.
//!
//! Provides an Axum-based HTTP server with:
//! - OIDC login, callback and logout
//! - Profile and signature pages for signed-in users
//! - A health endpoint
//! - Signed-cookie sessions backed by an in-memory store

pub mod error;
pub mod oidc;
pub mod pages;
pub mod routes;
pub mod session;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::{Key, SameSite};
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};
use tracing::info;

use mailsig_core::config::AppConfig;
use mailsig_core::ProfileDirectory;

use crate::error::AppError;
use crate::oidc::IdentityProvider;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub config: AppConfig,
    pub provider: Arc<dyn IdentityProvider>,
    pub directory: Arc<dyn ProfileDirectory>,
}

/// The web server.
pub struct WebServer {
    state: Arc<AppState>,
    cookie_key: Key,
}

impl WebServer {
    /// Create a new web server with the given collaborators.
    ///
    /// Fails if the session secret is missing.
    pub fn new(
        config: AppConfig,
        provider: Arc<dyn IdentityProvider>,
        directory: Arc<dyn ProfileDirectory>,
    ) -> Result<Self, AppError> {
        let secret = config
            .session
            .secret_key
            .as_deref()
            .ok_or_else(|| AppError::Internal("session secret key is not set".into()))?;
        let cookie_key = session::derive_cookie_key(secret)?;

        Ok(Self {
            state: Arc::new(AppState {
                config,
                provider,
                directory,
            }),
            cookie_key,
        })
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        let config = &self.state.config;

        let sessions = SessionManagerLayer::new(MemoryStore::default())
            .with_name(config.session.cookie_name.clone())
            .with_secure(config.session.secure_cookie)
            .with_same_site(SameSite::Lax)
            .with_http_only(true)
            .with_expiry(Expiry::OnSessionEnd)
            .with_signed(self.cookie_key.clone());

        Router::new()
            .merge(routes::signature::routes())
            .merge(routes::auth::routes(&config.oidc.callback_path()))
            .merge(routes::status::routes())
            .layer(sessions)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Serve on `listen_addr` until `shutdown` resolves.
    pub async fn start<F>(self, listen_addr: &str, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = listen_addr.parse()?;
        let app = self.router();

        info!(
            addr = %addr,
            callback = %self.state.config.oidc.callback_path(),
            "starting web server"
        );

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}
