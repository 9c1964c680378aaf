//! Login, callback and logout endpoints (authorization-code flow).

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{debug, info, warn};

use mailsig_core::directory::{enrich_profile, EnrichmentOutcome};
use mailsig_core::errors::AuthError;
use mailsig_core::UserProfile;

use crate::error::AppError;
use crate::pages;
use crate::session::{PendingLogin, PENDING_LOGIN_KEY, USER_KEY};
use crate::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Query parameters the provider sends back to the redirect URI.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub state: Option<String>,
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

/// Auth routes; the callback is mounted at `callback_path`.
pub fn routes(callback_path: &str) -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", get(login))
        .route(callback_path, get(callback))
        .route("/logout", get(logout))
}

async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Redirect, AppError> {
    let request = state.provider.authorization_request();

    session
        .insert(
            PENDING_LOGIN_KEY,
            PendingLogin {
                csrf_state: request.csrf_state,
                nonce: request.nonce,
            },
        )
        .await?;

    debug!("redirecting to identity provider");
    Ok(Redirect::to(&request.url))
}

async fn callback(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(params): Query<CallbackParams>,
) -> Result<Response, AppError> {
    let pending: Option<PendingLogin> = session.get(PENDING_LOGIN_KEY).await?;
    let returned_state = params.state.as_deref().unwrap_or("");

    // Unknown or forged state: drop the attempt and leave the session as is.
    let pending = match pending {
        Some(p) if p.state_matches(returned_state) => p,
        Some(_) => {
            warn!("callback state does not match the pending login, ignoring");
            return Ok(Redirect::to("/").into_response());
        }
        None => {
            warn!("callback without a pending login, ignoring");
            return Ok(Redirect::to("/").into_response());
        }
    };

    // The state is single-use from here on.
    session.remove::<PendingLogin>(PENDING_LOGIN_KEY).await?;

    if let Some(error) = params.error {
        let description = params.error_description.unwrap_or_default();
        warn!(error = %error, description = %description, "identity provider reported an error");
        return Ok(auth_failed(&AuthError::Provider { error, description }));
    }

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        warn!("callback without an authorization code");
        return Ok(auth_failed(&AuthError::TokenExchange(
            "no authorization code in callback".into(),
        )));
    };

    let grant = match state.provider.exchange_code(&code, &pending.nonce).await {
        Ok(grant) => grant,
        Err(e) => {
            warn!(error = %e, "code exchange failed");
            return Ok(auth_failed(&e));
        }
    };

    let mut profile = UserProfile::from_claims(grant.claims.name, grant.claims.preferred_username);

    let enrichment = enrich_profile(state.directory.as_ref(), grant.access_token.as_deref()).await;
    match &enrichment.outcome {
        EnrichmentOutcome::Enriched => debug!("profile enriched from directory"),
        EnrichmentOutcome::Skipped => debug!("no access token, profile not enriched"),
        EnrichmentOutcome::Failed(_) => debug!("signing in without directory attributes"),
    }
    if let Some(directory_profile) = enrichment.profile {
        profile.apply_directory(directory_profile);
    }

    // New session ID once the user is authenticated.
    session.cycle_id().await?;
    session.insert(USER_KEY, &profile).await?;

    info!(user = %profile.display_name(), "user signed in");
    Ok(Redirect::to("/").into_response())
}

async fn logout(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Redirect, AppError> {
    session.flush().await?;

    let return_to = format!("{}/", state.config.public_url());
    info!("user signed out");
    Ok(Redirect::to(&state.provider.logout_url(&return_to)))
}

fn auth_failed(err: &AuthError) -> Response {
    let description = match err {
        AuthError::Provider { description, .. } => description.clone(),
        other => other.to_string(),
    };
    (
        StatusCode::UNAUTHORIZED,
        pages::auth_error_page(err.code(), &description),
    )
        .into_response()
}
