//! Identity provider integration (OpenID Connect authorization-code flow).
//!
//! Handlers only see the [`IdentityProvider`] trait; [`OidcProvider`] is the
//! production implementation built on `openidconnect` with discovery, CSRF
//! state, nonce, and ID token verification.

use async_trait::async_trait;
use openidconnect::core::{CoreAuthenticationFlow, CoreClient, CoreProviderMetadata};
use openidconnect::{
    AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointMaybeSet, EndpointNotSet,
    EndpointSet, IssuerUrl, Nonce, OAuth2TokenResponse, RedirectUrl, Scope, TokenResponse,
};
use tracing::{debug, info, instrument};
use url::Url;

use mailsig_core::config::OidcConfig;
use mailsig_core::errors::AuthError;

/// Everything needed to send the browser to the provider and to validate
/// the callback afterwards.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: String,
    pub csrf_state: String,
    pub nonce: String,
}

/// Claims taken from a verified ID token.
#[derive(Debug, Clone, Default)]
pub struct IdentityClaims {
    pub name: Option<String>,
    pub preferred_username: Option<String>,
}

/// Result of a successful code exchange.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub claims: IdentityClaims,
    /// Access token for the directory API, if the provider issued one.
    pub access_token: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Build a fresh authorization URL with new state and nonce.
    fn authorization_request(&self) -> AuthorizationRequest;

    /// Exchange an authorization code and verify the returned ID token
    /// against `nonce`.
    async fn exchange_code(&self, code: &str, nonce: &str) -> Result<TokenGrant, AuthError>;

    /// Provider logout URL that returns the browser to `post_logout_redirect_uri`.
    fn logout_url(&self, post_logout_redirect_uri: &str) -> String;
}

/// Append `post_logout_redirect_uri` to a logout endpoint.
pub fn build_logout_url(endpoint: &str, post_logout_redirect_uri: &str) -> String {
    match Url::parse_with_params(
        endpoint,
        &[("post_logout_redirect_uri", post_logout_redirect_uri)],
    ) {
        Ok(url) => url.to_string(),
        Err(_) => endpoint.to_string(),
    }
}

/// Client type produced by provider discovery.
type DiscoveredClient = CoreClient<
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointMaybeSet,
    EndpointMaybeSet,
>;

/// OpenID Connect provider discovered from its issuer URL.
pub struct OidcProvider {
    client: DiscoveredClient,
    http: reqwest::Client,
    scopes: Vec<String>,
    logout_endpoint: String,
}

impl OidcProvider {
    /// Discover provider metadata and build the client.
    pub async fn discover(config: &OidcConfig) -> Result<Self, AuthError> {
        let issuer = config.issuer_url();

        // Redirects must not be followed during token requests.
        let http = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AuthError::Discovery {
                authority: issuer.clone(),
                detail: format!("failed to build HTTP client: {}", e),
            })?;

        let issuer_url = IssuerUrl::new(issuer.clone()).map_err(|e| AuthError::InvalidUrl {
            what: "issuer".into(),
            url: issuer.clone(),
            detail: e.to_string(),
        })?;

        let metadata = CoreProviderMetadata::discover_async(issuer_url, &http)
            .await
            .map_err(|e| AuthError::Discovery {
                authority: issuer.clone(),
                detail: e.to_string(),
            })?;

        let redirect_url =
            RedirectUrl::new(config.redirect_uri.clone()).map_err(|e| AuthError::InvalidUrl {
                what: "redirect".into(),
                url: config.redirect_uri.clone(),
                detail: e.to_string(),
            })?;

        let client = CoreClient::from_provider_metadata(
            metadata,
            ClientId::new(config.client_id.clone()),
            config.client_secret.clone().map(ClientSecret::new),
        )
        .set_redirect_uri(redirect_url);

        info!(issuer = %issuer, client_id = %config.client_id, "discovered identity provider");

        Ok(Self {
            client,
            http,
            scopes: config.scopes.clone(),
            logout_endpoint: config.logout_endpoint(),
        })
    }
}

#[async_trait]
impl IdentityProvider for OidcProvider {
    fn authorization_request(&self) -> AuthorizationRequest {
        let mut request = self
            .client
            .authorize_url(
                CoreAuthenticationFlow::AuthorizationCode,
                CsrfToken::new_random,
                Nonce::new_random,
            )
            .add_scope(Scope::new("profile".to_string()))
            .add_scope(Scope::new("email".to_string()));
        for scope in &self.scopes {
            request = request.add_scope(Scope::new(scope.clone()));
        }

        let (url, csrf_state, nonce) = request.url();
        AuthorizationRequest {
            url: url.to_string(),
            csrf_state: csrf_state.secret().clone(),
            nonce: nonce.secret().clone(),
        }
    }

    #[instrument(skip_all)]
    async fn exchange_code(&self, code: &str, nonce: &str) -> Result<TokenGrant, AuthError> {
        let token_response = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .map_err(|e| AuthError::TokenExchange(e.to_string()))?
            .request_async(&self.http)
            .await
            .map_err(|e| AuthError::TokenExchange(e.to_string()))?;

        let id_token = token_response.id_token().ok_or(AuthError::MissingIdToken)?;
        let nonce = Nonce::new(nonce.to_string());
        let claims = id_token
            .claims(&self.client.id_token_verifier(), &nonce)
            .map_err(|e| AuthError::ClaimsVerification(e.to_string()))?;

        let claims = IdentityClaims {
            name: claims
                .name()
                .and_then(|name| name.get(None))
                .map(|name| name.as_str().to_string()),
            preferred_username: claims
                .preferred_username()
                .map(|username| username.as_str().to_string()),
        };
        debug!(has_name = claims.name.is_some(), "ID token verified");

        Ok(TokenGrant {
            claims,
            access_token: Some(token_response.access_token().secret().clone()),
        })
    }

    fn logout_url(&self, post_logout_redirect_uri: &str) -> String {
        build_logout_url(&self.logout_endpoint, post_logout_redirect_uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_logout_url_encodes_redirect() {
        let url = build_logout_url(
            "https://login.microsoftonline.com/contoso/oauth2/v2.0/logout",
            "http://localhost:5000/",
        );
        assert_eq!(
            url,
            "https://login.microsoftonline.com/contoso/oauth2/v2.0/logout\
             ?post_logout_redirect_uri=http%3A%2F%2Flocalhost%3A5000%2F"
        );
    }

    #[test]
    fn test_build_logout_url_with_unparseable_endpoint() {
        assert_eq!(build_logout_url("not a url", "http://x/"), "not a url");
    }
}
