//! Error types for the mailsig core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them for callers that want a single
//! error type.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A required environment variable is not set.
    #[error("required environment variable '{var}' is not set (referenced by config field '{field}')")]
    EnvVarMissing {
        var: String,
        field: String,
    },

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue {
        field: String,
        detail: String,
    },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Directory errors
// ---------------------------------------------------------------------------

/// Failure modes of a directory profile lookup.
///
/// None of these abort a login: the orchestrator logs them and continues
/// without enrichment.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The request did not complete within the configured timeout.
    #[error("directory request timed out")]
    Timeout,

    /// Network / TLS / connection failure.
    #[error("directory transport error: {0}")]
    Transport(String),

    /// The directory answered with something other than 200 OK.
    #[error("directory returned HTTP {status}")]
    Status {
        status: u16,
    },

    /// The body was not a JSON object.
    #[error("directory response decode error: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for DirectoryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DirectoryError::Timeout
        } else if err.is_decode() {
            DirectoryError::Decode(err.to_string())
        } else {
            DirectoryError::Transport(err.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Authentication errors
// ---------------------------------------------------------------------------

/// Errors from the identity provider round trip.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Provider metadata could not be discovered.
    #[error("provider discovery failed for '{authority}': {detail}")]
    Discovery {
        authority: String,
        detail: String,
    },

    /// A configured URL could not be parsed.
    #[error("invalid {what} URL '{url}': {detail}")]
    InvalidUrl {
        what: String,
        url: String,
        detail: String,
    },

    /// The provider redirected back with an `error` parameter.
    #[error("identity provider returned '{error}': {description}")]
    Provider {
        error: String,
        description: String,
    },

    /// The authorization code could not be exchanged for tokens.
    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    /// The token response carried no ID token.
    #[error("token response did not contain an ID token")]
    MissingIdToken,

    /// The ID token failed signature, audience, issuer or nonce checks.
    #[error("ID token verification failed: {0}")]
    ClaimsVerification(String),
}

impl AuthError {
    /// Short machine-readable code shown on the error page.
    pub fn code(&self) -> &str {
        match self {
            AuthError::Discovery { .. } => "discovery_failed",
            AuthError::InvalidUrl { .. } => "invalid_url",
            AuthError::Provider { error, .. } => error,
            AuthError::TokenExchange(_) => "token_exchange_failed",
            AuthError::MissingIdToken => "missing_id_token",
            AuthError::ClaimsVerification(_) => "invalid_id_token",
        }
    }
}
