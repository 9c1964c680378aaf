//! Configuration for mailsig.
//!
//! Two sources are supported:
//! - a TOML file, where secrets are referenced through `_env` fields naming
//!   environment variables and resolved by [`AppConfig::resolve_env_vars`]
//! - plain environment variables (optionally from a `.env` file), see
//!   [`AppConfig::from_env`]

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::errors::ConfigError;

/// Minimum length of the session secret, in bytes.
pub const MIN_SECRET_KEY_LEN: usize = 32;

/// Paths served by fixed routes; the callback cannot share one of them.
pub const RESERVED_PATHS: &[&str] = &["/", "/login", "/logout", "/generate", "/health"];

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Identity provider settings.
    pub oidc: OidcConfig,

    /// Directory API settings.
    #[serde(default)]
    pub directory: DirectoryConfig,

    /// Session cookie settings.
    #[serde(default)]
    pub session: SessionConfig,
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address (default `0.0.0.0:5000`).
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Externally visible base URL, used for the post-logout redirect.
    /// Defaults to the origin of `oidc.redirect_uri`.
    #[serde(default)]
    pub public_url: Option<String>,
}

fn default_listen() -> String {
    "0.0.0.0:5000".into()
}
fn default_log_level() -> String {
    "info".into()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            log_level: default_log_level(),
            public_url: None,
        }
    }
}

// ---------------------------------------------------------------------------
// OIDC
// ---------------------------------------------------------------------------

/// Identity provider (authorization-code flow) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OidcConfig {
    /// Authority URL, e.g. `https://login.microsoftonline.com/<tenant>`.
    pub authority: String,

    /// OIDC issuer used for discovery. Defaults to `<authority>/v2.0`.
    #[serde(default)]
    pub issuer: Option<String>,

    /// OAuth2 client ID.
    pub client_id: String,

    /// Environment variable holding the client secret.
    #[serde(default = "default_client_secret_env")]
    pub client_secret_env: String,

    /// Redirect URI registered with the provider. Its path is also the
    /// callback route.
    pub redirect_uri: String,

    /// Scopes requested on top of `openid profile email`.
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,

    /// Provider logout path, appended to the authority's origin and path.
    #[serde(default = "default_logout_path")]
    pub logout_path: String,

    /// Resolved client secret (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub client_secret: Option<String>,
}

fn default_client_secret_env() -> String {
    "CLIENT_SECRET".into()
}
fn default_scopes() -> Vec<String> {
    vec!["User.Read".into()]
}
fn default_logout_path() -> String {
    "/oauth2/v2.0/logout".into()
}

impl OidcConfig {
    /// Issuer URL for provider discovery.
    pub fn issuer_url(&self) -> String {
        if let Some(ref issuer) = self.issuer {
            return issuer.trim_end_matches('/').to_string();
        }
        let authority = self.authority.trim_end_matches('/');
        if authority.ends_with("/v2.0") {
            authority.to_string()
        } else {
            format!("{}/v2.0", authority)
        }
    }

    /// Path component of the redirect URI; the callback route is served here.
    pub fn callback_path(&self) -> String {
        Url::parse(&self.redirect_uri)
            .map(|u| u.path().to_string())
            .unwrap_or_else(|_| "/getAToken".into())
    }

    /// Full URL of the provider's logout endpoint.
    pub fn logout_endpoint(&self) -> String {
        let authority = self.authority.trim_end_matches('/');
        let authority = authority.strip_suffix("/v2.0").unwrap_or(authority);
        format!("{}{}", authority, self.logout_path)
    }
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

/// Directory API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Profile endpoint queried with the user's access token.
    #[serde(default = "default_directory_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds (default 30).
    #[serde(default = "default_directory_timeout")]
    pub timeout_secs: u64,
}

fn default_directory_endpoint() -> String {
    "https://graph.microsoft.com/v1.0/me".into()
}
fn default_directory_timeout() -> u64 {
    30
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            endpoint: default_directory_endpoint(),
            timeout_secs: default_directory_timeout(),
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Session cookie settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Environment variable holding the cookie signing secret.
    #[serde(default = "default_secret_key_env")]
    pub secret_key_env: String,

    /// Cookie name.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Set the `Secure` attribute (enable behind HTTPS).
    #[serde(default)]
    pub secure_cookie: bool,

    /// Resolved secret key.
    #[serde(skip)]
    pub secret_key: Option<String>,
}

fn default_secret_key_env() -> String {
    "SECRET_KEY".into()
}
fn default_cookie_name() -> String {
    "mailsig.sid".into()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret_key_env: default_secret_key_env(),
            cookie_name: default_cookie_name(),
            secure_cookie: false,
            secret_key: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load an [`AppConfig`] from a TOML file at the given path.
    ///
    /// This does **not** resolve environment variables -- call
    /// [`resolve_env_vars`](Self::resolve_env_vars) afterwards.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Resolve all `*_env` fields from environment variables.
    ///
    /// Missing variables only log a warning here; [`validate`](Self::validate)
    /// decides what is required.
    pub fn resolve_env_vars(&mut self) -> Result<(), ConfigError> {
        info!("resolving environment variable references in config");
        load_dotenv();

        self.oidc.client_secret =
            resolve_optional_env(&self.oidc.client_secret_env, "oidc.client_secret_env");
        self.session.secret_key =
            resolve_optional_env(&self.session.secret_key_env, "session.secret_key_env");

        debug!("environment variable resolution complete");
        Ok(())
    }

    /// Build the configuration from plain environment variables:
    /// `AUTHORITY`, `CLIENT_ID`, `CLIENT_SECRET`, `REDIRECT_URI`, `PORT`,
    /// `SECRET_KEY` and optionally `LOG_LEVEL`, `PUBLIC_URL`, `ISSUER`,
    /// `DIRECTORY_ENDPOINT`.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());
        let required = |name: &str, field: &str| {
            get(name).ok_or_else(|| ConfigError::EnvVarMissing {
                var: name.to_string(),
                field: field.to_string(),
            })
        };

        let port: u16 = match get("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                field: "PORT".into(),
                detail: format!("'{}' is not a valid port", raw),
            })?,
            None => 5000,
        };

        let mut directory = DirectoryConfig::default();
        if let Some(endpoint) = get("DIRECTORY_ENDPOINT") {
            directory.endpoint = endpoint;
        }

        Ok(Self {
            server: ServerConfig {
                listen: format!("0.0.0.0:{}", port),
                log_level: get("LOG_LEVEL").unwrap_or_else(default_log_level),
                public_url: get("PUBLIC_URL"),
            },
            oidc: OidcConfig {
                authority: required("AUTHORITY", "oidc.authority")?,
                issuer: get("ISSUER"),
                client_id: required("CLIENT_ID", "oidc.client_id")?,
                client_secret_env: default_client_secret_env(),
                redirect_uri: required("REDIRECT_URI", "oidc.redirect_uri")?,
                scopes: default_scopes(),
                logout_path: default_logout_path(),
                client_secret: get("CLIENT_SECRET"),
            },
            directory,
            session: SessionConfig {
                secret_key: get("SECRET_KEY"),
                ..SessionConfig::default()
            },
        })
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_url(&self.oidc.authority, "oidc.authority")?;
        require_url(&self.oidc.redirect_uri, "oidc.redirect_uri")?;
        let callback_path = self.oidc.callback_path();
        if RESERVED_PATHS.contains(&callback_path.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "oidc.redirect_uri".into(),
                detail: format!(
                    "callback path '{}' collides with a built-in route",
                    callback_path
                ),
            });
        }
        if let Some(ref public_url) = self.server.public_url {
            require_url(public_url, "server.public_url")?;
        }
        if self.oidc.client_id.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "oidc.client_id".into(),
                detail: "client ID must not be empty".into(),
            });
        }
        if self.oidc.client_secret.is_none() {
            return Err(ConfigError::EnvVarMissing {
                var: self.oidc.client_secret_env.clone(),
                field: "oidc.client_secret_env".into(),
            });
        }
        match self.session.secret_key {
            None => {
                return Err(ConfigError::EnvVarMissing {
                    var: self.session.secret_key_env.clone(),
                    field: "session.secret_key_env".into(),
                })
            }
            Some(ref key) if key.len() < MIN_SECRET_KEY_LEN => {
                return Err(ConfigError::InvalidValue {
                    field: "session.secret_key_env".into(),
                    detail: format!("secret key must be at least {} bytes", MIN_SECRET_KEY_LEN),
                })
            }
            Some(_) => {}
        }
        if self.directory.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "directory.timeout_secs".into(),
                detail: "timeout must be > 0".into(),
            });
        }

        Ok(())
    }

    /// Convenience: load, resolve, and validate in one call.
    ///
    /// A `.env` file beside the config file is loaded before the working
    /// directory's one, so either can hold the secrets.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = Self::load_from_file(path)?;
        if let Some(dir) = path.parent() {
            load_dotenv_from(&dir.join(".env"));
        }
        config.resolve_env_vars()?;
        config.validate()?;
        Ok(config)
    }

    /// Base URL the provider should send the browser back to after logout.
    pub fn public_url(&self) -> String {
        if let Some(ref url) = self.server.public_url {
            return url.trim_end_matches('/').to_string();
        }
        Url::parse(&self.oidc.redirect_uri)
            .map(|u| u.origin().ascii_serialization())
            .unwrap_or_default()
    }
}

fn require_url(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: field.into(),
            detail: "must not be empty".into(),
        });
    }
    Url::parse(value).map_err(|e| ConfigError::InvalidValue {
        field: field.into(),
        detail: format!("'{}' is not a valid URL: {}", value, e),
    })?;
    Ok(())
}

/// Load `.env` from the working directory into the process environment,
/// if present. Variables already set take precedence.
fn load_dotenv() {
    if let Ok(path) = dotenvy::dotenv() {
        info!(path = %path.display(), "loaded .env file");
    }
}

fn load_dotenv_from(path: &Path) {
    if path.is_file() && dotenvy::from_path(path).is_ok() {
        info!(path = %path.display(), "loaded .env file");
    }
}

/// Try to read an environment variable by name. Returns `Some(value)` on
/// success; logs a warning and returns `None` if the variable is unset.
fn resolve_optional_env(env_name: &str, field: &str) -> Option<String> {
    match std::env::var(env_name) {
        Ok(val) if !val.is_empty() => {
            debug!(field, env_name, "resolved env var");
            Some(val)
        }
        Ok(_) => {
            warn!(field, env_name, "env var is set but empty");
            None
        }
        Err(_) => {
            warn!(field, env_name, "env var not set");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn sample_toml() -> &'static str {
        r#"
[server]
listen = "127.0.0.1:8080"
log_level = "debug"

[oidc]
authority = "https://login.microsoftonline.com/contoso/v2.0"
client_id = "abc123"
client_secret_env = "MAILSIG_TEST_CLIENT_SECRET"
redirect_uri = "http://localhost:8080/getAToken"
scopes = ["User.Read"]

[directory]
endpoint = "https://graph.microsoft.com/v1.0/me"
timeout_secs = 10

[session]
secret_key_env = "MAILSIG_TEST_SECRET_KEY"
secure_cookie = true
"#
    }

    fn resolved() -> AppConfig {
        let mut config: AppConfig = toml::from_str(sample_toml()).unwrap();
        config.oidc.client_secret = Some("s3cret".into());
        config.session.secret_key = Some(SECRET.into());
        config
    }

    #[test]
    fn test_parse_full_config() {
        let config: AppConfig = toml::from_str(sample_toml()).expect("failed to parse toml");
        assert_eq!(config.server.listen, "127.0.0.1:8080");
        assert_eq!(config.oidc.client_id, "abc123");
        assert_eq!(config.directory.timeout_secs, 10);
        assert!(config.session.secure_cookie);
        assert_eq!(config.session.cookie_name, "mailsig.sid");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mailsig.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(sample_toml().as_bytes()).unwrap();

        let config = AppConfig::load_from_file(&path).expect("load_from_file failed");
        assert_eq!(config.server.log_level, "debug");
    }

    #[test]
    fn test_load_and_resolve_reads_dotenv_beside_config() {
        let dir = tempfile::tempdir().unwrap();
        let toml = sample_toml()
            .replace("MAILSIG_TEST_CLIENT_SECRET", "MAILSIG_DOTENV_CLIENT_SECRET")
            .replace("MAILSIG_TEST_SECRET_KEY", "MAILSIG_DOTENV_SECRET_KEY");
        std::fs::write(dir.path().join("mailsig.toml"), toml).unwrap();
        std::fs::write(
            dir.path().join(".env"),
            format!(
                "MAILSIG_DOTENV_CLIENT_SECRET=from-dotenv\nMAILSIG_DOTENV_SECRET_KEY={}\n",
                SECRET
            ),
        )
        .unwrap();

        let config = AppConfig::load_and_resolve(dir.path().join("mailsig.toml"))
            .expect("secrets from .env should resolve");
        assert_eq!(config.oidc.client_secret.as_deref(), Some("from-dotenv"));
        assert_eq!(config.session.secret_key.as_deref(), Some(SECRET));
    }

    #[test]
    fn test_file_not_found() {
        let result = AppConfig::load_from_file("/nonexistent/mailsig.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_defaults() {
        let minimal = r#"
[oidc]
authority = "https://login.example.com/tenant/v2.0"
client_id = "id"
redirect_uri = "https://sig.example.com/getAToken"
"#;
        let config: AppConfig = toml::from_str(minimal).unwrap();
        assert_eq!(config.server.listen, "0.0.0.0:5000");
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.oidc.client_secret_env, "CLIENT_SECRET");
        assert_eq!(config.oidc.scopes, vec!["User.Read"]);
        assert_eq!(config.directory.endpoint, "https://graph.microsoft.com/v1.0/me");
        assert_eq!(config.directory.timeout_secs, 30);
        assert_eq!(config.session.secret_key_env, "SECRET_KEY");
    }

    #[test]
    fn test_resolve_env_vars() {
        std::env::set_var("MAILSIG_TEST_CLIENT_SECRET", "s3cret");
        std::env::set_var("MAILSIG_TEST_SECRET_KEY", SECRET);

        let mut config: AppConfig = toml::from_str(sample_toml()).unwrap();
        config.resolve_env_vars().unwrap();
        assert_eq!(config.oidc.client_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.session.secret_key.as_deref(), Some(SECRET));
        assert!(config.validate().is_ok());

        std::env::remove_var("MAILSIG_TEST_CLIENT_SECRET");
        std::env::remove_var("MAILSIG_TEST_SECRET_KEY");
    }

    #[test]
    fn test_validate_rejects_missing_secret() {
        let mut config = resolved();
        config.oidc.client_secret = None;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EnvVarMissing { ref field, .. }) if field == "oidc.client_secret_env"
        ));
    }

    #[test]
    fn test_validate_rejects_short_session_key() {
        let mut config = resolved();
        config.session.secret_key = Some("short".into());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "session.secret_key_env"
        ));
    }

    #[test]
    fn test_validate_rejects_bad_redirect_uri() {
        let mut config = resolved();
        config.oidc.redirect_uri = "not a url".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "oidc.redirect_uri"
        ));
    }

    #[test]
    fn test_validate_rejects_callback_on_builtin_route() {
        for uri in [
            "https://sig.example.com/",
            "https://sig.example.com",
            "https://sig.example.com/login",
            "https://sig.example.com/logout",
            "https://sig.example.com/generate",
            "https://sig.example.com/health",
        ] {
            let mut config = resolved();
            config.oidc.redirect_uri = uri.into();
            assert!(
                matches!(
                    config.validate(),
                    Err(ConfigError::InvalidValue { ref field, .. }) if field == "oidc.redirect_uri"
                ),
                "{} should be rejected",
                uri
            );
        }

        let mut config = resolved();
        config.oidc.redirect_uri = "https://sig.example.com/auth/callback".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("AUTHORITY", "https://login.microsoftonline.com/contoso"),
            ("CLIENT_ID", "client"),
            ("CLIENT_SECRET", "secret"),
            ("REDIRECT_URI", "http://localhost:5000/getAToken"),
            ("PORT", "8081"),
            ("SECRET_KEY", SECRET),
        ]
        .into_iter()
        .collect();

        let config = AppConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.server.listen, "0.0.0.0:8081");
        assert_eq!(config.oidc.client_secret.as_deref(), Some("secret"));
        assert_eq!(config.session.secret_key.as_deref(), Some(SECRET));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_missing_authority() {
        let result = AppConfig::from_lookup(|_| None);
        assert!(matches!(
            result,
            Err(ConfigError::EnvVarMissing { ref var, .. }) if var == "AUTHORITY"
        ));
    }

    #[test]
    fn test_from_lookup_bad_port() {
        let result = AppConfig::from_lookup(|k| match k {
            "PORT" => Some("eighty".into()),
            _ => Some("x".into()),
        });
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "PORT"
        ));
    }

    #[test]
    fn test_callback_path_and_public_url() {
        let config = resolved();
        assert_eq!(config.oidc.callback_path(), "/getAToken");
        assert_eq!(config.public_url(), "http://localhost:8080");

        let mut config = resolved();
        config.server.public_url = Some("https://sig.example.com/".into());
        assert_eq!(config.public_url(), "https://sig.example.com");
    }

    #[test]
    fn test_issuer_url() {
        let mut config = resolved();
        assert_eq!(
            config.oidc.issuer_url(),
            "https://login.microsoftonline.com/contoso/v2.0"
        );

        config.oidc.authority = "https://login.microsoftonline.com/contoso".into();
        assert_eq!(
            config.oidc.issuer_url(),
            "https://login.microsoftonline.com/contoso/v2.0"
        );

        config.oidc.issuer = Some("https://idp.example.com/realms/main/".into());
        assert_eq!(config.oidc.issuer_url(), "https://idp.example.com/realms/main");
    }

    #[test]
    fn test_logout_endpoint() {
        let config = resolved();
        assert_eq!(
            config.oidc.logout_endpoint(),
            "https://login.microsoftonline.com/contoso/oauth2/v2.0/logout"
        );

        let mut config = resolved();
        config.oidc.authority = "https://login.microsoftonline.com/contoso/".into();
        assert_eq!(
            config.oidc.logout_endpoint(),
            "https://login.microsoftonline.com/contoso/oauth2/v2.0/logout"
        );
    }
}
