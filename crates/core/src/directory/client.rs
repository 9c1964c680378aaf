//! HTTP client for the directory `/me` endpoint and best-effort enrichment.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::mapper::map_directory_record;
use crate::config::DirectoryConfig;
use crate::errors::DirectoryError;
use crate::profile::DirectoryProfile;

/// Source of raw directory records for the owner of an access token.
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    /// Fetch the raw record. Anything but a 200 with a JSON object body is
    /// an error.
    async fn fetch_record(&self, access_token: &str) -> Result<Value, DirectoryError>;
}

/// Directory client for a Microsoft Graph style `/me` endpoint.
#[derive(Clone)]
pub struct GraphDirectory {
    http: reqwest::Client,
    endpoint: String,
}

impl GraphDirectory {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, DirectoryError> {
        let endpoint = endpoint.into();
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DirectoryError::Transport(e.to_string()))?;
        info!(endpoint = %endpoint, timeout_secs = timeout.as_secs(), "created GraphDirectory");
        Ok(Self { http, endpoint })
    }

    pub fn from_config(config: &DirectoryConfig) -> Result<Self, DirectoryError> {
        Self::new(
            config.endpoint.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ProfileDirectory for GraphDirectory {
    #[instrument(skip(self, access_token), fields(endpoint = %self.endpoint))]
    async fn fetch_record(&self, access_token: &str) -> Result<Value, DirectoryError> {
        let resp = self
            .http
            .get(&self.endpoint)
            .bearer_auth(access_token)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .send()
            .await?;

        let status = resp.status();
        if status != StatusCode::OK {
            return Err(DirectoryError::Status {
                status: status.as_u16(),
            });
        }

        let record: Value = resp.json().await?;
        if !record.is_object() {
            return Err(DirectoryError::Decode(
                "expected a JSON object at the top level".into(),
            ));
        }

        debug!(
            keys = record.as_object().map(|o| o.len()).unwrap_or(0),
            "fetched directory record"
        );
        Ok(record)
    }
}

/// How a directory enrichment attempt ended.
#[derive(Debug)]
pub enum EnrichmentOutcome {
    /// The record was fetched and mapped.
    Enriched,
    /// No access token was issued, so there was nothing to ask with.
    Skipped,
    /// The lookup failed; the profile stays as the claims left it.
    Failed(DirectoryError),
}

/// Result of [`enrich_profile`]: the mapped attributes (if any) and what
/// happened.
#[derive(Debug)]
pub struct Enrichment {
    pub profile: Option<DirectoryProfile>,
    pub outcome: EnrichmentOutcome,
}

impl Enrichment {
    pub fn is_enriched(&self) -> bool {
        matches!(self.outcome, EnrichmentOutcome::Enriched)
    }
}

/// Look up and map the directory record for `access_token`.
///
/// Never fails: errors are logged at `warn` and reported as
/// [`EnrichmentOutcome::Failed`].
pub async fn enrich_profile(
    directory: &dyn ProfileDirectory,
    access_token: Option<&str>,
) -> Enrichment {
    let Some(token) = access_token.filter(|t| !t.is_empty()) else {
        debug!("no access token, skipping directory lookup");
        return Enrichment {
            profile: None,
            outcome: EnrichmentOutcome::Skipped,
        };
    };

    match directory.fetch_record(token).await {
        Ok(record) => {
            let profile = map_directory_record(&record);
            debug!(
                has_job_title = profile.job_title.is_some(),
                business_phones = profile.business_phones.len(),
                "directory record mapped"
            );
            Enrichment {
                profile: Some(profile),
                outcome: EnrichmentOutcome::Enriched,
            }
        }
        Err(e) => {
            warn!(error = %e, "directory lookup failed, continuing without enrichment");
            Enrichment {
                profile: None,
                outcome: EnrichmentOutcome::Failed(e),
            }
        }
    }
}
