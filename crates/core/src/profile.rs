//! The user profile held in each browser session.

use serde::{Deserialize, Serialize};

/// Attributes of the signed-in user.
///
/// `name`, `preferred_username` and `email` come from the ID token; the rest
/// is filled in (best-effort) from the directory. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub preferred_username: Option<String>,
    /// Canonical email; the provider's `preferred_username`.
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub office_location: Option<String>,
    #[serde(default)]
    pub street_address: Option<String>,
    #[serde(default)]
    pub mobile_phone: Option<String>,
    #[serde(default)]
    pub business_phones: Vec<String>,
}

/// Directory-sourced attributes, as produced by
/// [`map_directory_record`](crate::directory::map_directory_record).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryProfile {
    pub job_title: Option<String>,
    pub office_location: Option<String>,
    pub mobile_phone: Option<String>,
    pub business_phones: Vec<String>,
    pub street_address: Option<String>,
}

impl UserProfile {
    /// Build a profile from ID token claims.
    ///
    /// The provider's `preferred_username` doubles as the email address.
    pub fn from_claims(name: Option<String>, preferred_username: Option<String>) -> Self {
        Self {
            name,
            email: preferred_username.clone(),
            preferred_username,
            ..Default::default()
        }
    }

    /// Overwrite the directory-owned fields with `directory`.
    ///
    /// Absent values clear the corresponding field; claim-derived fields are
    /// left alone.
    pub fn apply_directory(&mut self, directory: DirectoryProfile) {
        self.job_title = directory.job_title;
        self.office_location = directory.office_location;
        self.mobile_phone = directory.mobile_phone;
        self.business_phones = directory.business_phones;
        self.street_address = directory.street_address;
    }

    /// Name to greet the user with on the landing page.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.preferred_username.as_deref())
            .unwrap_or("")
    }
}
