//! Plain-text email signature formatting.

use std::fmt;

use crate::profile::UserProfile;

/// Label in front of the email line.
pub const EMAIL_LABEL: &str = "Email";
/// Label in front of the mobile phone line.
pub const MOBILE_LABEL: &str = "Mobil";
/// Label in front of the (first) business phone line.
pub const PHONE_LABEL: &str = "Telefon";

/// A rendered signature: an ordered list of text lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureDocument {
    lines: Vec<String>,
}

impl SignatureDocument {
    /// The lines in output order, blank separators included.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Join the lines with `\n`.
    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

impl fmt::Display for SignatureDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Build the signature for `profile`.
///
/// Line order: name, job title plus a blank line, one address (street
/// address wins over office location), email, mobile, first business phone,
/// and a closing blank line. Missing or empty fields are skipped.
pub fn format_signature(profile: &UserProfile) -> SignatureDocument {
    let mut lines = Vec::new();

    if let Some(name) = present(&profile.name) {
        lines.push(name.to_string());
    }

    if let Some(title) = present(&profile.job_title) {
        lines.push(title.to_string());
        lines.push(String::new());
    }

    if let Some(address) = present(&profile.street_address).or(present(&profile.office_location)) {
        lines.push(address.to_string());
    }

    if let Some(email) = present(&profile.email) {
        lines.push(format!("{EMAIL_LABEL}: {email}"));
    }

    if let Some(mobile) = present(&profile.mobile_phone) {
        lines.push(format!("{MOBILE_LABEL}: {mobile}"));
    }

    // Extra business numbers are dropped on purpose.
    if let Some(phone) = profile.business_phones.first() {
        lines.push(format!("{PHONE_LABEL}: {phone}"));
    }

    lines.push(String::new());

    SignatureDocument { lines }
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.is_empty())
}
