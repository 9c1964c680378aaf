//! Mapping of raw directory records onto [`DirectoryProfile`].

use serde_json::Value;

use crate::profile::DirectoryProfile;

/// Source key for the job title.
pub const JOB_TITLE_KEY: &str = "jobTitle";
/// Source key for the office location.
pub const OFFICE_LOCATION_KEY: &str = "officeLocation";
/// Source key for the mobile phone number.
pub const MOBILE_PHONE_KEY: &str = "mobilePhone";
/// Source key for the business phone list.
pub const BUSINESS_PHONES_KEY: &str = "businessPhones";
/// Source key for the street address.
pub const STREET_ADDRESS_KEY: &str = "streetAddress";

/// Translate a raw directory record into a [`DirectoryProfile`].
///
/// Total over any JSON value: missing keys, `null`s and values of the wrong
/// type all come out as absent fields.
pub fn map_directory_record(record: &Value) -> DirectoryProfile {
    DirectoryProfile {
        job_title: string_field(record, JOB_TITLE_KEY),
        office_location: string_field(record, OFFICE_LOCATION_KEY),
        mobile_phone: string_field(record, MOBILE_PHONE_KEY),
        business_phones: string_list_field(record, BUSINESS_PHONES_KEY),
        street_address: string_field(record, STREET_ADDRESS_KEY),
    }
}

fn string_field(record: &Value, key: &str) -> Option<String> {
    record.get(key).and_then(Value::as_str).map(str::to_string)
}

fn string_list_field(record: &Value, key: &str) -> Vec<String> {
    record
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
