//! Directory lookups that enrich a signed-in user's profile.
//!
//! The flow is:
//! 1. [`ProfileDirectory::fetch_record`] pulls the raw JSON record for the
//!    access token's owner
//! 2. [`map_directory_record`] normalizes the provider-specific keys
//! 3. [`enrich_profile`] wraps both and reports the outcome instead of
//!    failing, so a broken directory never blocks a login

pub mod client;
pub mod mapper;

pub use client::{enrich_profile, Enrichment, EnrichmentOutcome, GraphDirectory, ProfileDirectory};
pub use mapper::map_directory_record;
