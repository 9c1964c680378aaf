//! mailsig core library.
//!
//! This crate holds everything that does not need an HTTP server:
//! configuration, the error taxonomy, the session [`UserProfile`], the
//! directory client and field mapper, and the signature formatter.

pub mod config;
pub mod directory;
pub mod errors;
pub mod profile;
pub mod signature;

// Re-exports for convenience.
pub use config::AppConfig;
pub use directory::{enrich_profile, GraphDirectory, ProfileDirectory};
pub use profile::{DirectoryProfile, UserProfile};
pub use signature::{format_signature, SignatureDocument};
