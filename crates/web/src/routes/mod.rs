//! HTTP route modules.

pub mod auth;
pub mod signature;
pub mod status;
