//! Auth service kinds for toolcast
//!
//! Auth services verify bearer tokens and expose their claims both as a
//! gate (a tool's `authRequired`) and as a value source for auth-backed
//! parameters.

pub mod google;

pub use google::{GoogleAuthConfig, GoogleAuthService};

/// Register every auth-service kind this crate provides.
///
/// Called once at program start, before configuration decoding.
pub fn register_all() {
    toolcast_core::kinds::register_auth_kind(google::KIND, google::decode_config);
}
