// Crate-level lint configuration
// Allow noisy pedantic/cargo lints that aren't worth fixing individually
#![allow(clippy::multiple_crate_versions)] // Transitive deps, can't easily fix
#![allow(clippy::missing_errors_doc)] // Would require extensive doc changes
#![allow(clippy::missing_panics_doc)] // Would require extensive doc changes
#![allow(clippy::must_use_candidate)] // Too many false positives for internal APIs
#![allow(clippy::module_name_repetitions)] // Acceptable for clarity (e.g., DiscoveryError in error mod)
#![allow(clippy::doc_markdown)] // Too strict about backticks in docs
#![allow(clippy::missing_const_for_fn)] // Often debatable, runtime doesn't benefit

//! Discovery Service
//!
//! A directory for a provider network: nodes publish service proposals,
//! consumers discover them and report per-session bandwidth, and nodes send
//! periodic heartbeats used to judge availability.
//!
//! ## Authentication
//!
//! There are no accounts, passwords or tokens. Every protected request carries
//! a recoverable secp256k1 signature over its raw body:
//!
//! ```text
//! Authorization: Signature <base64(r || s || v)>
//! ```
//!
//! The caller's identity is the account address recovered from that
//! signature. Ownership rules are expressed in terms of it:
//!
//! - a node record can only be written by the identity it is keyed by
//! - a session belongs to the first identity that reported on it
//! - an identity can be claimed once
//!
//! ## Layout
//!
//! - [`identity`]: signature recovery behind the [`IdentityVerifier`] trait
//! - [`middleware`]: payload check, signature auth, rate limiting
//! - [`registry`]: node, session and identity rules over [`storage`]
//! - [`routes`]: the HTTP surface

pub mod config;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod registry;
pub mod routes;
pub mod storage;
pub mod test_support;

#[cfg(feature = "otel")]
pub mod telemetry;

#[cfg(not(feature = "otel"))]
pub mod telemetry {
    //! Stub telemetry module when OpenTelemetry is disabled.

    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    /// Initialize tracing with console output only.
    ///
    /// `LOG_FORMAT=json` switches to one JSON object per line.
    pub fn init_tracing() {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "discovery_service=info,actix_web=info".into());
        let json = super::telemetry_json_requested();

        tracing_subscriber::registry()
            .with(env_filter)
            .with((!json).then(tracing_subscriber::fmt::layer))
            .with(json.then(|| tracing_subscriber::fmt::layer().json()))
            .init();
    }

    /// No-op shutdown when OpenTelemetry is disabled.
    pub fn shutdown_tracing() {}
}

fn telemetry_json_requested() -> bool {
    std::env::var("LOG_FORMAT").is_ok_and(|value| value.trim().eq_ignore_ascii_case("json"))
}

// Re-export commonly used types
pub use config::Settings;
pub use error::{DiscoveryError, DiscoveryResult};
pub use identity::{Identity, IdentityVerifier, Secp256k1Recovery};
pub use registry::Registry;
pub use storage::Storage;
