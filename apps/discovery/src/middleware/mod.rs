//! Middleware for the discovery service.
//!
//! Protected resources wrap `SignatureAuth` first and `RequireJsonObject`
//! second. Actix runs the last-registered wrapper outermost, so the payload
//! format check always precedes authentication.

pub mod auth;
pub mod body;
pub mod json;
pub mod rate_limit;

pub use auth::{AuthError, CallerIdentity, SignatureAuth};
pub use body::RawBody;
pub use json::RequireJsonObject;
pub use rate_limit::{RateLimitConfig, RateLimiter, general_limiter};
