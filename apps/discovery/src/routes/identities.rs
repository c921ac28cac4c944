//! Identity endpoints.

use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};

use super::{empty_ok, rejected, run_blocking};
use crate::middleware::CallerIdentity;
use crate::registry::Registry;

/// Response of `GET /v1/me`.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct WhoAmIResponse {
    pub identity: String,
}

/// POST /v1/identities
///
/// Record that the caller controls its key. Succeeds once per identity.
#[tracing::instrument(skip_all)]
pub async fn claim_identity(registry: web::Data<Registry>, caller: CallerIdentity) -> HttpResponse {
    let identity = caller.0;

    match run_blocking(move || registry.claim_identity(&identity)).await {
        Ok(_) => empty_ok(),
        Err(e) => rejected(&e, "claim_identity"),
    }
}

/// GET /v1/me
///
/// Echo the identity recovered from the request signature.
#[tracing::instrument(skip_all)]
pub async fn me(caller: CallerIdentity) -> HttpResponse {
    HttpResponse::Ok().json(WhoAmIResponse {
        identity: caller.0.to_string(),
    })
}
