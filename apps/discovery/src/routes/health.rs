//! Health check and build info endpoints.
//!
//! These endpoints are public (no signature required).

use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};

const SERVICE_NAME: &str = "discovery-service";

/// Health check response.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

/// Build information response.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfoResponse {
    pub service: String,
    pub version: String,
    pub git_sha: String,
    pub build_time: String,
}

/// GET /health
///
/// Returns service health status. Used by load balancers and monitoring.
#[tracing::instrument]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        service: SERVICE_NAME.to_string(),
    })
}

/// GET /build-info
///
/// Returns build metadata for deployment verification.
#[tracing::instrument]
pub async fn build_info() -> HttpResponse {
    HttpResponse::Ok().json(BuildInfoResponse {
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_sha: env!("GIT_SHA").to_string(),
        build_time: env!("BUILD_TIME").to_string(),
    })
}

/// Configure health routes on the given scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(super::public_get("/health", health))
        .service(super::public_get("/build-info", build_info));
}
