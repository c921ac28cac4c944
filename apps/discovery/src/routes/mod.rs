//! HTTP routes for the discovery service.
//!
//! Routes are organized by resource:
//! - `nodes`: node registration, proposal discovery, heartbeats, availability
//! - `sessions`: consumer session statistics
//! - `identities`: identity claims and `whoami`
//! - `health`: health check and build info
//!
//! Signed endpoints are registered as a method-guarded resource carrying the
//! auth stack, followed by an unguarded resource on the same path that answers
//! 405. A request with the wrong method therefore never reaches the payload or
//! signature checks.

pub mod health;
pub mod identities;
pub mod nodes;
pub mod sessions;

use actix_web::dev::HttpServiceFactory;
use actix_web::{FromRequest, Handler, HttpResponse, Responder, ResponseError, guard, web};
use serde_json::{Map, Value};

use crate::error::{DiscoveryError, DiscoveryResult};
use crate::middleware::{RawBody, RequireJsonObject, SignatureAuth};

pub use health::{build_info, health};

/// Configure every route, the JSON 404 fallback and query error mapping.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::QueryConfig::default().error_handler(|err, _req| {
        DiscoveryError::InvalidInput(err.to_string()).into()
    }));

    health::configure(cfg);

    signed_json(cfg, "/v1/node_register", nodes::node_register);
    signed_json(cfg, "/v1/node_send_stats", nodes::node_send_stats);
    signed_json(cfg, "/v1/sessions/{session_key}/stats", sessions::session_stats);
    signed(cfg, "/v1/identities", guard::Post(), identities::claim_identity);
    signed(cfg, "/v1/me", guard::Get(), identities::me);

    cfg.service(public_get("/v1/proposals", nodes::proposals))
        .service(public_get(
            "/v1/nodes/{node_key}/availability",
            nodes::availability,
        ))
        .default_service(web::to(not_found));
}

/// POST endpoint requiring a JSON object body and a valid signature.
fn signed_json<F, Args>(cfg: &mut web::ServiceConfig, path: &str, handler: F)
where
    F: Handler<Args>,
    Args: FromRequest + 'static,
    F::Output: Responder + 'static,
{
    cfg.service(
        web::resource(path)
            .guard(guard::Post())
            .wrap(SignatureAuth)
            .wrap(RequireJsonObject)
            .to(handler),
    )
    .service(web::resource(path).to(method_not_allowed));
}

/// Endpoint requiring a valid signature over whatever body is sent.
fn signed<G, F, Args>(cfg: &mut web::ServiceConfig, path: &str, method: G, handler: F)
where
    G: guard::Guard + 'static,
    F: Handler<Args>,
    Args: FromRequest + 'static,
    F::Output: Responder + 'static,
{
    cfg.service(
        web::resource(path)
            .guard(method)
            .wrap(SignatureAuth)
            .to(handler),
    )
    .service(web::resource(path).to(method_not_allowed));
}

fn public_get<F, Args>(path: &str, handler: F) -> impl HttpServiceFactory + 'static
where
    F: Handler<Args>,
    Args: FromRequest + 'static,
    F::Output: Responder + 'static,
{
    web::resource(path)
        .route(web::get().to(handler))
        .default_service(web::to(method_not_allowed))
}

/// Fallback for unknown paths.
pub async fn not_found() -> HttpResponse {
    DiscoveryError::NotFound.error_response()
}

/// Fallback for known paths called with the wrong method.
pub async fn method_not_allowed() -> HttpResponse {
    DiscoveryError::MethodNotAllowed.error_response()
}

/// Run a blocking registry operation on the blocking thread pool.
pub(crate) async fn run_blocking<T, F>(operation: F) -> DiscoveryResult<T>
where
    F: FnOnce() -> DiscoveryResult<T> + Send + 'static,
    T: Send + 'static,
{
    web::block(operation).await?
}

/// Parse the buffered body as a JSON object.
pub(crate) fn json_object(body: &RawBody) -> DiscoveryResult<Map<String, Value>> {
    serde_json::from_slice(&body.0).map_err(|_| DiscoveryError::InvalidPayload)
}

/// Empty JSON object, the success body of every mutating endpoint.
pub(crate) fn empty_ok() -> HttpResponse {
    HttpResponse::Ok().json(Value::Object(Map::new()))
}

/// Render an error and log domain rejections at `warn`.
///
/// 5xx responses are logged by `DiscoveryError::error_response` itself.
pub(crate) fn rejected(error: &DiscoveryError, action: &str) -> HttpResponse {
    if !error.status_code().is_server_error() {
        tracing::warn!(error = %error, action, "Request rejected");
    }
    error.error_response()
}
