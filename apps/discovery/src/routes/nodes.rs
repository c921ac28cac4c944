//! Node HTTP endpoints.

use actix_web::{HttpRequest, HttpResponse, ResponseError, web};
use serde::Deserialize;
use serde_json::json;

use super::{empty_ok, json_object, rejected, run_blocking};
use crate::config::Settings;
use crate::error::DiscoveryError;
use crate::middleware::{CallerIdentity, RawBody};
use crate::registry::Registry;

/// Query string of `GET /v1/proposals`.
#[derive(Debug, Deserialize)]
pub struct ProposalsQuery {
    pub node_key: Option<String>,
}

/// Query string of `GET /v1/nodes/{node_key}/availability`.
#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub window_minutes: Option<u32>,
}

pub(crate) fn peer_ip(req: &HttpRequest) -> Option<String> {
    req.peer_addr().map(|addr| addr.ip().to_string())
}

/// POST /v1/node_register
///
/// Publish the caller's service proposal.
#[tracing::instrument(skip_all)]
pub async fn node_register(
    req: HttpRequest,
    registry: web::Data<Registry>,
    caller: CallerIdentity,
    body: RawBody,
) -> HttpResponse {
    let payload = match json_object(&body) {
        Ok(payload) => payload,
        Err(e) => return rejected(&e, "node_register"),
    };

    let Some(proposal) = payload.get("service_proposal").filter(|p| !p.is_null()) else {
        return rejected(
            &DiscoveryError::InvalidInput("missing service_proposal".to_string()),
            "node_register",
        );
    };
    let Some(proposal_fields) = proposal.as_object() else {
        return rejected(
            &DiscoveryError::InvalidInput("service_proposal must be an object".to_string()),
            "node_register",
        );
    };
    let declared = match proposal_fields.get("provider_id") {
        None | Some(serde_json::Value::Null) => {
            return rejected(
                &DiscoveryError::InvalidInput("missing provider_id".to_string()),
                "node_register",
            );
        }
        Some(serde_json::Value::String(id)) => id.clone(),
        Some(_) => {
            return rejected(
                &DiscoveryError::InvalidInput("provider_id must be a string".to_string()),
                "node_register",
            );
        }
    };

    let proposal = proposal.clone();
    let source_ip = peer_ip(&req);
    let identity = caller.0;

    match run_blocking(move || registry.register_node(&identity, &declared, &proposal, source_ip))
        .await
    {
        Ok(()) => empty_ok(),
        Err(e) => rejected(&e, "node_register"),
    }
}

/// GET /v1/proposals
///
/// List published proposals, optionally for a single node.
#[tracing::instrument(skip(registry))]
pub async fn proposals(
    registry: web::Data<Registry>,
    query: web::Query<ProposalsQuery>,
) -> HttpResponse {
    // An empty filter lists everything.
    let node_key = query.into_inner().node_key.filter(|key| !key.is_empty());

    match run_blocking(move || registry.list_proposals(node_key.as_deref())).await {
        Ok(proposals) => HttpResponse::Ok().json(json!({ "proposals": proposals })),
        Err(e) => e.error_response(),
    }
}

/// POST /v1/node_send_stats
///
/// Heartbeat from a registered node.
#[tracing::instrument(skip_all)]
pub async fn node_send_stats(
    registry: web::Data<Registry>,
    caller: CallerIdentity,
) -> HttpResponse {
    let identity = caller.0;

    match run_blocking(move || registry.record_heartbeat(&identity)).await {
        Ok(()) => empty_ok(),
        Err(e) => rejected(&e, "node_send_stats"),
    }
}

/// GET /v1/nodes/{node_key}/availability
///
/// Heartbeat count and last heartbeat time within a trailing window.
#[tracing::instrument(skip(registry, settings))]
pub async fn availability(
    registry: web::Data<Registry>,
    settings: web::Data<Settings>,
    path: web::Path<String>,
    query: web::Query<AvailabilityQuery>,
) -> HttpResponse {
    let node_key = path.into_inner();
    let window_minutes = query
        .window_minutes
        .unwrap_or_else(|| settings.availability_window_minutes());

    match run_blocking(move || registry.availability(&node_key, window_minutes)).await {
        Ok(summary) => HttpResponse::Ok().json(summary),
        Err(e) => rejected(&e, "availability"),
    }
}
