//! Session statistics endpoint.

use actix_web::{HttpRequest, HttpResponse, web};
use serde_json::{Map, Value};

use super::nodes::peer_ip;
use super::{empty_ok, json_object, rejected, run_blocking};
use crate::error::{DiscoveryError, DiscoveryResult};
use crate::middleware::{CallerIdentity, RawBody};
use crate::registry::Registry;

fn counter(payload: &Map<String, Value>, field: &str) -> DiscoveryResult<i64> {
    match payload.get(field) {
        None | Some(Value::Null) => Err(DiscoveryError::InvalidInput(format!("missing {field}"))),
        Some(value) => value
            .as_i64()
            .ok_or_else(|| DiscoveryError::InvalidInput(format!("{field} must be an integer"))),
    }
}

/// POST /v1/sessions/{session_key}/stats
///
/// Cumulative byte counters reported by the session's consumer.
#[tracing::instrument(skip(req, registry, caller, body))]
pub async fn session_stats(
    req: HttpRequest,
    registry: web::Data<Registry>,
    caller: CallerIdentity,
    path: web::Path<String>,
    body: RawBody,
) -> HttpResponse {
    let session_key = path.into_inner();

    let counters = json_object(&body).and_then(|payload| {
        Ok((
            counter(&payload, "bytes_sent")?,
            counter(&payload, "bytes_received")?,
        ))
    });
    let (bytes_sent, bytes_received) = match counters {
        Ok(counters) => counters,
        Err(e) => return rejected(&e, "session_stats"),
    };

    let source_ip = peer_ip(&req);
    let identity = caller.0;

    match run_blocking(move || {
        registry.report_client_stats(&identity, &session_key, bytes_sent, bytes_received, source_ip)
    })
    .await
    {
        Ok(_) => empty_ok(),
        Err(e) => rejected(&e, "session_stats"),
    }
}
