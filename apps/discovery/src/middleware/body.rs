//! Raw request body shared between middleware and handlers.
//!
//! The signature covers the exact bytes on the wire, so the body is read
//! once, kept in the request extensions, and every later stage works from
//! that same buffer.

use actix_web::dev::{Payload, ServiceRequest};
use actix_web::web::Bytes;
use actix_web::{FromRequest, HttpMessage, HttpRequest, HttpResponse};
use futures_util::future::{Ready, ready};
use serde_json::json;

use crate::error::DiscoveryError;

/// Request body as received, before any parsing.
#[derive(Debug, Clone)]
pub struct RawBody(pub Bytes);

/// Read the payload into the request extensions, or reuse an earlier read.
pub(crate) async fn buffer_body(req: &mut ServiceRequest) -> Result<Bytes, actix_web::Error> {
    if let Some(RawBody(bytes)) = req.extensions().get::<RawBody>() {
        return Ok(bytes.clone());
    }

    let bytes = req.extract::<Bytes>().await?;
    req.extensions_mut().insert(RawBody(bytes.clone()));
    Ok(bytes)
}

/// JSON rendering of a payload read failure, keeping its status (413, 400).
pub(crate) fn payload_error_response(error: &actix_web::Error) -> HttpResponse {
    let status = error.as_response_error().status_code();
    HttpResponse::build(status).json(json!({ "error": error.to_string() }))
}

impl FromRequest for RawBody {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<RawBody>()
                .cloned()
                .ok_or_else(|| {
                    DiscoveryError::Internal("request body was not buffered".to_string()).into()
                }),
        )
    }
}
