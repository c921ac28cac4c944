//! Payload format check for JSON endpoints.
//!
//! Rejects any body that is not a JSON object with 400 before identity is
//! considered. No `Content-Type` header is required.

use std::rc::Rc;

use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready};
use actix_web::{Error, ResponseError};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use serde_json::{Map, Value};

use super::body::{buffer_body, payload_error_response};
use crate::error::DiscoveryError;

/// Whether `body` parses as a JSON object.
pub fn is_json_object(body: &[u8]) -> bool {
    serde_json::from_slice::<Map<String, Value>>(body).is_ok()
}

/// Middleware requiring a JSON object body.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequireJsonObject;

impl<S, B> Transform<S, ServiceRequest> for RequireJsonObject
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireJsonObjectMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireJsonObjectMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct RequireJsonObjectMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RequireJsonObjectMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            let body = match buffer_body(&mut req).await {
                Ok(body) => body,
                Err(e) => {
                    tracing::debug!(error = %e, "Failed to read request body");
                    let response = payload_error_response(&e);
                    return Ok(req.into_response(response).map_into_right_body());
                }
            };

            if !is_json_object(&body) {
                tracing::debug!(path = %req.path(), "Rejected non-object JSON payload");
                let response = DiscoveryError::InvalidPayload.error_response();
                return Ok(req.into_response(response).map_into_right_body());
            }

            service
                .call(req)
                .await
                .map(ServiceResponse::map_into_left_body)
        })
    }
}
