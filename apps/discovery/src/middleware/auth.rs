//! Signature authentication middleware.
//!
//! Callers sign the raw request body and send the signature as
//! `Authorization: Signature <base64(r || s || v)>`. The recovered address
//! becomes the request's `CallerIdentity`; nothing else identifies a caller.

use std::rc::Rc;

use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{Payload, Service, ServiceRequest, ServiceResponse, Transform, forward_ready};
use actix_web::http::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest, ResponseError, web};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use thiserror::Error;

use super::body::{buffer_body, payload_error_response};
use crate::error::DiscoveryError;
use crate::identity::{Identity, IdentityVerifier, SignatureError};

const SCHEME: &str = "Signature";

/// Reasons a request carries no usable identity. All map to 401.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing Authorization in request header")]
    MissingCredential,

    #[error(
        "invalid Authorization header value provided, correct format: Signature <signature_base64_encoded>"
    )]
    MalformedCredential,

    #[error("authentication type must be Signature")]
    UnsupportedScheme,

    #[error("signature was not provided")]
    EmptySignature,

    #[error("signature must be base64 encoded: {0}")]
    BadEncoding(String),

    #[error("invalid signature format: {0}")]
    InvalidSignatureFormat(#[from] SignatureError),
}

/// Decode the signature bytes carried by an `Authorization` header.
pub fn parse_authorization(header: Option<&HeaderValue>) -> Result<Vec<u8>, AuthError> {
    let value = match header {
        Some(value) if !value.is_empty() => value,
        _ => return Err(AuthError::MissingCredential),
    };
    let value = value.to_str().map_err(|_| AuthError::MalformedCredential)?;

    let parts: Vec<&str> = value.split(' ').collect();
    let [scheme, encoded] = parts.as_slice() else {
        return Err(AuthError::MalformedCredential);
    };

    if *scheme != SCHEME {
        return Err(AuthError::UnsupportedScheme);
    }
    if encoded.is_empty() {
        return Err(AuthError::EmptySignature);
    }

    BASE64
        .decode(encoded)
        .map_err(|e| AuthError::BadEncoding(e.to_string()))
}

/// Recover the caller behind `body` from the request headers.
pub fn authenticate(
    headers: &HeaderMap,
    body: &[u8],
    verifier: &dyn IdentityVerifier,
) -> Result<Identity, AuthError> {
    let signature = parse_authorization(headers.get(AUTHORIZATION))?;
    Ok(verifier.recover(body, &signature)?)
}

/// Identity recovered for the current request.
#[derive(Debug, Clone)]
pub struct CallerIdentity(pub Identity);

impl FromRequest for CallerIdentity {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<CallerIdentity>()
                .cloned()
                .ok_or_else(|| DiscoveryError::from(AuthError::MissingCredential).into()),
        )
    }
}

/// Middleware that authenticates every request to the wrapped resource.
///
/// Requires `web::Data<dyn IdentityVerifier>` in app data.
#[derive(Clone, Copy, Debug, Default)]
pub struct SignatureAuth;

impl<S, B> Transform<S, ServiceRequest> for SignatureAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = SignatureAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SignatureAuthMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct SignatureAuthMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for SignatureAuthMiddleware<S>
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
            let Some(verifier) = req.app_data::<web::Data<dyn IdentityVerifier>>().cloned() else {
                tracing::error!("No identity verifier registered in app data");
                let response =
                    DiscoveryError::Internal("identity verifier not configured".to_string())
                        .error_response();
                return Ok(req.into_response(response).map_into_right_body());
            };

            let body = match buffer_body(&mut req).await {
                Ok(body) => body,
                Err(e) => {
                    tracing::debug!(error = %e, "Failed to read request body");
                    let response = payload_error_response(&e);
                    return Ok(req.into_response(response).map_into_right_body());
                }
            };

            match authenticate(req.headers(), &body, verifier.get_ref()) {
                Ok(identity) => {
                    req.extensions_mut().insert(CallerIdentity(identity));
                }
                Err(e) => {
                    tracing::warn!(path = %req.path(), error = %e, "Rejected unauthenticated request");
                    let response = DiscoveryError::from(e).error_response();
                    return Ok(req.into_response(response).map_into_right_body());
                }
            }

            service
                .call(req)
                .await
                .map(ServiceResponse::map_into_left_body)
        })
    }
}
