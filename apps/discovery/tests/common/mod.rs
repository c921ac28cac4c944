//! Shared utilities for discovery service integration tests.
//!
//! Every context owns a fresh redb file in a temporary directory, so tests
//! never share state.
#![allow(dead_code)]

use actix_web::http::header::AUTHORIZATION;
use actix_web::test::TestRequest;
use actix_web::web;
use discovery_service::test_support::{authorization_header, verifier_data};
use discovery_service::{Registry, Settings, Storage, routes};
use k256::ecdsa::SigningKey;
use tempfile::TempDir;

/// Isolated service state backed by a temporary database.
pub struct TestContext {
    _dir: TempDir,
    pub settings: Settings,
    pub storage: Storage,
    pub registry: Registry,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_settings(Settings::for_tests())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let dir = TempDir::new().unwrap();
        let storage = Storage::open(&dir.path().join("discovery.redb")).unwrap();
        let registry = Registry::new(storage.clone(), &settings);

        Self {
            _dir: dir,
            settings,
            storage,
            registry,
        }
    }

    /// App data and routes, wired the way the binary wires them.
    pub fn configure(&self) -> impl FnOnce(&mut web::ServiceConfig) + 'static {
        let settings = self.settings.clone();
        let registry = self.registry.clone();

        move |cfg| {
            cfg.app_data(web::PayloadConfig::new(settings.body_limit_bytes()))
                .app_data(web::Data::new(settings))
                .app_data(web::Data::new(registry))
                .app_data(verifier_data());
            routes::configure(cfg);
        }
    }
}

/// POST `body` to `uri`, signed by `key`.
pub fn signed_post(uri: &str, key: &SigningKey, body: &str) -> TestRequest {
    TestRequest::post()
        .uri(uri)
        .insert_header((AUTHORIZATION, authorization_header(key, body.as_bytes())))
        .set_payload(body.to_string())
}

/// GET `uri` with a signature over the empty body.
pub fn signed_get(uri: &str, key: &SigningKey) -> TestRequest {
    TestRequest::get()
        .uri(uri)
        .insert_header((AUTHORIZATION, authorization_header(key, b"")))
}

/// POST `body` to `uri` without credentials.
pub fn unsigned_post(uri: &str, body: &str) -> TestRequest {
    TestRequest::post().uri(uri).set_payload(body.to_string())
}

/// Registration body for `provider_id`.
pub fn register_body(provider_id: &str) -> String {
    serde_json::json!({
        "service_proposal": {
            "id": 1,
            "format": "service-proposal/v1",
            "provider_id": provider_id,
            "service_type": "openvpn",
            "service_definition": { "location": { "country": "LT" } }
        }
    })
    .to_string()
}
