//! Signature authentication across the protected endpoints.

mod common;

use actix_web::http::header::AUTHORIZATION;
use actix_web::{App, http::StatusCode, test};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use common::{TestContext, register_body, signed_post};
use discovery_service::registry::NodeRecord;
use discovery_service::test_support::{identity_of, sign_message, signing_key};
use serde_json::Value;

async fn error_for(header: &str) -> (StatusCode, String) {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().configure(ctx.configure())).await;

    let req = test::TestRequest::post()
        .uri("/v1/identities")
        .insert_header((AUTHORIZATION, header))
        .set_payload("{}")
        .to_request();
    let resp = test::call_service(&app, req).await;
    let status = resp.status();
    let body: Value = test::read_body_json(resp).await;
    (status, body["error"].as_str().unwrap_or_default().to_string())
}

#[actix_rt::test]
async fn malformed_headers_are_rejected_with_reason() {
    let cases = [
        (
            "Signature",
            "invalid Authorization header value provided, correct format: Signature <signature_base64_encoded>",
        ),
        ("Bearer abc", "authentication type must be Signature"),
        ("Signature !!!", "signature must be base64 encoded"),
        ("Signature AAAA", "invalid signature format"),
    ];

    for (header, reason) in cases {
        let (status, error) = error_for(header).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{header}");
        assert!(error.starts_with(reason), "{header}: {error}");
    }
}

#[actix_rt::test]
async fn errors_never_leak_identity() {
    let key = signing_key(1);
    let mut signature = sign_message(&key, b"{}");
    signature[64] = 9;

    let (status, error) = error_for(&format!("Signature {}", BASE64.encode(&signature))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(!error.contains("0x"));
}

#[actix_rt::test]
async fn legacy_recovery_byte_is_accepted() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().configure(ctx.configure())).await;
    let key = signing_key(1);

    let mut signature = sign_message(&key, b"");
    signature[64] += 27;
    let req = test::TestRequest::get()
        .uri("/v1/me")
        .insert_header((AUTHORIZATION, format!("Signature {}", BASE64.encode(&signature))))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["identity"], identity_of(&key).as_str());
}

#[actix_rt::test]
async fn body_changed_after_signing_recovers_someone_else() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().configure(ctx.configure())).await;
    let key = signing_key(1);
    let node_key = identity_of(&key);

    // Signed over one body, sent with another.
    let signed = register_body(node_key.as_str());
    let sent = signed.replace("openvpn", "wireguard");
    let req = test::TestRequest::post()
        .uri("/v1/node_register")
        .insert_header((
            AUTHORIZATION,
            format!("Signature {}", BASE64.encode(sign_message(&key, signed.as_bytes()))),
        ))
        .set_payload(sent)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(ctx.storage.list_nodes::<NodeRecord>().unwrap().is_empty());
}

#[actix_rt::test]
async fn content_type_is_not_required() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().configure(ctx.configure())).await;
    let key = signing_key(1);

    let req = signed_post("/v1/node_register", &key, &register_body(identity_of(&key).as_str()))
        .insert_header(("content-type", "text/plain"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn oversized_body_is_rejected() {
    let settings = discovery_service::Settings::for_tests().with_body_limit_bytes(64);
    let ctx = TestContext::with_settings(settings);
    let app = test::init_service(App::new().configure(ctx.configure())).await;
    let key = signing_key(1);

    let body = register_body(identity_of(&key).as_str());
    assert!(body.len() > 64);
    let resp = test::call_service(&app, signed_post("/v1/node_register", &key, &body).to_request()).await;
    assert!(resp.status().is_client_error());
    assert!(ctx.storage.list_nodes::<NodeRecord>().unwrap().is_empty());
}
