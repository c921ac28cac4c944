//! Discovery Service
//!
//! Serves the node directory, session accounting and identity endpoints over
//! plain HTTP. Terminate TLS in front of this process.

use std::sync::Arc;

use actix_web::{App, HttpServer, middleware, web};
use discovery_service::{
    config::Settings,
    identity::{IdentityVerifier, Secp256k1Recovery},
    middleware::{RateLimitConfig, general_limiter},
    registry::Registry,
    routes,
    storage::Storage,
    telemetry,
};
use tracing_actix_web::TracingLogger;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize tracing first
    telemetry::init_tracing();

    // Load and validate settings
    let settings = Settings::from_env();
    if let Err(message) = settings.validate() {
        tracing::error!("{message}");
        std::process::exit(1);
    }

    // Initialize storage
    let storage = match Storage::open(settings.db_path()) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Failed to open storage database");
            std::process::exit(1);
        }
    };

    let addr = settings.socket_addr();
    let rate_limit = RateLimitConfig::from_env();

    tracing::info!(
        addr = %addr,
        db_path = %settings.db_path().display(),
        body_limit_bytes = settings.body_limit_bytes(),
        proposal_ttl_secs = settings.proposal_ttl().map(|ttl| ttl.as_secs()),
        rate_limit_per_second = rate_limit.per_second,
        rate_limit_burst = rate_limit.burst,
        "Starting discovery service"
    );

    let registry_data = web::Data::new(Registry::new(storage, &settings));
    let verifier_data: web::Data<dyn IdentityVerifier> =
        web::Data::from(Arc::new(Secp256k1Recovery) as Arc<dyn IdentityVerifier>);
    let payload_config = web::PayloadConfig::new(settings.body_limit_bytes());
    let settings_data = web::Data::new(settings);

    HttpServer::new(move || {
        App::new()
            // Rate limiting
            .wrap(general_limiter(&rate_limit))
            // Request tracing
            .wrap(TracingLogger::default())
            // Default headers
            .wrap(middleware::DefaultHeaders::new().add(("X-Service", "discovery")))
            // Shared state
            .app_data(payload_config.clone())
            .app_data(settings_data.clone())
            .app_data(registry_data.clone())
            .app_data(verifier_data.clone())
            // Routes
            .configure(routes::configure)
    })
    .bind(addr)?
    .run()
    .await?;

    // Shutdown tracing
    telemetry::shutdown_tracing();

    Ok(())
}
