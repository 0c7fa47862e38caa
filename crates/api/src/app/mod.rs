//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store backend selection and the stock adjuster
//! - `routes/`: HTTP routes + handlers (items, reference data, orders, dashboard)
//! - `dto.rs`: request DTOs and query-string parsing
//! - `errors.rs`: consistent JSON error responses

use std::sync::Arc;
use std::time::Duration;

use axum::{error_handling::HandleErrorLayer, routing::get, Extension, Router};
use tower::ServiceBuilder;

use stockroom_infra::StoreError;

use crate::config::AppConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router from configuration (public entrypoint used by `main.rs`).
pub async fn build_app(config: &AppConfig) -> Result<Router, StoreError> {
    let services = Arc::new(services::build_services(config).await?);
    Ok(router(&config.jwt_secret, config.request_timeout, services))
}

/// Build the router around already-wired services.
///
/// Requests that outlive `request_timeout` get a 503. Stock adjustments already
/// handed to the adjuster still finish in the background.
pub fn router(jwt_secret: &str, request_timeout: Duration, services: Arc<AppServices>) -> Router {
    let jwt = Arc::new(stockroom_auth::Hs256JwtValidator::new(jwt_secret.as_bytes()));
    let auth_state = middleware::AuthState { jwt };

    // Protected routes: require a valid bearer token.
    let protected = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(errors::handle_middleware_error))
                .timeout(request_timeout),
        )
}
