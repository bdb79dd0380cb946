pub mod adapters;
pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod middleware;
pub mod ports;
pub mod services;
pub mod use_cases;
pub mod validation;

use std::sync::Arc;

use axum::{
    http::{HeaderName, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::AllowedOrigins;
use crate::gateway::PaymentGateway;
use crate::ports::LedgerStore;
use crate::services::SignatureVerifier;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<dyn LedgerStore>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub verifier: SignatureVerifier,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api-docs/openapi.json", get(handlers::openapi_spec))
        .route("/payments/initiate", post(handlers::payments::initiate))
        .route("/payments/status/:reference", get(handlers::payments::status))
        .route(
            "/payments/webhook",
            post(handlers::webhook::callback).head(handlers::webhook::probe),
        )
        .layer(axum::middleware::from_fn(
            middleware::request_logger_middleware,
        ))
        .with_state(state)
}

/// CORS for the supporter-facing UI.
pub fn cors_layer(origins: &AllowedOrigins) -> CorsLayer {
    let allow_origin = match origins {
        AllowedOrigins::Any => AllowOrigin::from(Any),
        AllowedOrigins::List(list) => AllowOrigin::list(
            list.iter()
                .filter_map(|origin| HeaderValue::from_str(origin).ok()),
        ),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::HEAD])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            HeaderName::from_static("x-provider-signature"),
        ])
}
