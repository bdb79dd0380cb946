pub mod payments;
pub mod webhook;

use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub ledger: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthStatus),
        (status = 503, description = "Service is unhealthy", body = HealthStatus)
    ),
    tag = "Health"
)]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let ledger_ok = match state.ledger.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Ledger health check failed");
            false
        }
    };

    let health_response = HealthStatus {
        status: if ledger_ok { "healthy" } else { "unhealthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        ledger: if ledger_ok { "connected" } else { "disconnected" }.to_string(),
    };

    let status_code = if ledger_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(health_response))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        payments::initiate,
        payments::status,
        webhook::probe,
        webhook::callback,
    ),
    components(schemas(
        HealthStatus,
        payments::InitiateRequest,
        payments::InitiateResponse,
        payments::TransactionStatusResponse,
        webhook::WebhookAck,
        crate::domain::TransactionStatus,
    )),
    tags(
        (name = "Payments", description = "Cash-in initiation and status polling"),
        (name = "Webhook", description = "Provider callbacks"),
        (name = "Health", description = "Service health")
    )
)]
pub struct ApiDoc;

pub async fn openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
