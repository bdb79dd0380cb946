use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::services::{CallbackEnvelope, CallbackOutcome, SettlementService, SIGNATURE_HEADER};
use crate::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub duplicate: bool,
}

/// Liveness probe used by the provider before delivering callbacks.
#[utoipa::path(
    head,
    path = "/payments/webhook",
    responses((status = 200, description = "Webhook endpoint is reachable")),
    tag = "Webhook"
)]
pub async fn probe() -> StatusCode {
    StatusCode::OK
}

#[utoipa::path(
    post,
    path = "/payments/webhook",
    responses(
        (status = 200, description = "Callback handled", body = WebhookAck),
        (status = 400, description = "Malformed callback body"),
        (status = 401, description = "Missing or invalid signature"),
        (status = 404, description = "Unknown reference"),
        (status = 500, description = "Ledger unavailable; provider should retry")
    ),
    tag = "Webhook"
)]
pub async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok());

    // Nothing in the body is trusted until the signature checks out.
    state.verifier.verify(&body, signature)?;

    let envelope: CallbackEnvelope = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("malformed callback: {}", e)))?;

    tracing::info!(
        reference = %envelope.data.reference,
        provider_status = %envelope.data.status,
        client = envelope.data.client.as_deref().unwrap_or(""),
        "Provider callback received"
    );

    let outcome = SettlementService::new(state.ledger.clone())
        .apply_callback(&envelope.data)
        .await?;

    Ok((
        StatusCode::OK,
        Json(WebhookAck {
            received: true,
            duplicate: matches!(outcome, CallbackOutcome::Duplicate(_)),
        }),
    ))
}
