use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Transaction, TransactionStatus};
use crate::error::AppError;
use crate::use_cases::{InitiatePayment, PaymentIntent};
use crate::validation::{
    normalize_phone, sanitize_string, validate_amount, validate_identifier, validate_max_len,
    ValidationError, IDENTIFIER_MAX_LEN,
};
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InitiateRequest {
    /// Whole currency units, greater than zero.
    #[serde(default)]
    #[schema(value_type = i64)]
    pub amount: serde_json::Value,
    pub phone: String,
    pub creator_id: String,
    pub creator_uid: String,
    #[serde(default)]
    pub supporter_id: Option<String>,
}

impl InitiateRequest {
    pub fn into_intent(self) -> Result<PaymentIntent, ValidationError> {
        let amount = validate_amount(&self.amount)?;
        let phone = normalize_phone(&self.phone)?;
        let creator_id = validate_identifier("creatorId", &self.creator_id)?;
        let creator_uid = validate_identifier("creatorUid", &self.creator_uid)?;

        let supporter_id = match self.supporter_id.as_deref().map(sanitize_string) {
            Some(id) if !id.is_empty() => {
                validate_max_len("supporterId", &id, IDENTIFIER_MAX_LEN)?;
                Some(id)
            }
            _ => None,
        };

        Ok(PaymentIntent {
            amount,
            phone,
            creator_id,
            creator_uid,
            supporter_id,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InitiateResponse {
    #[serde(rename = "ref")]
    pub reference: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStatusResponse {
    #[serde(rename = "ref")]
    pub reference: String,
    pub status: TransactionStatus,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl From<Transaction> for TransactionStatusResponse {
    fn from(tx: Transaction) -> Self {
        Self {
            reference: tx.reference,
            status: tx.status,
            amount: tx.amount,
            created_at: tx.created_at,
            settled_at: tx.settled_at,
        }
    }
}

#[utoipa::path(
    post,
    path = "/payments/initiate",
    request_body = InitiateRequest,
    responses(
        (status = 200, description = "Cash-in requested; transaction pending", body = InitiateResponse),
        (status = 400, description = "Invalid input or provider rejected the request"),
        (status = 500, description = "Gateway or ledger unavailable")
    ),
    tag = "Payments"
)]
pub async fn initiate(
    State(state): State<AppState>,
    payload: Result<Json<InitiateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let intent = request.into_intent()?;

    let reference = InitiatePayment::new(state.gateway.clone(), state.ledger.clone())
        .execute(intent)
        .await?;

    Ok(Json(InitiateResponse { reference }))
}

#[utoipa::path(
    get,
    path = "/payments/status/{reference}",
    params(("reference" = String, Path, description = "Provider reference")),
    responses(
        (status = 200, description = "Current transaction state", body = TransactionStatusResponse),
        (status = 404, description = "Unknown reference")
    ),
    tag = "Payments"
)]
pub async fn status(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let tx = state
        .ledger
        .find_by_reference(&reference)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("transaction {}", reference)))?;

    Ok(Json(TransactionStatusResponse::from(tx)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(amount: serde_json::Value, supporter: Option<&str>) -> InitiateRequest {
        InitiateRequest {
            amount,
            phone: "078 123 4567".to_string(),
            creator_id: "jane".to_string(),
            creator_uid: "uid-jane".to_string(),
            supporter_id: supporter.map(str::to_string),
        }
    }

    #[test]
    fn builds_intent_from_valid_request() {
        let intent = request(json!(5000), Some("fan-1")).into_intent().unwrap();
        assert_eq!(intent.amount, 5000);
        assert_eq!(intent.phone, "0781234567");
        assert_eq!(intent.supporter_id.as_deref(), Some("fan-1"));
    }

    #[test]
    fn blank_supporter_becomes_anonymous() {
        let intent = request(json!(100), Some("  ")).into_intent().unwrap();
        assert_eq!(intent.supporter_id, None);
    }

    #[test]
    fn rejects_non_positive_amounts() {
        assert_eq!(
            request(json!(0), None).into_intent().unwrap_err().field,
            "amount"
        );
        assert!(request(json!(-5), None).into_intent().is_err());
    }

    #[test]
    fn status_response_uses_wire_names() {
        let tx = Transaction::pending(
            "ref-9".to_string(),
            100,
            "0781234567".to_string(),
            "jane".to_string(),
            "uid-jane".to_string(),
            None,
        );
        let value = serde_json::to_value(TransactionStatusResponse::from(tx)).unwrap();
        assert_eq!(value["ref"], "ref-9");
        assert_eq!(value["status"], "pending");
        assert!(value["settledAt"].is_null());
        assert!(value.get("phone").is_none());
    }
}
