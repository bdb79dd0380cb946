use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::{Transaction, TransactionStatus};
use crate::ports::{LedgerStore, RepositoryError, TransitionOutcome};

/// Status value the provider sends for a completed cash-in.
pub const SUCCESS_STATUS: &str = "successful";

/// Callback envelope posted by the provider. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackEnvelope {
    pub data: CallbackData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackData {
    #[serde(rename = "ref")]
    pub reference: String,
    pub status: String,
    #[serde(default)]
    pub client: Option<String>,
}

impl CallbackData {
    pub fn is_success(&self) -> bool {
        self.status.trim().eq_ignore_ascii_case(SUCCESS_STATUS)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    Settled(Transaction),
    MarkedFailed(Transaction),
    /// The transaction was already terminal; nothing was written.
    Duplicate(TransactionStatus),
}

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("no transaction for reference {0}")]
    UnknownReference(String),
    #[error("ledger error: {0}")]
    Ledger(#[from] RepositoryError),
}

/// Applies provider callbacks to the ledger, at most once per reference.
#[derive(Clone)]
pub struct SettlementService {
    ledger: Arc<dyn LedgerStore>,
}

impl SettlementService {
    pub fn new(ledger: Arc<dyn LedgerStore>) -> Self {
        Self { ledger }
    }

    pub async fn apply_callback(
        &self,
        callback: &CallbackData,
    ) -> Result<CallbackOutcome, SettlementError> {
        let reference = callback.reference.as_str();

        let current = self
            .ledger
            .find_by_reference(reference)
            .await?
            .ok_or_else(|| SettlementError::UnknownReference(reference.to_string()))?;

        // Early exit only. The store's conditional transition decides races.
        if current.is_terminal() {
            tracing::info!(
                reference,
                status = %current.status,
                "Duplicate callback for terminal transaction ignored"
            );
            return Ok(CallbackOutcome::Duplicate(current.status));
        }

        let outcome = if callback.is_success() {
            self.ledger.settle(reference, Utc::now()).await?
        } else {
            self.ledger.mark_failed(reference).await?
        };

        match outcome {
            TransitionOutcome::Applied(tx) if tx.status == TransactionStatus::Successful => {
                tracing::info!(
                    reference,
                    amount = tx.amount,
                    creator_uid = %tx.creator_uid,
                    "Transaction settled"
                );
                Ok(CallbackOutcome::Settled(tx))
            }
            TransitionOutcome::Applied(tx) => {
                tracing::info!(
                    reference,
                    provider_status = %callback.status,
                    "Transaction marked failed"
                );
                Ok(CallbackOutcome::MarkedFailed(tx))
            }
            TransitionOutcome::AlreadyTerminal(status) => {
                tracing::info!(reference, %status, "Lost settlement race to concurrent callback");
                Ok(CallbackOutcome::Duplicate(status))
            }
            TransitionOutcome::NotFound => {
                Err(SettlementError::UnknownReference(reference.to_string()))
            }
        }
    }
}
