//! Initiate payment use case.
//! Requests a cash-in from the gateway and records it as pending.

use std::sync::Arc;
use thiserror::Error;

use crate::domain::Transaction;
use crate::gateway::{GatewayError, PaymentGateway};
use crate::ports::{LedgerStore, RepositoryError};

/// Validated input for the InitiatePayment use case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub amount: i64,
    pub phone: String,
    pub creator_id: String,
    pub creator_uid: String,
    pub supporter_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum InitiateError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    /// The provider accepted the cash-in but the pending record was not stored.
    #[error("failed to record pending transaction {reference}: {source}")]
    Ledger {
        reference: String,
        source: RepositoryError,
    },
}

pub struct InitiatePayment {
    gateway: Arc<dyn PaymentGateway>,
    ledger: Arc<dyn LedgerStore>,
}

impl InitiatePayment {
    pub fn new(gateway: Arc<dyn PaymentGateway>, ledger: Arc<dyn LedgerStore>) -> Self {
        Self { gateway, ledger }
    }

    /// Returns the provider reference of the new pending transaction.
    pub async fn execute(&self, intent: PaymentIntent) -> Result<String, InitiateError> {
        let token = self.gateway.authorize().await?;
        let cash_in = self
            .gateway
            .initiate_cash_in(intent.amount, &intent.phone, &token)
            .await?;

        let tx = Transaction::pending(
            cash_in.reference,
            intent.amount,
            intent.phone,
            intent.creator_id,
            intent.creator_uid,
            intent.supporter_id,
        );

        self.ledger
            .insert_pending(&tx)
            .await
            .map_err(|source| {
                tracing::error!(
                    reference = %tx.reference,
                    amount = tx.amount,
                    error = %source,
                    "Cash-in accepted by provider but not recorded; needs reconciliation"
                );
                InitiateError::Ledger {
                    reference: tx.reference.clone(),
                    source,
                }
            })?;

        tracing::info!(
            reference = %tx.reference,
            amount = tx.amount,
            creator_id = %tx.creator_id,
            "Cash-in initiated"
        );

        Ok(tx.reference)
    }
}
