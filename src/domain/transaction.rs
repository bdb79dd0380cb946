//! Transaction domain entity.
//! Framework-agnostic representation of one cash-in attempt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supporter id recorded when the payer is not signed in.
pub const ANONYMOUS_SUPPORTER: &str = "anonymous";

/// Type tag carried by every transaction this service creates.
pub const SUPPORT_KIND: &str = "support";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Successful,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Successful => "successful",
            TransactionStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown transaction status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for TransactionStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "successful" => Ok(TransactionStatus::Successful),
            "failed" => Ok(TransactionStatus::Failed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Domain entity representing a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub reference: String,
    pub amount: i64,
    pub phone: String,
    pub creator_id: String,
    pub creator_uid: String,
    pub supporter_id: String,
    pub status: TransactionStatus,
    pub kind: String,
    pub created_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// A freshly initiated transaction awaiting the provider callback.
    pub fn pending(
        reference: String,
        amount: i64,
        phone: String,
        creator_id: String,
        creator_uid: String,
        supporter_id: Option<String>,
    ) -> Self {
        Self {
            reference,
            amount,
            phone,
            creator_id,
            creator_uid,
            supporter_id: supporter_id.unwrap_or_else(|| ANONYMOUS_SUPPORTER.to_string()),
            status: TransactionStatus::Pending,
            kind: SUPPORT_KIND.to_string(),
            created_at: Utc::now(),
            settled_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// The supporter id, unless the payment was anonymous.
    pub fn supporter(&self) -> Option<&str> {
        match self.supporter_id.as_str() {
            "" | ANONYMOUS_SUPPORTER => None,
            id => Some(id),
        }
    }
}
