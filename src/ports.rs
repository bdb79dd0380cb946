//! Ports the payment pipeline depends on.
//! Adapters live under `crate::adapters`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{
    CreatorAggregate, IncomeRecord, SupportEvent, SupporterAggregate, Transaction,
    TransactionStatus,
};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("reference already exists: {0}")]
    Conflict(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Result of a conditional `pending -> terminal` transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The transition happened; carries the updated transaction.
    Applied(Transaction),
    /// Another delivery already moved the transaction out of `pending`.
    AlreadyTerminal(TransactionStatus),
    NotFound,
}

/// Durable storage for transactions and everything settlement writes.
///
/// `settle` and `mark_failed` are conditional on the stored status being
/// `pending`. `settle` applies the whole fan-out atomically with the
/// transition, so a failed call leaves no trace and can be retried.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn insert_pending(&self, tx: &Transaction) -> RepositoryResult<()>;

    async fn find_by_reference(&self, reference: &str) -> RepositoryResult<Option<Transaction>>;

    async fn settle(
        &self,
        reference: &str,
        settled_at: DateTime<Utc>,
    ) -> RepositoryResult<TransitionOutcome>;

    async fn mark_failed(&self, reference: &str) -> RepositoryResult<TransitionOutcome>;

    async fn income_records(&self, reference: &str) -> RepositoryResult<Vec<IncomeRecord>>;

    async fn support_events(&self, reference: &str) -> RepositoryResult<Vec<SupportEvent>>;

    async fn creator_aggregate(&self, creator_uid: &str)
        -> RepositoryResult<Option<CreatorAggregate>>;

    async fn supporter_aggregate(
        &self,
        supporter_id: &str,
    ) -> RepositoryResult<Option<SupporterAggregate>>;

    async fn ping(&self) -> RepositoryResult<()>;
}
