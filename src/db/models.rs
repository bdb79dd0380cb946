//! Row types for SQLx. Converted into domain types before leaving the adapter.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::{
    CreatorAggregate, IncomeKind, IncomeRecord, SupportEvent, SupporterAggregate, Transaction,
};
use crate::ports::RepositoryError;

#[derive(Debug, FromRow)]
pub struct TransactionRow {
    pub reference: String,
    pub amount: i64,
    pub phone: String,
    pub creator_id: String,
    pub creator_uid: String,
    pub supporter_id: String,
    pub status: String,
    pub kind: String,
    pub created_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl TransactionRow {
    pub fn into_domain(self) -> Result<Transaction, RepositoryError> {
        let status = self
            .status
            .parse()
            .map_err(|e| RepositoryError::Corrupt(format!("transaction {}: {}", self.reference, e)))?;

        Ok(Transaction {
            reference: self.reference,
            amount: self.amount,
            phone: self.phone,
            creator_id: self.creator_id,
            creator_uid: self.creator_uid,
            supporter_id: self.supporter_id,
            status,
            kind: self.kind,
            created_at: self.created_at,
            settled_at: self.settled_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct IncomeRow {
    pub id: Uuid,
    pub kind: String,
    pub creator_uid: Option<String>,
    pub amount: i64,
    pub reference: String,
    pub created_at: DateTime<Utc>,
}

impl IncomeRow {
    pub fn into_domain(self) -> Result<IncomeRecord, RepositoryError> {
        let kind = match self.kind.as_str() {
            "platform" => IncomeKind::Platform,
            "creator" => IncomeKind::Creator,
            other => {
                return Err(RepositoryError::Corrupt(format!(
                    "income record {}: unknown kind {}",
                    self.id, other
                )))
            }
        };

        Ok(IncomeRecord {
            id: self.id,
            kind,
            creator_uid: self.creator_uid,
            amount: self.amount,
            reference: self.reference,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct SupportEventRow {
    pub id: Uuid,
    pub creator_id: String,
    pub amount: i64,
    pub supporter_id: String,
    pub supporter_phone: String,
    pub reference: String,
    pub created_at: DateTime<Utc>,
}

impl From<SupportEventRow> for SupportEvent {
    fn from(row: SupportEventRow) -> Self {
        SupportEvent {
            id: row.id,
            creator_id: row.creator_id,
            amount: row.amount,
            supporter_id: row.supporter_id,
            supporter_phone: row.supporter_phone,
            reference: row.reference,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct CreatorAggregateRow {
    pub creator_uid: String,
    pub total_earnings: i64,
    pub total_supporters: i64,
    pub pending_payout: i64,
}

impl From<CreatorAggregateRow> for CreatorAggregate {
    fn from(row: CreatorAggregateRow) -> Self {
        CreatorAggregate {
            creator_uid: row.creator_uid,
            total_earnings: row.total_earnings,
            total_supporters: row.total_supporters,
            pending_payout: row.pending_payout,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct SupporterAggregateRow {
    pub supporter_id: String,
    pub total_given: i64,
    pub creators_supported: i64,
}

impl From<SupporterAggregateRow> for SupporterAggregate {
    fn from(row: SupporterAggregateRow) -> Self {
        SupporterAggregate {
            supporter_id: row.supporter_id,
            total_given: row.total_given,
            creators_supported: row.creators_supported,
        }
    }
}
