//! Postgres implementation of LedgerStore.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction as SqlxTransaction};

use crate::db::models::{
    CreatorAggregateRow, IncomeRow, SupportEventRow, SupporterAggregateRow, TransactionRow,
};
use crate::domain::{
    CreatorAggregate, IncomeRecord, SettlementPlan, SupportEvent, SupporterAggregate, Transaction,
};
use crate::ports::{LedgerStore, RepositoryError, RepositoryResult, TransitionOutcome};

const TRANSACTION_COLUMNS: &str = "reference, amount, phone, creator_id, creator_uid, \
     supporter_id, status, kind, created_at, settled_at";

/// Postgres-backed ledger.
#[derive(Clone)]
pub struct PostgresLedgerStore {
    pool: PgPool,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn outcome_without_transition(
        &self,
        reference: &str,
    ) -> RepositoryResult<TransitionOutcome> {
        Ok(match self.find_by_reference(reference).await? {
            Some(tx) => TransitionOutcome::AlreadyTerminal(tx.status),
            None => TransitionOutcome::NotFound,
        })
    }
}

async fn insert_income(
    executor: &mut SqlxTransaction<'_, Postgres>,
    record: &IncomeRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO income_records (id, kind, creator_uid, amount, reference, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(record.id)
    .bind(record.kind.as_str())
    .bind(&record.creator_uid)
    .bind(record.amount)
    .bind(&record.reference)
    .bind(record.created_at)
    .execute(&mut **executor)
    .await?;
    Ok(())
}

async fn apply_plan(
    executor: &mut SqlxTransaction<'_, Postgres>,
    plan: &SettlementPlan,
) -> Result<(), sqlx::Error> {
    insert_income(executor, &plan.platform_income).await?;
    insert_income(executor, &plan.creator_income).await?;

    let event = &plan.support_event;
    sqlx::query(
        r#"
        INSERT INTO support_events (
            id, creator_id, amount, supporter_id, supporter_phone, reference, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(event.id)
    .bind(&event.creator_id)
    .bind(event.amount)
    .bind(&event.supporter_id)
    .bind(&event.supporter_phone)
    .bind(&event.reference)
    .bind(event.created_at)
    .execute(&mut **executor)
    .await?;

    let creator = &plan.creator_increment;
    sqlx::query(
        r#"
        INSERT INTO creator_aggregates (creator_uid, total_earnings, total_supporters, pending_payout)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (creator_uid) DO UPDATE SET
            total_earnings = creator_aggregates.total_earnings + EXCLUDED.total_earnings,
            total_supporters = creator_aggregates.total_supporters + EXCLUDED.total_supporters,
            pending_payout = creator_aggregates.pending_payout + EXCLUDED.pending_payout
        "#,
    )
    .bind(&creator.creator_uid)
    .bind(creator.earnings)
    .bind(creator.supporters)
    .bind(creator.pending_payout)
    .execute(&mut **executor)
    .await?;

    if let Some(supporter) = &plan.supporter_increment {
        let first_time = sqlx::query(
            r#"
            INSERT INTO supporter_creators (supporter_id, creator_uid)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(&supporter.supporter_id)
        .bind(&supporter.creator_uid)
        .execute(&mut **executor)
        .await?
        .rows_affected()
            == 1;

        sqlx::query(
            r#"
            INSERT INTO supporter_aggregates (supporter_id, total_given, creators_supported)
            VALUES ($1, $2, $3)
            ON CONFLICT (supporter_id) DO UPDATE SET
                total_given = supporter_aggregates.total_given + EXCLUDED.total_given,
                creators_supported = supporter_aggregates.creators_supported + EXCLUDED.creators_supported
            "#,
        )
        .bind(&supporter.supporter_id)
        .bind(supporter.amount)
        .bind(i64::from(first_time))
        .execute(&mut **executor)
        .await?;
    }

    Ok(())
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    async fn insert_pending(&self, tx: &Transaction) -> RepositoryResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO transactions (
                reference, amount, phone, creator_id, creator_uid,
                supporter_id, status, kind, created_at, settled_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (reference) DO NOTHING
            "#,
        )
        .bind(&tx.reference)
        .bind(tx.amount)
        .bind(&tx.phone)
        .bind(&tx.creator_id)
        .bind(&tx.creator_uid)
        .bind(&tx.supporter_id)
        .bind(tx.status.as_str())
        .bind(&tx.kind)
        .bind(tx.created_at)
        .bind(tx.settled_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(tx.reference.clone()));
        }
        Ok(())
    }

    async fn find_by_reference(&self, reference: &str) -> RepositoryResult<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {} FROM transactions WHERE reference = $1",
            TRANSACTION_COLUMNS
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TransactionRow::into_domain).transpose()
    }

    async fn settle(
        &self,
        reference: &str,
        settled_at: DateTime<Utc>,
    ) -> RepositoryResult<TransitionOutcome> {
        let mut db_tx = self.pool.begin().await?;

        // Concurrent deliveries block on the row lock here; the loser sees
        // the committed status and matches zero rows.
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            r#"
            UPDATE transactions
            SET status = 'successful', settled_at = $2
            WHERE reference = $1 AND status = 'pending'
            RETURNING {}
            "#,
            TRANSACTION_COLUMNS
        ))
        .bind(reference)
        .bind(settled_at)
        .fetch_optional(&mut *db_tx)
        .await?;

        let Some(row) = row else {
            db_tx.rollback().await?;
            return self.outcome_without_transition(reference).await;
        };

        let settled = row.into_domain()?;
        let plan = SettlementPlan::for_transaction(&settled, settled_at);
        apply_plan(&mut db_tx, &plan).await?;
        db_tx.commit().await?;

        Ok(TransitionOutcome::Applied(settled))
    }

    async fn mark_failed(&self, reference: &str) -> RepositoryResult<TransitionOutcome> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            r#"
            UPDATE transactions
            SET status = 'failed'
            WHERE reference = $1 AND status = 'pending'
            RETURNING {}
            "#,
            TRANSACTION_COLUMNS
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(TransitionOutcome::Applied(row.into_domain()?)),
            None => self.outcome_without_transition(reference).await,
        }
    }

    async fn income_records(&self, reference: &str) -> RepositoryResult<Vec<IncomeRecord>> {
        let rows = sqlx::query_as::<_, IncomeRow>(
            "SELECT id, kind, creator_uid, amount, reference, created_at \
             FROM income_records WHERE reference = $1 ORDER BY kind",
        )
        .bind(reference)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(IncomeRow::into_domain).collect()
    }

    async fn support_events(&self, reference: &str) -> RepositoryResult<Vec<SupportEvent>> {
        let rows = sqlx::query_as::<_, SupportEventRow>(
            "SELECT id, creator_id, amount, supporter_id, supporter_phone, reference, created_at \
             FROM support_events WHERE reference = $1",
        )
        .bind(reference)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(SupportEvent::from).collect())
    }

    async fn creator_aggregate(
        &self,
        creator_uid: &str,
    ) -> RepositoryResult<Option<CreatorAggregate>> {
        let row = sqlx::query_as::<_, CreatorAggregateRow>(
            "SELECT creator_uid, total_earnings, total_supporters, pending_payout \
             FROM creator_aggregates WHERE creator_uid = $1",
        )
        .bind(creator_uid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CreatorAggregate::from))
    }

    async fn supporter_aggregate(
        &self,
        supporter_id: &str,
    ) -> RepositoryResult<Option<SupporterAggregate>> {
        let row = sqlx::query_as::<_, SupporterAggregateRow>(
            "SELECT supporter_id, total_given, creators_supported \
             FROM supporter_aggregates WHERE supporter_id = $1",
        )
        .bind(supporter_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(SupporterAggregate::from))
    }

    async fn ping(&self) -> RepositoryResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
