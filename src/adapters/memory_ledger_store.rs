//! In-process implementation of LedgerStore.
//!
//! Every operation runs inside one critical section, which gives the same
//! conditional-transition and all-or-nothing fan-out guarantees as the
//! Postgres adapter's database transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::domain::{
    CreatorAggregate, IncomeRecord, SettlementPlan, SupportEvent, SupporterAggregate, Transaction,
    TransactionStatus,
};
use crate::ports::{LedgerStore, RepositoryError, RepositoryResult, TransitionOutcome};

#[derive(Default)]
struct Ledger {
    transactions: HashMap<String, Transaction>,
    income: Vec<IncomeRecord>,
    support_events: Vec<SupportEvent>,
    creators: HashMap<String, CreatorAggregate>,
    supporters: HashMap<String, SupporterAggregate>,
    supported_pairs: HashSet<(String, String)>,
    writes: u64,
}

#[derive(Default)]
pub struct MemoryLedgerStore {
    ledger: Mutex<Ledger>,
    fail_next_settle: AtomicBool,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `settle` call fail after the transition was staged,
    /// simulating a store outage mid fan-out.
    pub fn fail_next_settle(&self) {
        self.fail_next_settle.store(true, Ordering::SeqCst);
    }

    /// Number of committed mutations so far.
    pub fn write_count(&self) -> u64 {
        self.lock().map(|ledger| ledger.writes).unwrap_or_default()
    }

    fn lock(&self) -> RepositoryResult<MutexGuard<'_, Ledger>> {
        self.ledger
            .lock()
            .map_err(|_| RepositoryError::Unavailable("ledger mutex poisoned".to_string()))
    }
}

fn terminal_or_missing(ledger: &Ledger, reference: &str) -> TransitionOutcome {
    match ledger.transactions.get(reference) {
        Some(tx) => TransitionOutcome::AlreadyTerminal(tx.status),
        None => TransitionOutcome::NotFound,
    }
}

fn checked_add(total: i64, delta: i64, what: &str) -> RepositoryResult<i64> {
    total
        .checked_add(delta)
        .ok_or_else(|| RepositoryError::Corrupt(format!("{} would overflow", what)))
}

/// Applies the fan-out. Every counter is computed before anything is
/// written, so an overflow leaves the ledger untouched.
fn apply_plan(ledger: &mut Ledger, plan: SettlementPlan) -> RepositoryResult<()> {
    let inc = plan.creator_increment;
    let mut creator = ledger
        .creators
        .get(&inc.creator_uid)
        .cloned()
        .unwrap_or_else(|| CreatorAggregate {
            creator_uid: inc.creator_uid.clone(),
            ..Default::default()
        });
    creator.total_earnings = checked_add(creator.total_earnings, inc.earnings, "creator earnings")?;
    creator.total_supporters =
        checked_add(creator.total_supporters, inc.supporters, "creator supporters")?;
    creator.pending_payout =
        checked_add(creator.pending_payout, inc.pending_payout, "creator pending payout")?;

    let supporter = match plan.supporter_increment {
        Some(inc) => {
            let pair = (inc.supporter_id.clone(), inc.creator_uid.clone());
            let first_time = !ledger.supported_pairs.contains(&pair);
            let mut supporter = ledger
                .supporters
                .get(&inc.supporter_id)
                .cloned()
                .unwrap_or_else(|| SupporterAggregate {
                    supporter_id: inc.supporter_id.clone(),
                    ..Default::default()
                });
            supporter.total_given = checked_add(supporter.total_given, inc.amount, "supporter total")?;
            if first_time {
                supporter.creators_supported =
                    checked_add(supporter.creators_supported, 1, "creators supported")?;
            }
            Some((pair, supporter))
        }
        None => None,
    };

    ledger.income.push(plan.platform_income);
    ledger.income.push(plan.creator_income);
    ledger.support_events.push(plan.support_event);
    ledger.creators.insert(creator.creator_uid.clone(), creator);
    if let Some((pair, supporter)) = supporter {
        ledger.supported_pairs.insert(pair);
        ledger
            .supporters
            .insert(supporter.supporter_id.clone(), supporter);
    }

    Ok(())
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn insert_pending(&self, tx: &Transaction) -> RepositoryResult<()> {
        let mut ledger = self.lock()?;
        if ledger.transactions.contains_key(&tx.reference) {
            return Err(RepositoryError::Conflict(tx.reference.clone()));
        }
        ledger.transactions.insert(tx.reference.clone(), tx.clone());
        ledger.writes += 1;
        Ok(())
    }

    async fn find_by_reference(&self, reference: &str) -> RepositoryResult<Option<Transaction>> {
        Ok(self.lock()?.transactions.get(reference).cloned())
    }

    async fn settle(
        &self,
        reference: &str,
        settled_at: DateTime<Utc>,
    ) -> RepositoryResult<TransitionOutcome> {
        let mut ledger = self.lock()?;

        let mut staged = match ledger.transactions.get(reference) {
            Some(tx) if tx.status == TransactionStatus::Pending => tx.clone(),
            _ => return Ok(terminal_or_missing(&ledger, reference)),
        };
        staged.status = TransactionStatus::Successful;
        staged.settled_at = Some(settled_at);
        let plan = SettlementPlan::for_transaction(&staged, settled_at);

        if self.fail_next_settle.swap(false, Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable(
                "injected failure during settlement".to_string(),
            ));
        }

        apply_plan(&mut ledger, plan)?;
        ledger
            .transactions
            .insert(reference.to_string(), staged.clone());
        ledger.writes += 1;

        Ok(TransitionOutcome::Applied(staged))
    }

    async fn mark_failed(&self, reference: &str) -> RepositoryResult<TransitionOutcome> {
        let mut ledger = self.lock()?;

        let mut updated = match ledger.transactions.get(reference) {
            Some(tx) if tx.status == TransactionStatus::Pending => tx.clone(),
            _ => return Ok(terminal_or_missing(&ledger, reference)),
        };
        updated.status = TransactionStatus::Failed;
        ledger
            .transactions
            .insert(reference.to_string(), updated.clone());
        ledger.writes += 1;

        Ok(TransitionOutcome::Applied(updated))
    }

    async fn income_records(&self, reference: &str) -> RepositoryResult<Vec<IncomeRecord>> {
        Ok(self
            .lock()?
            .income
            .iter()
            .filter(|r| r.reference == reference)
            .cloned()
            .collect())
    }

    async fn support_events(&self, reference: &str) -> RepositoryResult<Vec<SupportEvent>> {
        Ok(self
            .lock()?
            .support_events
            .iter()
            .filter(|e| e.reference == reference)
            .cloned()
            .collect())
    }

    async fn creator_aggregate(
        &self,
        creator_uid: &str,
    ) -> RepositoryResult<Option<CreatorAggregate>> {
        Ok(self.lock()?.creators.get(creator_uid).cloned())
    }

    async fn supporter_aggregate(
        &self,
        supporter_id: &str,
    ) -> RepositoryResult<Option<SupporterAggregate>> {
        Ok(self.lock()?.supporters.get(supporter_id).cloned())
    }

    async fn ping(&self) -> RepositoryResult<()> {
        self.lock().map(|_| ())
    }
}
