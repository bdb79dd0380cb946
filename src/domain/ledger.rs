//! Ledger entries produced when a transaction settles.
//!
//! `SettlementPlan` is computed from the transaction that was just moved to
//! `successful` and describes every write of the fan-out. Store adapters apply
//! the plan as one unit.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use super::transaction::Transaction;

/// Platform cut of every support payment, in percent.
pub const PLATFORM_SHARE_PERCENT: i64 = 10;

/// Revenue split of one payment. `platform_share + creator_share == amount`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RevenueSplit {
    pub platform_share: i64,
    pub creator_share: i64,
}

impl RevenueSplit {
    /// Floors the platform share and gives the remainder to the creator.
    /// Splitting on whole hundreds first keeps every intermediate in range.
    pub fn of(amount: i64) -> Self {
        let platform_share = amount.div_euclid(100) * PLATFORM_SHARE_PERCENT
            + (amount.rem_euclid(100) * PLATFORM_SHARE_PERCENT).div_euclid(100);
        Self {
            platform_share,
            creator_share: amount - platform_share,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IncomeKind {
    Platform,
    Creator,
}

impl IncomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncomeKind::Platform => "platform",
            IncomeKind::Creator => "creator",
        }
    }
}

impl fmt::Display for IncomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Append-only income entry. Platform records carry no creator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncomeRecord {
    pub id: Uuid,
    pub kind: IncomeKind,
    pub creator_uid: Option<String>,
    pub amount: i64,
    pub reference: String,
    pub created_at: DateTime<Utc>,
}

/// Public record of a completed support act.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupportEvent {
    pub id: Uuid,
    pub creator_id: String,
    pub amount: i64,
    pub supporter_id: String,
    pub supporter_phone: String,
    pub reference: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreatorAggregate {
    pub creator_uid: String,
    pub total_earnings: i64,
    pub total_supporters: i64,
    pub pending_payout: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SupporterAggregate {
    pub supporter_id: String,
    pub total_given: i64,
    pub creators_supported: i64,
}

/// Additive delta for a creator's counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatorIncrement {
    pub creator_uid: String,
    pub earnings: i64,
    pub supporters: i64,
    pub pending_payout: i64,
}

/// Additive delta for a supporter's counters. `creators_supported` is bumped
/// by the store only when `creator_uid` is new for this supporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupporterIncrement {
    pub supporter_id: String,
    pub creator_uid: String,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementPlan {
    pub split: RevenueSplit,
    pub platform_income: IncomeRecord,
    pub creator_income: IncomeRecord,
    pub support_event: SupportEvent,
    pub creator_increment: CreatorIncrement,
    pub supporter_increment: Option<SupporterIncrement>,
}

impl SettlementPlan {
    pub fn for_transaction(tx: &Transaction, settled_at: DateTime<Utc>) -> Self {
        let split = RevenueSplit::of(tx.amount);

        let platform_income = IncomeRecord {
            id: Uuid::new_v4(),
            kind: IncomeKind::Platform,
            creator_uid: None,
            amount: split.platform_share,
            reference: tx.reference.clone(),
            created_at: settled_at,
        };

        let creator_income = IncomeRecord {
            id: Uuid::new_v4(),
            kind: IncomeKind::Creator,
            creator_uid: Some(tx.creator_uid.clone()),
            amount: split.creator_share,
            reference: tx.reference.clone(),
            created_at: settled_at,
        };

        let support_event = SupportEvent {
            id: Uuid::new_v4(),
            creator_id: tx.creator_id.clone(),
            amount: tx.amount,
            supporter_id: tx.supporter_id.clone(),
            supporter_phone: tx.phone.clone(),
            reference: tx.reference.clone(),
            created_at: settled_at,
        };

        let creator_increment = CreatorIncrement {
            creator_uid: tx.creator_uid.clone(),
            earnings: split.creator_share,
            supporters: 1,
            pending_payout: split.creator_share,
        };

        let supporter_increment = tx.supporter().map(|supporter_id| SupporterIncrement {
            supporter_id: supporter_id.to_string(),
            creator_uid: tx.creator_uid.clone(),
            amount: tx.amount,
        });

        Self {
            split,
            platform_income,
            creator_income,
            support_event,
            creator_increment,
            supporter_increment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::transaction::ANONYMOUS_SUPPORTER;

    fn tx(amount: i64, supporter: Option<&str>) -> Transaction {
        Transaction::pending(
            "ref-42".to_string(),
            amount,
            "0781234567".to_string(),
            "jane".to_string(),
            "uid-jane".to_string(),
            supporter.map(str::to_string),
        )
    }

    #[test]
    fn split_of_5000() {
        let split = RevenueSplit::of(5000);
        assert_eq!(split.platform_share, 500);
        assert_eq!(split.creator_share, 4500);
    }

    #[test]
    fn split_never_leaks_currency() {
        for amount in [1, 7, 99, 100, 101, 555, 1009, 123_457, 9_999_999] {
            let split = RevenueSplit::of(amount);
            assert_eq!(split.platform_share + split.creator_share, amount);
            assert!(split.platform_share <= split.creator_share);
        }
    }

    #[test]
    fn split_floors_platform_share() {
        assert_eq!(RevenueSplit::of(109).platform_share, 10);
        assert_eq!(RevenueSplit::of(109).creator_share, 99);
        assert_eq!(RevenueSplit::of(9).platform_share, 0);
    }

    #[test]
    fn split_at_i64_max_does_not_overflow() {
        let split = RevenueSplit::of(i64::MAX);
        assert_eq!(split.platform_share, i64::MAX / 10);
        assert_eq!(split.platform_share + split.creator_share, i64::MAX);

        let split = RevenueSplit::of(1_000_000_000_000_000_000);
        assert_eq!(split.platform_share, 100_000_000_000_000_000);
        assert_eq!(split.creator_share, 900_000_000_000_000_000);
    }

    #[test]
    fn plan_credits_creator_and_supporter() {
        let now = Utc::now();
        let plan = SettlementPlan::for_transaction(&tx(5000, Some("fan-1")), now);

        assert_eq!(plan.platform_income.amount, 500);
        assert_eq!(plan.platform_income.kind, IncomeKind::Platform);
        assert!(plan.platform_income.creator_uid.is_none());
        assert_eq!(plan.creator_income.amount, 4500);
        assert_eq!(plan.creator_income.creator_uid.as_deref(), Some("uid-jane"));
        assert_eq!(plan.support_event.amount, 5000);
        assert_eq!(plan.support_event.creator_id, "jane");
        assert_eq!(plan.creator_increment.earnings, 4500);
        assert_eq!(plan.creator_increment.pending_payout, 4500);
        assert_eq!(plan.creator_increment.supporters, 1);

        let supporter = plan.supporter_increment.expect("named supporter");
        assert_eq!(supporter.supporter_id, "fan-1");
        assert_eq!(supporter.amount, 5000);
        assert_eq!(plan.support_event.created_at, now);
    }

    #[test]
    fn anonymous_plan_skips_supporter() {
        let plan = SettlementPlan::for_transaction(&tx(5000, None), Utc::now());
        assert!(plan.supporter_increment.is_none());
        assert_eq!(plan.support_event.supporter_id, ANONYMOUS_SUPPORTER);
        assert_eq!(plan.creator_increment.earnings, 4500);
    }
}
