pub mod ledger;
pub mod transaction;

pub use ledger::{
    CreatorAggregate, CreatorIncrement, IncomeKind, IncomeRecord, RevenueSplit, SettlementPlan,
    SupportEvent, SupporterAggregate, SupporterIncrement,
};
pub use transaction::{Transaction, TransactionStatus, ANONYMOUS_SUPPORTER, SUPPORT_KIND};
