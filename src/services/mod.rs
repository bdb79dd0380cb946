pub mod settlement;
pub mod signature;

pub use settlement::{CallbackEnvelope, CallbackOutcome, SettlementError, SettlementService};
pub use signature::{SignatureError, SignatureVerifier, SIGNATURE_HEADER};
