pub mod initiate_payment;

pub use initiate_payment::{InitiateError, InitiatePayment, PaymentIntent};
