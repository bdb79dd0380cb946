pub mod client;

pub use client::{
    AccessToken, CashIn, GatewayCredentials, GatewayError, MobileMoneyClient, PaymentGateway,
};
