use async_trait::async_trait;
use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{backoff, failure_policy, Config, Error as FailsafeError, StateMachine};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::RuntimeMode;

pub const WEBHOOK_MODE_HEADER: &str = "X-Webhook-Mode";

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("gateway authorization failed: {0}")]
    Auth(String),
    #[error("cash-in rejected by provider: {0}")]
    Rejected(serde_json::Value),
    #[error("HTTP request failed: {0}")]
    Request(reqwest::Error),
    #[error("gateway request timed out")]
    Timeout,
    #[error("Circuit breaker open: {0}")]
    CircuitBreakerOpen(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::Request(e)
        }
    }
}

/// Short-lived bearer token returned by the provider.
#[derive(Clone, Deserialize)]
pub struct AccessToken {
    #[serde(rename = "access")]
    pub token: String,
    #[serde(default)]
    pub expires: Option<i64>,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"***")
            .field("expires", &self.expires)
            .finish()
    }
}

/// Provider acknowledgement of a cash-in request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashIn {
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
}

#[derive(Serialize)]
struct AuthorizeRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
}

#[derive(Serialize)]
struct CashInRequest<'a> {
    amount: i64,
    number: &'a str,
}

/// Outbound side of the mobile-money provider. No retries happen here.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn authorize(&self) -> Result<AccessToken, GatewayError>;

    async fn initiate_cash_in(
        &self,
        amount: i64,
        phone: &str,
        token: &AccessToken,
    ) -> Result<CashIn, GatewayError>;
}

#[derive(Debug, Clone)]
pub struct GatewayCredentials {
    pub client_id: String,
    pub client_secret: String,
}

type Breaker = StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>;

/// HTTP client for the mobile-money provider API
#[derive(Clone)]
pub struct MobileMoneyClient {
    client: Client,
    base_url: String,
    credentials: GatewayCredentials,
    mode: RuntimeMode,
    circuit_breaker: Breaker,
}

impl MobileMoneyClient {
    pub fn new(
        base_url: String,
        credentials: GatewayCredentials,
        mode: RuntimeMode,
        timeout: Duration,
    ) -> Self {
        Self::with_circuit_breaker(base_url, credentials, mode, timeout, 3, 60)
    }

    /// Creates a client with custom circuit breaker configuration
    pub fn with_circuit_breaker(
        base_url: String,
        credentials: GatewayCredentials,
        mode: RuntimeMode,
        timeout: Duration,
        failure_threshold: u32,
        reset_timeout_secs: u64,
    ) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        let backoff = backoff::equal_jittered(
            Duration::from_secs(reset_timeout_secs),
            Duration::from_secs(reset_timeout_secs * 2),
        );
        let policy = failure_policy::consecutive_failures(failure_threshold, backoff);
        let circuit_breaker = Config::new().failure_policy(policy).build();

        MobileMoneyClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            mode,
            circuit_breaker,
        }
    }

    pub fn circuit_state(&self) -> String {
        if self.circuit_breaker.is_call_permitted() {
            "closed".to_string()
        } else {
            "open".to_string()
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn guarded<T, F>(&self, call: F) -> Result<T, GatewayError>
    where
        F: std::future::Future<Output = Result<T, GatewayError>>,
    {
        // Provider-side rejections are answers, not outages.
        let trips_breaker = |e: &GatewayError| !matches!(e, GatewayError::Rejected(_));

        match self.circuit_breaker.call_with(trips_breaker, call).await {
            Ok(value) => Ok(value),
            Err(FailsafeError::Rejected) => Err(GatewayError::CircuitBreakerOpen(
                "mobile-money gateway circuit breaker is open".to_string(),
            )),
            Err(FailsafeError::Inner(e)) => Err(e),
        }
    }
}

/// Reads the whole body. Transport failures (including a timeout mid-body)
/// propagate; text that is not JSON is kept as a string value.
async fn read_json(response: Response) -> Result<serde_json::Value, GatewayError> {
    let text = response.text().await?;
    Ok(serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text)))
}

#[async_trait]
impl PaymentGateway for MobileMoneyClient {
    async fn authorize(&self) -> Result<AccessToken, GatewayError> {
        let url = self.url("/auth/agents/authorize");
        let request = self.client.post(&url).json(&AuthorizeRequest {
            client_id: &self.credentials.client_id,
            client_secret: &self.credentials.client_secret,
        });

        self.guarded(async move {
            let response = request.send().await?;
            let status = response.status();

            let body = read_json(response).await?;

            if !status.is_success() {
                return Err(GatewayError::Auth(format!("status {}: {}", status, body)));
            }

            serde_json::from_value::<AccessToken>(body)
                .map_err(|e| GatewayError::Auth(format!("malformed token response: {}", e)))
        })
        .await
    }

    async fn initiate_cash_in(
        &self,
        amount: i64,
        phone: &str,
        token: &AccessToken,
    ) -> Result<CashIn, GatewayError> {
        let url = self.url("/transactions/cashin");
        let request = self
            .client
            .post(&url)
            .bearer_auth(&token.token)
            .header(WEBHOOK_MODE_HEADER, self.mode.as_str())
            .json(&CashInRequest {
                amount,
                number: phone,
            });

        self.guarded(async move {
            let response = request.send().await?;
            let status = response.status();
            let body = read_json(response).await?;

            match serde_json::from_value::<CashIn>(body.clone()) {
                Ok(cash_in) if status.is_success() && !cash_in.reference.is_empty() => {
                    Ok(cash_in)
                }
                _ => Err(GatewayError::Rejected(body)),
            }
        })
        .await
    }
}
