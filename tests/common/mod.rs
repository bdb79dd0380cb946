#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use settlement_core::adapters::MemoryLedgerStore;
use settlement_core::gateway::{AccessToken, CashIn, GatewayError, PaymentGateway};
use settlement_core::services::{SignatureVerifier, SIGNATURE_HEADER};
use settlement_core::{create_app, AppState};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const WEBHOOK_SECRET: &str = "test_webhook_secret";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayBehavior {
    Accept,
    Reject,
    AuthFailure,
    Timeout,
}

/// In-process stand-in for the mobile-money provider.
pub struct FakeGateway {
    behavior: Mutex<GatewayBehavior>,
    next_ref: AtomicUsize,
    pub authorize_calls: AtomicUsize,
    pub cash_in_calls: AtomicUsize,
    pub last_cash_in: Mutex<Option<(i64, String)>>,
}

impl FakeGateway {
    pub fn new(behavior: GatewayBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            next_ref: AtomicUsize::new(1),
            authorize_calls: AtomicUsize::new(0),
            cash_in_calls: AtomicUsize::new(0),
            last_cash_in: Mutex::new(None),
        }
    }

    pub fn set_behavior(&self, behavior: GatewayBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    fn behavior(&self) -> GatewayBehavior {
        *self.behavior.lock().unwrap()
    }

    pub fn calls(&self) -> usize {
        self.authorize_calls.load(Ordering::SeqCst) + self.cash_in_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn authorize(&self) -> Result<AccessToken, GatewayError> {
        self.authorize_calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior() {
            GatewayBehavior::AuthFailure => Err(GatewayError::Auth("status 401".to_string())),
            _ => Ok(AccessToken {
                token: "token".to_string(),
                expires: Some(900),
            }),
        }
    }

    async fn initiate_cash_in(
        &self,
        amount: i64,
        phone: &str,
        _token: &AccessToken,
    ) -> Result<CashIn, GatewayError> {
        self.cash_in_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_cash_in.lock().unwrap() = Some((amount, phone.to_string()));
        match self.behavior() {
            GatewayBehavior::Reject => Err(GatewayError::Rejected(
                json!({"message": "invalid number"}),
            )),
            GatewayBehavior::Timeout => Err(GatewayError::Timeout),
            _ => {
                let n = self.next_ref.fetch_add(1, Ordering::SeqCst);
                Ok(CashIn {
                    reference: format!("ref-{}", n),
                    status: Some("pending".to_string()),
                    amount: Some(amount),
                })
            }
        }
    }
}

pub struct TestApp {
    pub base_url: String,
    pub client: reqwest::Client,
    pub ledger: Arc<MemoryLedgerStore>,
    pub gateway: Arc<FakeGateway>,
    pub verifier: SignatureVerifier,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(GatewayBehavior::Accept).await
}

pub async fn spawn_app_with(behavior: GatewayBehavior) -> TestApp {
    let ledger = Arc::new(MemoryLedgerStore::new());
    let gateway = Arc::new(FakeGateway::new(behavior));
    let verifier = SignatureVerifier::new(WEBHOOK_SECRET);

    let app = create_app(AppState {
        ledger: ledger.clone(),
        gateway: gateway.clone(),
        verifier: verifier.clone(),
    });

    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], 0));
    let server = axum::Server::bind(&addr).serve(app.into_make_service());
    let actual_addr = server.local_addr();

    tokio::spawn(async move {
        server.await.unwrap();
    });

    TestApp {
        base_url: format!("http://{}", actual_addr),
        client: reqwest::Client::new(),
        ledger,
        gateway,
        verifier,
    }
}

pub fn initiate_body(amount: Value, supporter: Option<&str>) -> Value {
    let mut body = json!({
        "amount": amount,
        "phone": "0781234567",
        "creatorId": "jane",
        "creatorUid": "uid-jane",
    });
    if let Some(supporter) = supporter {
        body["supporterId"] = json!(supporter);
    }
    body
}

pub fn callback_body(reference: &str, status: &str) -> String {
    json!({
        "data": {
            "ref": reference,
            "status": status,
            "client": "client-1",
            "kind": "CASHIN"
        }
    })
    .to_string()
}

impl TestApp {
    pub async fn initiate(&self, body: &Value) -> reqwest::Response {
        self.client
            .post(format!("{}/payments/initiate", self.base_url))
            .json(body)
            .send()
            .await
            .unwrap()
    }

    /// Initiates a payment and returns its reference.
    pub async fn pending_payment(&self, amount: i64, supporter: Option<&str>) -> String {
        let res = self.initiate(&initiate_body(json!(amount), supporter)).await;
        assert_eq!(res.status(), reqwest::StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        body["ref"].as_str().unwrap().to_string()
    }

    pub async fn post_webhook(&self, body: &str, signature: Option<&str>) -> reqwest::Response {
        let mut req = self
            .client
            .post(format!("{}/payments/webhook", self.base_url))
            .header("content-type", "application/json")
            .body(body.to_string());
        if let Some(signature) = signature {
            req = req.header(SIGNATURE_HEADER, signature);
        }
        req.send().await.unwrap()
    }

    pub async fn deliver(&self, reference: &str, status: &str) -> reqwest::Response {
        let body = callback_body(reference, status);
        let signature = self.verifier.sign(body.as_bytes());
        self.post_webhook(&body, Some(&signature)).await
    }
}
