#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fundline::{
    config::Settings,
    error::Result,
    gateway::{GatewayValidation, InitiationOutcome, PaymentGateway, SessionRequest},
    notify::{Notifier, OutgoingEmail},
    service::ServiceContext,
};
use serde_json::{json, Value};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

pub const GATEWAY_PAGE: &str = "https://sandbox.gateway.test/pay/abc";

/// Gateway double: answers initiation with a configurable outcome and
/// validation ids with whatever payload was registered for them.
pub struct FakeGateway {
    outcome: Mutex<InitiationOutcome>,
    validations: Mutex<HashMap<String, Value>>,
    pub requests: Mutex<Vec<SessionRequest>>,
    pub validate_calls: AtomicUsize,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            outcome: Mutex::new(InitiationOutcome::Redirect {
                url: GATEWAY_PAGE.to_string(),
                session_key: Some("SESSKEY".to_string()),
            }),
            validations: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            validate_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_outcome(&self, outcome: InitiationOutcome) {
        *self.outcome.lock().unwrap() = outcome;
    }

    /// Registers a VALID record for `val_id`.
    pub fn approve(&self, val_id: &str, transaction_id: &str, amount: &str) {
        self.register(
            val_id,
            json!({
                "status": "VALID",
                "tran_id": transaction_id,
                "val_id": val_id,
                "amount": amount,
                "currency": "BDT",
            }),
        );
    }

    pub fn register(&self, val_id: &str, payload: Value) {
        self.validations
            .lock()
            .unwrap()
            .insert(val_id.to_string(), payload);
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<SessionRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    pub fn validate_count(&self) -> usize {
        self.validate_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn initiate_session(&self, request: &SessionRequest) -> InitiationOutcome {
        self.requests.lock().unwrap().push(request.clone());
        self.outcome.lock().unwrap().clone()
    }

    async fn validate_transaction(&self, val_id: &str) -> Result<GatewayValidation> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        let payload = self
            .validations
            .lock()
            .unwrap()
            .get(val_id)
            .cloned()
            .unwrap_or_else(|| json!({ "status": "INVALID_TRANSACTION" }));
        Ok(GatewayValidation::from_payload(payload))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

pub struct TestApp {
    pub pool: SqlitePool,
    pub settings: Arc<Settings>,
    pub ctx: Arc<ServiceContext>,
    pub gateway: Arc<FakeGateway>,
    pub notifier: Arc<RecordingNotifier>,
}

pub async fn test_pool() -> SqlitePool {
    // One connection, otherwise every connection gets its own empty database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");

    pool
}

pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.server.base_url = "http://api.test".to_string();
    settings.frontend.url = "http://web.test".to_string();
    settings.frontend.organization_name = "Test Foundation".to_string();
    settings.uploads.dir = std::env::temp_dir()
        .join(format!("fundline-test-{}", uuid::Uuid::new_v4()))
        .to_string_lossy()
        .into_owned();
    settings
}

pub async fn setup() -> TestApp {
    setup_with(|_| {}).await
}

pub async fn setup_with(configure: impl FnOnce(&mut Settings)) -> TestApp {
    let mut settings = test_settings();
    configure(&mut settings);
    let settings = Arc::new(settings);

    let pool = test_pool().await;
    let gateway = Arc::new(FakeGateway::new());
    let notifier = Arc::new(RecordingNotifier::default());

    let ctx = Arc::new(ServiceContext::new(
        pool.clone(),
        settings.clone(),
        gateway.clone(),
        notifier.clone(),
    ));

    TestApp {
        pool,
        settings,
        ctx,
        gateway,
        notifier,
    }
}

pub fn donation_request(contact: &str, amount: f64) -> fundline::domain::CreateDonationRequest {
    serde_json::from_value(json!({
        "purpose": "Flood relief",
        "contact": contact,
        "amount": amount,
        "name": "Rahim Uddin",
    }))
    .expect("donation request")
}

pub fn member_form(member_type: &str, amount: f64) -> fundline::domain::MemberFormRequest {
    serde_json::from_value(json!({
        "type": member_type,
        "amount": amount,
        "name": "Karim Ahmed",
        "fatherName": "Abdul Ahmed",
        "gender": "male",
        "mobile": "01712345678",
        "isOverseas": false,
        "email": "karim@example.com",
        "occupation": "Engineer",
        "address": "House 1, Road 2, Dhaka",
    }))
    .expect("member form")
}
