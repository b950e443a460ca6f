#![allow(dead_code)]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use eticketing_api::{
    config::{AppConfig, StripeConfig},
    db::{create_orm_conn, run_migrations},
    dto::cart::{AddToCartRequest, CartLineUpdate, UpdateCartRequest},
    entity::{
        events::{ActiveModel as EventActive, Model as EventModel},
        users::{ActiveModel as UserActive, Model as UserModel},
    },
    mail::{MailError, TicketDelivery, TicketMailer},
    middleware::auth::AuthUser,
    payments::{
        CheckoutSessionCreated, CheckoutSessionRequest, CustomerAddress, PaymentError,
        PaymentGateway, signature,
    },
    services::cart_service,
    state::AppState,
};
use sea_orm::{ActiveModelTrait, Set};
use serde_json::{Value, json};
use uuid::Uuid;

pub const ENDPOINT_SECRET: &str = "whsec_test_secret";

#[derive(Default)]
pub struct FakeGateway {
    pub sessions: Mutex<Vec<CheckoutSessionRequest>>,
    pub address_updates: Mutex<Vec<(String, CustomerAddress)>>,
    pub fail_address_update: bool,
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSessionCreated, PaymentError> {
        let mut sessions = self.sessions.lock().unwrap();
        sessions.push(request);
        let id = format!("cs_test_{}", sessions.len());
        Ok(CheckoutSessionCreated {
            url: format!("https://checkout.test/{id}"),
            id,
        })
    }

    async fn update_customer_address(
        &self,
        customer_ref: &str,
        address: &CustomerAddress,
    ) -> Result<(), PaymentError> {
        if self.fail_address_update {
            return Err(PaymentError::Status {
                status: 500,
                body: "processor down".into(),
            });
        }
        self.address_updates
            .lock()
            .unwrap()
            .push((customer_ref.to_string(), address.clone()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<TicketDelivery>>,
}

#[async_trait]
impl TicketMailer for RecordingMailer {
    async fn send_ticket(&self, delivery: &TicketDelivery) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(delivery.clone());
        Ok(())
    }
}

/// Mailer whose transport is always down.
pub struct FailingMailer;

#[async_trait]
impl TicketMailer for FailingMailer {
    async fn send_ticket(&self, _delivery: &TicketDelivery) -> Result<(), MailError> {
        Err(MailError::Build("smtp down".into()))
    }
}

pub struct TestApp {
    pub state: AppState,
    pub gateway: Arc<FakeGateway>,
    pub mailer: Arc<RecordingMailer>,
}

pub async fn setup() -> anyhow::Result<TestApp> {
    setup_with_gateway(FakeGateway::default()).await
}

pub async fn setup_with_gateway(gateway: FakeGateway) -> anyhow::Result<TestApp> {
    setup_on("sqlite::memory:", gateway).await
}

/// Same as `setup` but ticket mails always fail to send.
pub async fn setup_with_failing_mailer() -> anyhow::Result<TestApp> {
    let mut app = setup().await?;
    app.state.mailer = Arc::new(FailingMailer);
    Ok(app)
}

/// Database for tests that need real concurrent writers, if one is configured.
pub fn shared_database_url() -> Option<String> {
    std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .filter(|url| !url.starts_with("sqlite:"))
}

pub async fn setup_on(database_url: &str, gateway: FakeGateway) -> anyhow::Result<TestApp> {
    let database_url = database_url.to_string();
    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;

    let config = AppConfig {
        database_url,
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "test-jwt-secret".into(),
        public_base_url: "http://localhost:3000".into(),
        stripe: StripeConfig {
            api_key: "sk_test".into(),
            api_base: "http://127.0.0.1:9".into(),
            endpoint_secret: ENDPOINT_SECRET.into(),
            webhook_tolerance_secs: 300,
        },
        smtp: None,
        external_timeout: Duration::from_secs(2),
    };

    let gateway = Arc::new(gateway);
    let mailer = Arc::new(RecordingMailer::default());
    let state = AppState {
        orm,
        config: Arc::new(config),
        payments: gateway.clone(),
        mailer: mailer.clone(),
    };

    Ok(TestApp {
        state,
        gateway,
        mailer,
    })
}

pub async fn create_user(
    state: &AppState,
    email: &str,
    customer_ref: Option<&str>,
) -> anyhow::Result<UserModel> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        first_name: Set("Camille".into()),
        customer_ref: Set(customer_ref.map(str::to_string)),
        role: Set("user".into()),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;
    Ok(user)
}

pub async fn create_event(
    state: &AppState,
    slug: &str,
    seats_available: Option<i32>,
) -> anyhow::Result<EventModel> {
    let event = EventActive {
        id: Set(Uuid::new_v4()),
        name: Set(format!("Event {slug}")),
        slug: Set(slug.to_string()),
        starts_at: Set(Some((Utc::now() + chrono::Duration::days(30)).into())),
        place: Set("Stade de France".into()),
        description: Set(String::new()),
        seats_available: Set(seats_available),
        price_ref: Set(format!("price_{slug}")),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;
    Ok(event)
}

pub fn auth(user: &UserModel) -> AuthUser {
    AuthUser {
        user_id: user.id,
        role: user.role.clone(),
    }
}

pub fn admin() -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
        role: "admin".into(),
    }
}

/// Puts `event` in the user's cart with the given pack size.
pub async fn add_line(
    state: &AppState,
    user: &UserModel,
    event: &EventModel,
    offer: i32,
) -> anyhow::Result<Uuid> {
    let resp = cart_service::add_to_cart(
        state,
        &auth(user),
        AddToCartRequest {
            slug: event.slug.clone(),
        },
    )
    .await?;
    let order_id = resp.data.expect("order line").id;

    if offer != 1 {
        cart_service::update_quantities(
            state,
            &auth(user),
            UpdateCartRequest {
                items: vec![CartLineUpdate {
                    order_id,
                    offer,
                    delete: false,
                }],
            },
        )
        .await?;
    }
    Ok(order_id)
}

pub fn shipping_details() -> Value {
    json!({
        "name": "Domicile",
        "address": {
            "city": "Paris",
            "country": "FR",
            "line1": "1 rue de Rivoli",
            "line2": null,
            "postal_code": "75001"
        }
    })
}

pub fn completed_event(id: &str, email: &str, customer: Option<&str>, shipping: Value) -> Value {
    json!({
        "id": id,
        "type": "checkout.session.completed",
        "data": { "object": {
            "id": "cs_test_1",
            "customer": customer,
            "customer_details": { "email": email },
            "shipping_details": shipping
        }}
    })
}

/// Serializes `payload` and signs it the way the processor does.
pub fn signed(payload: &Value) -> (String, Vec<u8>) {
    let body = payload.to_string().into_bytes();
    let header = signature::sign(&body, ENDPOINT_SECRET, Utc::now().timestamp())
        .expect("sign payload");
    (header, body)
}
