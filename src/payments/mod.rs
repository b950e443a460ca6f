//! Payment processor integration: outbound gateway calls and inbound
//! webhook verification.

use async_trait::async_trait;
use thiserror::Error;

pub mod notification;
pub mod signature;
pub mod stripe;

pub use stripe::StripeGateway;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("payment processor returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected payment processor response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub price_ref: String,
    pub quantity: i32,
}

/// Who pays: a customer already known to the processor, or a new one
/// created from the email during checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutCustomer {
    Existing(String),
    New { email: String },
}

#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
    pub line_items: Vec<LineItem>,
    pub customer: CheckoutCustomer,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone)]
pub struct CheckoutSessionCreated {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerAddress {
    pub name: String,
    pub line1: String,
    pub line2: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSessionCreated, PaymentError>;

    /// Replaces the stored shipping and billing address of a customer.
    async fn update_customer_address(
        &self,
        customer_ref: &str,
        address: &CustomerAddress,
    ) -> Result<(), PaymentError>;
}
