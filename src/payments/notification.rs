//! Shapes of the webhook notifications read by the checkout callback.
//!
//! Only the fields the service consumes are modelled. Everything below
//! `data.object` is optional so that missing values can be reported as
//! precise errors by the caller instead of a generic parse failure.

use serde::Deserialize;
use serde_json::Value;

use crate::error::AppError;

pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

#[derive(Debug, Deserialize)]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: NotificationData,
}

#[derive(Debug, Deserialize)]
pub struct NotificationData {
    pub object: Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct CheckoutSession {
    pub customer: Option<String>,
    pub customer_details: Option<CustomerDetails>,
    pub shipping_details: Option<ShippingDetails>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CustomerDetails {
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ShippingDetails {
    pub name: Option<String>,
    pub address: Option<AddressDetails>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AddressDetails {
    pub city: Option<String>,
    pub country: Option<String>,
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub postal_code: Option<String>,
}

impl Notification {
    pub fn parse(body: &[u8]) -> Result<Self, AppError> {
        serde_json::from_slice(body).map_err(|e| AppError::MalformedPayload(e.to_string()))
    }

    pub fn is_checkout_completed(&self) -> bool {
        self.event_type == CHECKOUT_SESSION_COMPLETED
    }

    pub fn checkout_session(&self) -> Result<CheckoutSession, AppError> {
        CheckoutSession::deserialize(&self.data.object)
            .map_err(|e| AppError::MalformedPayload(e.to_string()))
    }
}

impl CheckoutSession {
    pub fn purchaser_email(&self) -> Option<&str> {
        self.customer_details
            .as_ref()
            .and_then(|details| details.email.as_deref())
            .filter(|email| !email.trim().is_empty())
    }
}
