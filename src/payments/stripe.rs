use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{
    CheckoutCustomer, CheckoutSessionCreated, CheckoutSessionRequest, CustomerAddress,
    PaymentError, PaymentGateway,
};
use crate::config::StripeConfig;

/// Countries the hosted checkout collects shipping addresses for.
const ALLOWED_SHIPPING_COUNTRIES: [&str; 3] = ["FR", "US", "CA"];

/// Stripe REST client (form-encoded requests, JSON responses).
pub struct StripeGateway {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
}

#[derive(Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

impl StripeGateway {
    pub fn new(config: &StripeConfig, timeout: Duration) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    async fn post_form(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<reqwest::Response, PaymentError> {
        let response = self
            .client
            .post(format!("{}{}", self.api_base, path))
            .bearer_auth(&self.api_key)
            .form(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PaymentError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

fn checkout_params(request: &CheckoutSessionRequest) -> Vec<(String, String)> {
    let mut params = vec![
        ("mode".to_string(), "payment".to_string()),
        ("locale".to_string(), "fr".to_string()),
        ("payment_method_types[0]".to_string(), "card".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
    ];

    for (i, country) in ALLOWED_SHIPPING_COUNTRIES.iter().enumerate() {
        params.push((
            format!("shipping_address_collection[allowed_countries][{i}]"),
            country.to_string(),
        ));
    }

    for (i, item) in request.line_items.iter().enumerate() {
        params.push((format!("line_items[{i}][price]"), item.price_ref.clone()));
        params.push((format!("line_items[{i}][quantity]"), item.quantity.to_string()));
    }

    match &request.customer {
        CheckoutCustomer::Existing(customer_ref) => {
            params.push(("customer".to_string(), customer_ref.clone()));
        }
        CheckoutCustomer::New { email } => {
            params.push(("customer_email".to_string(), email.clone()));
            params.push(("customer_creation".to_string(), "always".to_string()));
        }
    }

    params
}

fn address_params(address: &CustomerAddress) -> Vec<(String, String)> {
    let fields = [
        ("city", &address.city),
        ("country", &address.country),
        ("line1", &address.line1),
        ("line2", &address.line2),
        ("postal_code", &address.postal_code),
    ];

    let mut params = vec![("shipping[name]".to_string(), address.name.clone())];
    for (key, value) in fields {
        params.push((format!("shipping[address][{key}]"), value.clone()));
        params.push((format!("address[{key}]"), value.clone()));
    }
    params
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSessionCreated, PaymentError> {
        let response = self
            .post_form("/v1/checkout/sessions", &checkout_params(&request))
            .await?;
        let session: SessionResponse = response.json().await?;
        let url = session
            .url
            .ok_or_else(|| PaymentError::InvalidResponse("checkout session has no url".into()))?;

        tracing::info!(session_id = %session.id, "checkout session created");
        Ok(CheckoutSessionCreated {
            id: session.id,
            url,
        })
    }

    async fn update_customer_address(
        &self,
        customer_ref: &str,
        address: &CustomerAddress,
    ) -> Result<(), PaymentError> {
        self.post_form(
            &format!("/v1/customers/{customer_ref}"),
            &address_params(address),
        )
        .await?;
        tracing::info!(customer = customer_ref, "customer address updated");
        Ok(())
    }
}
