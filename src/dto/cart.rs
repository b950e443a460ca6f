use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Event, Order};

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub slug: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartLine {
    pub order: Order,
    pub event: Event,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartList {
    pub items: Vec<CartLine>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CartLineUpdate {
    pub order_id: Uuid,
    /// Pack size: 1, 2 or 4 seats.
    pub offer: i32,
    #[serde(default)]
    pub delete: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCartRequest {
    pub items: Vec<CartLineUpdate>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutSessionResponse {
    pub session_id: String,
    pub url: String,
}
