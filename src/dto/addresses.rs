use serde::Serialize;
use utoipa::ToSchema;

use crate::models::ShippingAddress;

#[derive(Debug, Serialize, ToSchema)]
pub struct AddressList {
    pub items: Vec<ShippingAddress>,
}
