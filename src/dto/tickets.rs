use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Eticket;

#[derive(Debug, Serialize, ToSchema)]
pub struct TicketView {
    pub ticket: Eticket,
    pub event_name: String,
    pub event_slug: String,
    /// Base64 PNG, ready for a `data:image/png;base64,` URL.
    pub qr_code_png: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TicketList {
    pub items: Vec<TicketView>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyTicketRequest {
    /// Raw text scanned from the QR code.
    pub payload: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TicketVerification {
    pub valid: bool,
    pub ticket_id: Option<Uuid>,
    pub reason: Option<String>,
}
