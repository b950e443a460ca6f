//! Verification payload carried by a ticket's QR code.
//!
//! The payload is a JSON array of four strings:
//! `[purchaser email, ticket id, event name, offer]`. Gate scanners decode it
//! and match it against the ticket store.

use std::io::Cursor;

use anyhow::Context;
use image::{ImageFormat, Luma};
use qrcode::QrCode;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketPayload {
    pub email: String,
    pub ticket_id: Uuid,
    pub event_name: String,
    pub offer: i32,
}

impl TicketPayload {
    pub fn encode(&self) -> String {
        serde_json::json!([
            self.email,
            self.ticket_id.to_string(),
            self.event_name,
            self.offer.to_string(),
        ])
        .to_string()
    }

    pub fn decode(raw: &str) -> anyhow::Result<Self> {
        let fields: Vec<String> =
            serde_json::from_str(raw).context("payload is not a JSON string array")?;
        let [email, ticket_id, event_name, offer]: [String; 4] = fields
            .try_into()
            .map_err(|_| anyhow::anyhow!("payload must have exactly four fields"))?;

        Ok(Self {
            email,
            ticket_id: Uuid::parse_str(&ticket_id).context("invalid ticket id")?,
            event_name,
            offer: offer.parse().context("invalid offer")?,
        })
    }

    /// Renders the encoded payload as a PNG QR code.
    pub fn render_png(&self) -> anyhow::Result<Vec<u8>> {
        let code = QrCode::new(self.encode().as_bytes())
            .map_err(|e| anyhow::anyhow!("qr encoding failed: {e}"))?;
        let image = code.render::<Luma<u8>>().build();

        let mut bytes = Cursor::new(Vec::new());
        image
            .write_to(&mut bytes, ImageFormat::Png)
            .context("png encoding failed")?;
        Ok(bytes.into_inner())
    }
}
