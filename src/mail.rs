//! Ticket delivery by email.
//!
//! [`SmtpTicketMailer`] sends the confirmation with the QR code attached.
//! When no SMTP host is configured the service falls back to
//! [`LogTicketMailer`], which only records the delivery in the logs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::{config::SmtpConfig, models::Offer};

#[derive(Debug, Error)]
pub enum MailError {
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("email build error: {0}")]
    Build(String),
}

/// Everything needed to mail one issued ticket.
#[derive(Debug, Clone)]
pub struct TicketDelivery {
    pub recipient_email: String,
    pub first_name: String,
    pub event_name: String,
    pub starts_at: Option<DateTime<Utc>>,
    pub place: String,
    pub offer: i32,
    pub ticket_id: Uuid,
    pub qr_png: Vec<u8>,
}

impl TicketDelivery {
    pub fn subject(&self) -> String {
        format!("Votre e-billet pour {}", self.event_name)
    }

    pub fn body(&self) -> String {
        let when = self
            .starts_at
            .map(|dt| dt.format("%d/%m/%Y à %H:%M").to_string())
            .unwrap_or_else(|| "une date à confirmer".to_string());
        let offer = Offer::from_seats(self.offer)
            .map(|offer| format!("{} : ", offer.label()))
            .unwrap_or_default();
        format!(
            "Bonjour {},\n\n\
             Votre réservation pour {} est confirmée.\n\
             Rendez-vous le {} ({}).\n\
             {}{} place(s).\n\
             Le QR code joint est à présenter au contrôle d'accès.\n\n\
             La Billetterie",
            self.first_name, self.event_name, when, self.place, offer, self.offer
        )
    }
}

#[async_trait]
pub trait TicketMailer: Send + Sync {
    async fn send_ticket(&self, delivery: &TicketDelivery) -> Result<(), MailError>;
}

pub struct SmtpTicketMailer {
    config: SmtpConfig,
}

impl SmtpTicketMailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TicketMailer for SmtpTicketMailer {
    async fn send_ticket(&self, delivery: &TicketDelivery) -> Result<(), MailError> {
        use lettre::{
            AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
            message::{Attachment, MultiPart, SinglePart, header::ContentType},
            transport::smtp::authentication::Credentials,
        };

        let png = ContentType::parse("image/png").map_err(|e| MailError::Build(e.to_string()))?;
        let attachment = Attachment::new(format!("{}.png", delivery.ticket_id))
            .body(delivery.qr_png.clone(), png);

        let email = Message::builder()
            .from(self.config.from_address.parse()?)
            .to(delivery.recipient_email.parse()?)
            .subject(delivery.subject())
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(delivery.body()))
                    .singlepart(attachment),
            )
            .map_err(|e| MailError::Build(e.to_string()))?;

        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.host)?
                .port(self.config.port);
        if let (Some(user), Some(pass)) = (&self.config.user, &self.config.password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        transport_builder.build().send(email).await?;
        tracing::info!(
            to = %delivery.recipient_email,
            ticket_id = %delivery.ticket_id,
            "ticket mail sent"
        );
        Ok(())
    }
}

pub struct LogTicketMailer;

#[async_trait]
impl TicketMailer for LogTicketMailer {
    async fn send_ticket(&self, delivery: &TicketDelivery) -> Result<(), MailError> {
        tracing::info!(
            to = %delivery.recipient_email,
            ticket_id = %delivery.ticket_id,
            event = %delivery.event_name,
            "smtp not configured, ticket mail skipped"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delivery() -> TicketDelivery {
        TicketDelivery {
            recipient_email: "fan@example.com".into(),
            first_name: "Camille".into(),
            event_name: "Finale d'aviron".into(),
            starts_at: None,
            place: "Vaires-sur-Marne".into(),
            offer: 2,
            ticket_id: Uuid::new_v4(),
            qr_png: vec![],
        }
    }

    #[test]
    fn body_mentions_offer_and_place() {
        let body = delivery().body();
        assert!(body.starts_with("Bonjour Camille"));
        assert!(body.contains("Offre Duo : 2 place(s)"));
        assert!(body.contains("Vaires-sur-Marne"));
        assert!(body.contains("une date à confirmer"));
    }

    #[test]
    fn subject_names_the_event() {
        assert_eq!(delivery().subject(), "Votre e-billet pour Finale d'aviron");
    }

    #[tokio::test]
    async fn log_mailer_always_succeeds() {
        assert!(LogTicketMailer.send_ticket(&delivery()).await.is_ok());
    }
}
