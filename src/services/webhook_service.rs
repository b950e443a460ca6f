use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use crate::{
    audit,
    dto::webhook::{WebhookAck, WebhookOutcome},
    entity::{ProcessedNotifications, Users, users::Column as UserCol},
    error::{AppError, AppResult},
    payments::{notification::Notification, signature},
    services::{
        order_service::{OrderCompletion, complete_order},
        shipping_service::record_shipping_address,
    },
    state::AppState,
};

/// Entry point for payment processor notifications.
///
/// Nothing is written before the signature and the payload check out. For a
/// completed checkout, order completion and shipping recording run one after
/// the other; a failure in one does not stop the other, and the first
/// failure decides the response.
pub async fn handle_stripe_webhook(
    state: &AppState,
    signature_header: Option<&str>,
    body: &[u8],
) -> AppResult<WebhookAck> {
    let stripe = &state.config.stripe;
    if let Err(err) = signature::verify(
        body,
        signature_header,
        &stripe.endpoint_secret,
        stripe.webhook_tolerance_secs,
        Utc::now().timestamp(),
    ) {
        tracing::warn!(error = %err, "webhook rejected");
        return Err(AppError::InvalidSignature);
    }

    let notification = Notification::parse(body)?;
    if !notification.is_checkout_completed() {
        tracing::debug!(
            notification_id = %notification.id,
            event_type = %notification.event_type,
            "webhook event ignored"
        );
        return Ok(ack(WebhookOutcome::Ignored, 0));
    }

    if ProcessedNotifications::find_by_id(notification.id.clone())
        .one(&state.orm)
        .await?
        .is_some()
    {
        tracing::info!(notification_id = %notification.id, "duplicate webhook delivery");
        return Ok(ack(WebhookOutcome::Duplicate, 0));
    }

    let session = notification.checkout_session()?;
    let email = session.purchaser_email().ok_or(AppError::UnknownUser)?;
    let user = Users::find()
        .filter(UserCol::Email.eq(email))
        .one(&state.orm)
        .await?
        .ok_or_else(|| {
            tracing::warn!(notification_id = %notification.id, "webhook for unknown purchaser");
            AppError::UnknownUser
        })?;

    let completion = complete_order(state, &user, &session, &notification).await;
    if let Err(err) = &completion {
        tracing::warn!(notification_id = %notification.id, error = %err, "order completion failed");
    }
    if let Err(AppError::CapacityExceeded(event)) = &completion {
        // Paid but not fulfilled: each refused delivery leaves a trace for manual follow-up.
        audit::record(
            &state.orm,
            Some(user.id),
            "checkout_capacity_exceeded",
            "orders",
            serde_json::json!({
                "notification_id": notification.id,
                "event": event,
            }),
        )
        .await;
    }

    if matches!(completion, Ok(OrderCompletion::Duplicate)) {
        return Ok(ack(WebhookOutcome::Duplicate, 0));
    }

    let shipping = record_shipping_address(state, &user, &session).await;
    if let Err(err) = &shipping {
        tracing::warn!(notification_id = %notification.id, error = %err, "shipping address not recorded");
    }

    let tickets_issued = match completion? {
        OrderCompletion::Completed { tickets } => tickets.len(),
        OrderCompletion::Duplicate => 0,
    };
    shipping?;

    Ok(ack(WebhookOutcome::Processed, tickets_issued))
}

fn ack(outcome: WebhookOutcome, tickets_issued: usize) -> WebhookAck {
    WebhookAck {
        outcome,
        tickets_issued,
    }
}
