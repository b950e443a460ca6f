use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, DatabaseTransaction, DbErr, EntityTrait, Set, SqlErr, TransactionTrait,
};

use crate::{
    audit,
    entity::{
        Events,
        etickets::Model as EticketModel,
        events::Model as EventModel,
        processed_notifications::ActiveModel as ProcessedActive,
        users::{ActiveModel as UserActive, Model as UserModel},
    },
    error::{AppError, AppResult},
    payments::notification::{CheckoutSession, Notification},
    services::{
        cart_service::{finalize_cart, find_cart, open_lines},
        inventory::decrement_seats,
        ticket_service::{deliver_tickets, issue_ticket},
    },
    state::AppState,
};

#[derive(Debug)]
pub enum OrderCompletion {
    Completed { tickets: Vec<EticketModel> },
    /// The notification id was already recorded by an earlier delivery.
    Duplicate,
}

/// Turns the purchaser's cart into tickets.
///
/// Everything durable happens in one transaction: the notification id is
/// recorded first, then each open line takes its seats and gets a ticket,
/// then the lines are marked ordered and the cart is deleted. Any failure
/// (including a sold-out event) leaves the cart as it was. Ticket mails go
/// out only after commit.
pub async fn complete_order(
    state: &AppState,
    user: &UserModel,
    session: &CheckoutSession,
    notification: &Notification,
) -> AppResult<OrderCompletion> {
    let txn = state.orm.begin().await?;

    if !record_notification(&txn, notification).await? {
        tracing::info!(notification_id = %notification.id, "notification already processed");
        return Ok(OrderCompletion::Duplicate);
    }

    let cart = find_cart(&txn, user.id)
        .await?
        .ok_or_else(|| AppError::BadRequest("No cart for purchaser".into()))?;
    let lines = open_lines(&txn, &cart).await?;
    if lines.is_empty() {
        return Err(AppError::BadRequest("Cart has no line items".into()));
    }

    let mut issued: Vec<(EticketModel, EventModel)> = Vec::with_capacity(lines.len());
    for line in &lines {
        let event = Events::find_by_id(line.event_id)
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound)?;

        decrement_seats(&txn, event.id, line.quantity).await?;
        let ticket = issue_ticket(&txn, user, &event, line.quantity).await?;
        issued.push((ticket, event));
    }

    let new_customer_ref = session
        .customer
        .as_deref()
        .filter(|r| !r.is_empty() && user.customer_ref.as_deref() != Some(*r));
    if let Some(customer_ref) = new_customer_ref {
        let mut active: UserActive = user.clone().into();
        active.customer_ref = Set(Some(customer_ref.to_string()));
        active.update(&txn).await?;
    }

    let finalized = finalize_cart(&txn, &cart, lines).await?;
    txn.commit().await?;

    tracing::info!(
        user_id = %user.id,
        notification_id = %notification.id,
        lines = finalized.len(),
        tickets = issued.len(),
        "checkout completed"
    );

    audit::record(
        &state.orm,
        Some(user.id),
        "checkout_completed",
        "orders",
        serde_json::json!({
            "notification_id": notification.id,
            "orders": finalized.iter().map(|o| o.id).collect::<Vec<_>>(),
            "tickets": issued.iter().map(|(t, _)| t.ticket_id).collect::<Vec<_>>(),
        }),
    )
    .await;

    deliver_tickets(state, user, &issued).await;

    Ok(OrderCompletion::Completed {
        tickets: issued.into_iter().map(|(ticket, _)| ticket).collect(),
    })
}

/// Inserts the notification id. Returns `false` when another delivery got
/// there first.
async fn record_notification(txn: &DatabaseTransaction, notification: &Notification) -> AppResult<bool> {
    let insert = ProcessedActive {
        id: Set(notification.id.clone()),
        event_type: Set(notification.event_type.clone()),
        processed_at: Set(Utc::now().into()),
    }
    .insert(txn)
    .await;

    match insert {
        Ok(_) => Ok(true),
        Err(err) if is_unique_violation(&err) => Ok(false),
        Err(err) => Err(err.into()),
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
