use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use crate::{
    dto::tickets::{TicketList, TicketVerification, TicketView, VerifyTicketRequest},
    entity::{
        Events, Users,
        etickets::{ActiveModel as EticketActive, Column as EticketCol, Entity as Etickets, Model as EticketModel},
        events::Model as EventModel,
        users::Model as UserModel,
    },
    error::{AppError, AppResult},
    mail::TicketDelivery,
    middleware::auth::{AuthUser, ensure_admin},
    models::eticket_from_entity,
    response::{ApiResponse, Meta},
    state::AppState,
    verification::TicketPayload,
};

/// Mints one ticket with a fresh identifier and its QR image.
pub async fn issue_ticket<C: ConnectionTrait>(
    db: &C,
    user: &UserModel,
    event: &EventModel,
    offer: i32,
) -> AppResult<EticketModel> {
    let ticket_id = Uuid::new_v4();
    let qr_code = TicketPayload {
        email: user.email.clone(),
        ticket_id,
        event_name: event.name.clone(),
        offer,
    }
    .render_png()?;

    let ticket = EticketActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.id),
        event_id: Set(event.id),
        offer: Set(offer),
        ticket_id: Set(ticket_id),
        qr_code: Set(qr_code),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await?;

    tracing::info!(
        ticket_id = %ticket.ticket_id,
        event = %event.slug,
        offer,
        "ticket issued"
    );
    Ok(ticket)
}

/// Mails issued tickets. Failures and timeouts are logged only: the stored
/// ticket is the proof of purchase, the mail is a courtesy.
pub async fn deliver_tickets(
    state: &AppState,
    user: &UserModel,
    tickets: &[(EticketModel, EventModel)],
) -> usize {
    let mut delivered = 0;
    for (ticket, event) in tickets {
        let delivery = TicketDelivery {
            recipient_email: user.email.clone(),
            first_name: user.first_name.clone(),
            event_name: event.name.clone(),
            starts_at: event.starts_at.map(|dt| dt.with_timezone(&Utc)),
            place: event.place.clone(),
            offer: ticket.offer,
            ticket_id: ticket.ticket_id,
            qr_png: ticket.qr_code.clone(),
        };

        match tokio::time::timeout(
            state.config.external_timeout,
            state.mailer.send_ticket(&delivery),
        )
        .await
        {
            Ok(Ok(())) => delivered += 1,
            Ok(Err(err)) => {
                tracing::warn!(ticket_id = %ticket.ticket_id, error = %err, "ticket delivery failed")
            }
            Err(_) => {
                tracing::warn!(ticket_id = %ticket.ticket_id, "ticket delivery timed out")
            }
        }
    }
    delivered
}

pub async fn list_tickets(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<TicketList>> {
    let rows = Etickets::find()
        .filter(EticketCol::UserId.eq(user.user_id))
        .order_by_desc(EticketCol::CreatedAt)
        .find_also_related(Events)
        .all(&state.orm)
        .await?;

    let items: Vec<TicketView> = rows
        .into_iter()
        .filter_map(|(ticket, event)| {
            let event = event?;
            let qr_code_png = STANDARD.encode(&ticket.qr_code);
            Some(TicketView {
                ticket: eticket_from_entity(ticket),
                event_name: event.name,
                event_slug: event.slug,
                qr_code_png,
            })
        })
        .collect();

    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "OK",
        TicketList { items },
        Some(Meta::new(1, total, total)),
    ))
}

/// PNG bytes of one of the caller's tickets.
pub async fn ticket_qr(state: &AppState, user: &AuthUser, ticket_id: Uuid) -> AppResult<Vec<u8>> {
    let ticket = Etickets::find()
        .filter(
            Condition::all()
                .add(EticketCol::TicketId.eq(ticket_id))
                .add(EticketCol::UserId.eq(user.user_id)),
        )
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ticket.qr_code)
}

/// Matches a scanned payload against the ticket store.
pub async fn verify_ticket(
    state: &AppState,
    user: &AuthUser,
    payload: VerifyTicketRequest,
) -> AppResult<ApiResponse<TicketVerification>> {
    ensure_admin(user)?;

    let scanned = match TicketPayload::decode(&payload.payload) {
        Ok(scanned) => scanned,
        Err(err) => {
            return Ok(ApiResponse::success(
                "Ticket rejected",
                rejected(None, format!("unreadable payload: {err}")),
                None,
            ));
        }
    };

    let verdict = check_against_store(state, &scanned).await?;
    let message = if verdict.valid {
        "Ticket valid"
    } else {
        "Ticket rejected"
    };
    Ok(ApiResponse::success(message, verdict, None))
}

async fn check_against_store(
    state: &AppState,
    scanned: &TicketPayload,
) -> AppResult<TicketVerification> {
    let Some(ticket) = Etickets::find()
        .filter(EticketCol::TicketId.eq(scanned.ticket_id))
        .one(&state.orm)
        .await?
    else {
        return Ok(rejected(Some(scanned.ticket_id), "unknown ticket".into()));
    };

    let owner = Users::find_by_id(ticket.user_id).one(&state.orm).await?;
    let event = Events::find_by_id(ticket.event_id).one(&state.orm).await?;

    let reason = match (owner, event) {
        (Some(owner), _) if owner.email != scanned.email => Some("purchaser mismatch"),
        (_, Some(event)) if event.name != scanned.event_name => Some("event mismatch"),
        _ if ticket.offer != scanned.offer => Some("offer mismatch"),
        (None, _) | (_, None) => Some("ticket references missing records"),
        _ => None,
    };

    Ok(match reason {
        Some(reason) => rejected(Some(ticket.ticket_id), reason.into()),
        None => TicketVerification {
            valid: true,
            ticket_id: Some(ticket.ticket_id),
            reason: None,
        },
    })
}

fn rejected(ticket_id: Option<Uuid>, reason: String) -> TicketVerification {
    TicketVerification {
        valid: false,
        ticket_id,
        reason: Some(reason),
    }
}
