use axum::{
    Json, Router,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::tickets::{TicketList, TicketVerification, VerifyTicketRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::ticket_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tickets))
        .route("/verify", post(verify_ticket))
        .route("/{ticket_id}/qr", get(ticket_qr))
}

#[utoipa::path(
    get,
    path = "/api/tickets",
    responses(
        (status = 200, description = "Tickets owned by current user", body = ApiResponse<TicketList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Tickets"
)]
pub async fn list_tickets(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<TicketList>>> {
    let resp = ticket_service::list_tickets(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/tickets/{ticket_id}/qr",
    params(("ticket_id" = Uuid, Path, description = "Ticket identifier")),
    responses(
        (status = 200, description = "QR code", content_type = "image/png", body = Vec<u8>),
        (status = 404, description = "Ticket not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Tickets"
)]
pub async fn ticket_qr(
    State(state): State<AppState>,
    user: AuthUser,
    Path(ticket_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let png = ticket_service::ticket_qr(&state, &user, ticket_id).await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}

#[utoipa::path(
    post,
    path = "/api/tickets/verify",
    request_body = VerifyTicketRequest,
    responses(
        (status = 200, description = "Verification verdict", body = ApiResponse<TicketVerification>),
        (status = 403, description = "Admins only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Tickets"
)]
pub async fn verify_ticket(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<VerifyTicketRequest>,
) -> AppResult<Json<ApiResponse<TicketVerification>>> {
    let resp = ticket_service::verify_ticket(&state, &user, payload).await?;
    Ok(Json(resp))
}
