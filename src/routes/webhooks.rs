use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
};

use crate::{
    dto::webhook::WebhookAck,
    error::AppResult,
    payments::signature::SIGNATURE_HEADER,
    response::ApiResponse,
    services::webhook_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/stripe", post(stripe_webhook))
}

/// The body is taken raw: the signature covers the exact bytes sent.
#[utoipa::path(
    post,
    path = "/api/webhooks/stripe",
    request_body(content = String, content_type = "application/json"),
    params(("Stripe-Signature" = String, Header, description = "t=<unix>,v1=<hex hmac>")),
    responses(
        (status = 200, description = "Notification acknowledged", body = ApiResponse<WebhookAck>),
        (status = 400, description = "Bad signature, malformed payload or missing shipping field"),
        (status = 404, description = "Purchaser unknown"),
        (status = 409, description = "Not enough seats left"),
    ),
    tag = "Webhooks"
)]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<ApiResponse<WebhookAck>>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    let ack = webhook_service::handle_stripe_webhook(&state, signature, &body).await?;
    Ok(Json(ApiResponse::success("Webhook processed", ack, None)))
}
