use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use uuid::Uuid;

use crate::{
    dto::addresses::AddressList,
    error::AppResult,
    middleware::auth::AuthUser,
    models::ShippingAddress,
    response::ApiResponse,
    services::shipping_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_addresses))
        .route("/{id}/default", put(set_default))
}

#[utoipa::path(
    get,
    path = "/api/addresses",
    responses(
        (status = 200, description = "Shipping addresses, default first", body = ApiResponse<AddressList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Addresses"
)]
pub async fn list_addresses(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<AddressList>>> {
    let resp = shipping_service::list_addresses(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/addresses/{id}/default",
    params(("id" = Uuid, Path, description = "Address ID")),
    responses(
        (status = 200, description = "Default address updated", body = ApiResponse<ShippingAddress>),
        (status = 404, description = "Address not found"),
        (status = 412, description = "No payment profile yet"),
    ),
    security(("bearer_auth" = [])),
    tag = "Addresses"
)]
pub async fn set_default(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ShippingAddress>>> {
    let resp = shipping_service::set_default_address(&state, &user, id).await?;
    Ok(Json(resp))
}
