use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};

use crate::{
    dto::events::{CreateEventRequest, EventList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Event,
    response::ApiResponse,
    routes::params::EventQuery,
    services::event_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_events).post(create_event))
        .route("/{slug}", get(get_event))
}

#[utoipa::path(
    get,
    path = "/api/events",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("upcoming" = Option<bool>, Query, description = "Only events that have not started"),
        ("sort_order" = Option<String>, Query, description = "asc | desc on start date"),
    ),
    responses(
        (status = 200, description = "List events", body = ApiResponse<EventList>)
    ),
    tag = "Events"
)]
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventQuery>,
) -> AppResult<Json<ApiResponse<EventList>>> {
    let resp = event_service::list_events(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/events/{slug}",
    params(("slug" = String, Path, description = "Event slug")),
    responses(
        (status = 200, description = "Event detail", body = ApiResponse<Event>),
        (status = 404, description = "Event not found"),
    ),
    tag = "Events"
)]
pub async fn get_event(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<ApiResponse<Event>>> {
    let resp = event_service::get_event(&state, &slug).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/events",
    request_body = CreateEventRequest,
    responses(
        (status = 200, description = "Event created", body = ApiResponse<Event>),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Admins only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Events"
)]
pub async fn create_event(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateEventRequest>,
) -> AppResult<Json<ApiResponse<Event>>> {
    let resp = event_service::create_event(&state, &user, payload).await?;
    Ok(Json(resp))
}
