use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::events::{CreateEventRequest, EventList},
    entity::events::{ActiveModel, Column, Entity as Events},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Event, event_from_entity},
    response::{ApiResponse, Meta},
    routes::params::{EventQuery, SortOrder},
    state::AppState,
    validation::{slugify, validate_event_name},
};

pub async fn list_events(state: &AppState, query: EventQuery) -> AppResult<ApiResponse<EventList>> {
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if query.upcoming.unwrap_or(false) {
        condition = condition.add(Column::StartsAt.gt(Utc::now()));
    }

    let mut finder = Events::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Asc) {
        SortOrder::Asc => finder.order_by_asc(Column::StartsAt),
        SortOrder::Desc => finder.order_by_desc(Column::StartsAt),
    };
    finder = finder.order_by_asc(Column::Name);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(event_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Events", EventList { items }, Some(meta)))
}

pub async fn get_event(state: &AppState, slug: &str) -> AppResult<ApiResponse<Event>> {
    let event = Events::find()
        .filter(Column::Slug.eq(slug))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Event", event_from_entity(event), None))
}

pub async fn create_event(
    state: &AppState,
    user: &AuthUser,
    payload: CreateEventRequest,
) -> AppResult<ApiResponse<Event>> {
    ensure_admin(user)?;

    let name = validate_event_name(&payload.name)?;
    let slug = match payload.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(slug) => slugify(slug),
        None => slugify(&name),
    };
    if slug.is_empty() {
        return Err(AppError::InvalidValue {
            field: "slug",
            reason: "must contain at least one letter or digit".into(),
        });
    }
    if payload.seats_available.is_some_and(|seats| seats < 0) {
        return Err(AppError::InvalidValue {
            field: "seats_available",
            reason: "must not be negative".into(),
        });
    }

    let taken = Events::find()
        .filter(Column::Slug.eq(slug.as_str()))
        .count(&state.orm)
        .await?;
    if taken > 0 {
        return Err(AppError::BadRequest(format!("Slug {slug} already in use")));
    }

    let event = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        slug: Set(slug),
        starts_at: Set(payload.starts_at.map(Into::into)),
        place: Set(payload.place.unwrap_or_default()),
        description: Set(payload.description.unwrap_or_default()),
        seats_available: Set(payload.seats_available),
        price_ref: Set(payload.price_ref.unwrap_or_default()),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "event_create",
        "events",
        serde_json::json!({ "event_id": event.id, "slug": event.slug }),
    )
    .await;

    Ok(ApiResponse::success(
        "Event created",
        event_from_entity(event),
        Some(Meta::empty()),
    ))
}
