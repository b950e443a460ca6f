use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Event;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEventRequest {
    pub name: String,
    pub slug: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub place: Option<String>,
    pub description: Option<String>,
    pub seats_available: Option<i32>,
    pub price_ref: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct EventList {
    #[schema(value_type = Vec<Event>)]
    pub items: Vec<Event>,
}
