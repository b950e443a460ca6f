use axum::Router;

use crate::state::AppState;

pub mod addresses;
pub mod cart;
pub mod doc;
pub mod events;
pub mod health;
pub mod params;
pub mod tickets;
pub mod webhooks;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/events", events::router())
        .nest("/cart", cart::router())
        .nest("/tickets", tickets::router())
        .nest("/addresses", addresses::router())
        .nest("/webhooks", webhooks::router())
}
