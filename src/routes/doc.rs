use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        addresses::AddressList,
        cart::{AddToCartRequest, CartLine, CartLineUpdate, CartList, CheckoutSessionResponse, UpdateCartRequest},
        events::{CreateEventRequest, EventList},
        tickets::{TicketList, TicketVerification, TicketView, VerifyTicketRequest},
        webhook::{WebhookAck, WebhookOutcome},
    },
    models::{Event, Eticket, Offer, Order, ShippingAddress},
    response::{ApiResponse, Meta},
    routes::{addresses, cart, events, health, params, tickets, webhooks},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        events::list_events,
        events::get_event,
        events::create_event,
        cart::cart_list,
        cart::add_to_cart,
        cart::update_cart,
        cart::clear_cart,
        cart::checkout,
        tickets::list_tickets,
        tickets::ticket_qr,
        tickets::verify_ticket,
        addresses::list_addresses,
        addresses::set_default,
        webhooks::stripe_webhook
    ),
    components(
        schemas(
            Event,
            Order,
            Eticket,
            Offer,
            ShippingAddress,
            AddToCartRequest,
            CartLine,
            CartLineUpdate,
            CartList,
            UpdateCartRequest,
            CheckoutSessionResponse,
            CreateEventRequest,
            EventList,
            TicketView,
            TicketList,
            VerifyTicketRequest,
            TicketVerification,
            AddressList,
            WebhookAck,
            WebhookOutcome,
            params::Pagination,
            params::EventQuery,
            params::SortOrder,
            Meta,
            ApiResponse<Event>,
            ApiResponse<EventList>,
            ApiResponse<CartList>,
            ApiResponse<TicketList>,
            ApiResponse<WebhookAck>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Events", description = "Event catalog"),
        (name = "Cart", description = "Cart and checkout session endpoints"),
        (name = "Tickets", description = "Issued e-tickets and gate verification"),
        (name = "Addresses", description = "Shipping addresses"),
        (name = "Webhooks", description = "Payment processor callbacks"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
