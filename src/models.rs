use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{
    etickets::Model as EticketModel, events::Model as EventModel, orders::Model as OrderModel,
    shipping_addresses::Model as AddressModel,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub starts_at: Option<DateTime<Utc>>,
    pub place: String,
    pub description: String,
    pub seats_available: Option<i32>,
    pub price_ref: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub quantity: i32,
    pub ordered: bool,
    pub ordered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Eticket {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub offer: i32,
    pub ticket_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ShippingAddress {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub address_1: String,
    pub address_2: String,
    pub city: String,
    pub zip_code: String,
    pub country: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    /// Postal rendering, see [`ShippingAddress::display`].
    #[serde(default)]
    pub formatted: String,
}

impl ShippingAddress {
    /// Postal rendering used in confirmation mails and listings.
    pub fn display(&self) -> String {
        let mut lines = vec![self.name.clone(), self.address_1.clone()];
        if !self.address_2.is_empty() {
            lines.push(self.address_2.clone());
        }
        lines.push(format!("{}, {}", self.city, self.zip_code));
        lines.push(self.country.to_uppercase());
        lines.join("\n")
    }
}

/// Pack sizes sold for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Offer {
    Solo,
    Duo,
    Familiale,
}

impl Offer {
    pub const ALL: [Offer; 3] = [Offer::Solo, Offer::Duo, Offer::Familiale];

    pub fn seats(self) -> i32 {
        match self {
            Offer::Solo => 1,
            Offer::Duo => 2,
            Offer::Familiale => 4,
        }
    }

    pub fn from_seats(seats: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|offer| offer.seats() == seats)
    }

    pub fn label(self) -> &'static str {
        match self {
            Offer::Solo => "Offre Solo",
            Offer::Duo => "Offre Duo",
            Offer::Familiale => "Offre Familiale",
        }
    }
}

pub fn event_from_entity(model: EventModel) -> Event {
    Event {
        id: model.id,
        name: model.name,
        slug: model.slug,
        starts_at: model.starts_at.map(|dt| dt.with_timezone(&Utc)),
        place: model.place,
        description: model.description,
        seats_available: model.seats_available,
        price_ref: model.price_ref,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        user_id: model.user_id,
        event_id: model.event_id,
        quantity: model.quantity,
        ordered: model.ordered,
        ordered_at: model.ordered_at.map(|dt| dt.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub fn eticket_from_entity(model: EticketModel) -> Eticket {
    Eticket {
        id: model.id,
        user_id: model.user_id,
        event_id: model.event_id,
        offer: model.offer,
        ticket_id: model.ticket_id,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub fn address_from_entity(model: AddressModel) -> ShippingAddress {
    let mut address = ShippingAddress {
        id: model.id,
        user_id: model.user_id,
        name: model.name,
        address_1: model.address_1,
        address_2: model.address_2,
        city: model.city,
        zip_code: model.zip_code,
        country: model.country,
        is_default: model.is_default,
        created_at: model.created_at.with_timezone(&Utc),
        formatted: String::new(),
    };
    address.formatted = address.display();
    address
}
