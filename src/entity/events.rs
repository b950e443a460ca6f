use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub slug: String,
    pub starts_at: Option<DateTimeWithTimeZone>,
    pub place: String,
    pub description: String,
    /// `None` means capacity is not tracked for this event.
    pub seats_available: Option<i32>,
    /// Price id in the payment processor's catalog.
    pub price_ref: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::orders::Entity")]
    Orders,
    #[sea_orm(has_many = "super::etickets::Entity")]
    Etickets,
}

impl Related<super::orders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl Related<super::etickets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Etickets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
