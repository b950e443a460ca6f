use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, sea_query::Expr};
use uuid::Uuid;

use crate::{
    entity::events::{Column as EventCol, Entity as Events},
    error::{AppError, AppResult},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatDecrement {
    Applied,
    /// The event does not track capacity; nothing was changed.
    Untracked,
}

/// Takes `quantity` seats from an event in one conditional UPDATE.
///
/// The row only changes when the counter is set and at least `quantity`, so
/// concurrent checkouts can never push it below zero. Events without a
/// counter are treated as unlimited.
pub async fn decrement_seats<C: ConnectionTrait>(
    db: &C,
    event_id: Uuid,
    quantity: i32,
) -> AppResult<SeatDecrement> {
    if quantity <= 0 {
        return Err(AppError::InvalidValue {
            field: "quantity",
            reason: "must be greater than 0".into(),
        });
    }

    let result = Events::update_many()
        .col_expr(
            EventCol::SeatsAvailable,
            Expr::col(EventCol::SeatsAvailable).sub(quantity),
        )
        .filter(EventCol::Id.eq(event_id))
        .filter(EventCol::SeatsAvailable.gte(quantity))
        .exec(db)
        .await?;

    if result.rows_affected > 0 {
        tracing::debug!(%event_id, quantity, "seats decremented");
        return Ok(SeatDecrement::Applied);
    }

    let event = Events::find_by_id(event_id)
        .one(db)
        .await?
        .ok_or(AppError::NotFound)?;

    match event.seats_available {
        None => {
            tracing::debug!(%event_id, quantity, "event has no seat counter, decrement skipped");
            Ok(SeatDecrement::Untracked)
        }
        Some(remaining) => {
            tracing::warn!(
                %event_id,
                remaining,
                requested = quantity,
                "seat decrement refused"
            );
            Err(AppError::CapacityExceeded(event.name))
        }
    }
}
