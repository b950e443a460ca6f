use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::addresses::AddressList,
    entity::{
        shipping_addresses::{
            ActiveModel as AddressActive, Column as AddressCol, Entity as ShippingAddresses,
            Model as AddressModel,
        },
        users::Model as UserModel,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{ShippingAddress, address_from_entity},
    payments::{CustomerAddress, notification::CheckoutSession},
    response::{ApiResponse, Meta},
    state::AppState,
    validation::{ShippingFields, validate_shipping},
};

/// Stores the shipping address of a completed checkout. An identical
/// address already on file is reused.
pub async fn record_shipping_address(
    state: &AppState,
    user: &UserModel,
    session: &CheckoutSession,
) -> AppResult<AddressModel> {
    let fields = validate_shipping(session.shipping_details.as_ref())?;

    if let Some(existing) = find_matching(state, user.id, &fields).await? {
        tracing::debug!(address_id = %existing.id, "shipping address already on file");
        return Ok(existing);
    }

    let address = AddressActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.id),
        name: Set(fields.name),
        address_1: Set(fields.address_1),
        address_2: Set(fields.address_2),
        city: Set(fields.city),
        zip_code: Set(fields.zip_code),
        country: Set(fields.country),
        is_default: Set(false),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(user_id = %user.id, address_id = %address.id, "shipping address recorded");
    Ok(address)
}

async fn find_matching(
    state: &AppState,
    user_id: Uuid,
    fields: &ShippingFields,
) -> AppResult<Option<AddressModel>> {
    Ok(ShippingAddresses::find()
        .filter(
            Condition::all()
                .add(AddressCol::UserId.eq(user_id))
                .add(AddressCol::Name.eq(fields.name.as_str()))
                .add(AddressCol::City.eq(fields.city.as_str()))
                .add(AddressCol::Country.eq(fields.country.as_str()))
                .add(AddressCol::Address1.eq(fields.address_1.as_str()))
                .add(AddressCol::Address2.eq(fields.address_2.as_str()))
                .add(AddressCol::ZipCode.eq(fields.zip_code.as_str())),
        )
        .one(&state.orm)
        .await?)
}

pub async fn list_addresses(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<AddressList>> {
    let items: Vec<ShippingAddress> = ShippingAddresses::find()
        .filter(AddressCol::UserId.eq(user.user_id))
        .order_by_desc(AddressCol::IsDefault)
        .order_by_desc(AddressCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(address_from_entity)
        .collect();

    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Addresses",
        AddressList { items },
        Some(Meta::new(1, total, total)),
    ))
}

/// Makes one address the caller's default and pushes it to their payment
/// profile.
///
/// The local change commits first; the profile update is best-effort.
pub async fn set_default_address(
    state: &AppState,
    user: &AuthUser,
    address_id: Uuid,
) -> AppResult<ApiResponse<ShippingAddress>> {
    let account = user.load(state).await?;
    let customer_ref = account
        .customer_ref
        .filter(|r| !r.is_empty())
        .ok_or_else(|| {
            AppError::PreconditionFailed("no payment profile for this account yet".into())
        })?;

    let txn = state.orm.begin().await?;

    let address = ShippingAddresses::find()
        .filter(
            Condition::all()
                .add(AddressCol::Id.eq(address_id))
                .add(AddressCol::UserId.eq(user.user_id)),
        )
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    ShippingAddresses::update_many()
        .col_expr(AddressCol::IsDefault, Expr::value(false))
        .filter(AddressCol::UserId.eq(user.user_id))
        .filter(AddressCol::Id.ne(address.id))
        .exec(&txn)
        .await?;

    let address = if address.is_default {
        address
    } else {
        let mut active: AddressActive = address.into();
        active.is_default = Set(true);
        active.update(&txn).await?
    };

    txn.commit().await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "address_default",
        "shipping_addresses",
        serde_json::json!({ "address_id": address.id }),
    )
    .await;

    propagate_to_profile(state, &customer_ref, &address).await;

    Ok(ApiResponse::success(
        "Default address updated",
        address_from_entity(address),
        Some(Meta::empty()),
    ))
}

async fn propagate_to_profile(state: &AppState, customer_ref: &str, address: &AddressModel) {
    let profile_address = CustomerAddress {
        name: address.name.clone(),
        line1: address.address_1.clone(),
        line2: address.address_2.clone(),
        city: address.city.clone(),
        postal_code: address.zip_code.clone(),
        country: address.country.to_uppercase(),
    };

    match tokio::time::timeout(
        state.config.external_timeout,
        state
            .payments
            .update_customer_address(customer_ref, &profile_address),
    )
    .await
    {
        Ok(Ok(())) => {
            tracing::info!(customer_ref, address_id = %address.id, "payment profile address updated")
        }
        Ok(Err(err)) => {
            tracing::warn!(customer_ref, error = %err, "payment profile address update failed")
        }
        Err(_) => tracing::warn!(customer_ref, "payment profile address update timed out"),
    }
}
