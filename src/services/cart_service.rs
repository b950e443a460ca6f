use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::cart::{AddToCartRequest, CartLine, CartList, CheckoutSessionResponse, UpdateCartRequest},
    entity::{
        carts::{ActiveModel as CartActive, Column as CartCol, Entity as Carts, Model as CartModel},
        events::{Column as EventCol, Entity as Events},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, event_from_entity, order_from_entity},
    payments::{CheckoutCustomer, CheckoutSessionRequest, LineItem},
    response::{ApiResponse, Meta},
    state::AppState,
    validation::validate_offer,
};

pub async fn find_cart<C: ConnectionTrait>(db: &C, user_id: Uuid) -> AppResult<Option<CartModel>> {
    Ok(Carts::find()
        .filter(CartCol::UserId.eq(user_id))
        .one(db)
        .await?)
}

pub async fn get_or_create_cart<C: ConnectionTrait>(db: &C, user_id: Uuid) -> AppResult<CartModel> {
    if let Some(cart) = find_cart(db, user_id).await? {
        return Ok(cart);
    }

    let cart = CartActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await?;
    Ok(cart)
}

/// Open (not yet ordered) lines held by a cart, oldest first.
pub async fn open_lines<C: ConnectionTrait>(db: &C, cart: &CartModel) -> AppResult<Vec<OrderModel>> {
    Ok(Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::CartId.eq(cart.id))
                .add(OrderCol::UserId.eq(cart.user_id))
                .add(OrderCol::Ordered.eq(false)),
        )
        .order_by_asc(OrderCol::CreatedAt)
        .all(db)
        .await?)
}

/// Deletes a cart together with its open lines.
///
/// Lines already flagged `ordered` are detached first and survive.
/// Returns the number of open lines removed.
pub async fn delete_cart<C: ConnectionTrait>(db: &C, cart: &CartModel) -> AppResult<u64> {
    Orders::update_many()
        .col_expr(OrderCol::CartId, Expr::value(Option::<Uuid>::None))
        .filter(OrderCol::CartId.eq(cart.id))
        .filter(OrderCol::Ordered.eq(true))
        .exec(db)
        .await?;

    let removed = Orders::delete_many()
        .filter(OrderCol::CartId.eq(cart.id))
        .filter(OrderCol::Ordered.eq(false))
        .exec(db)
        .await?
        .rows_affected;

    Carts::delete_by_id(cart.id).exec(db).await?;
    Ok(removed)
}

/// Flags the given lines as ordered, detaches them and deletes the cart.
/// Must run inside the checkout transaction.
pub async fn finalize_cart<C: ConnectionTrait>(
    db: &C,
    cart: &CartModel,
    lines: Vec<OrderModel>,
) -> AppResult<Vec<OrderModel>> {
    let now = Utc::now();
    let mut finalized = Vec::with_capacity(lines.len());
    for line in lines {
        if line.ordered {
            continue;
        }
        let mut active: OrderActive = line.into();
        active.ordered = Set(true);
        active.ordered_at = Set(Some(now.into()));
        active.cart_id = Set(None);
        finalized.push(active.update(db).await?);
    }

    delete_cart(db, cart).await?;
    Ok(finalized)
}

async fn cart_lines<C: ConnectionTrait>(db: &C, user_id: Uuid) -> AppResult<Vec<CartLine>> {
    let rows = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user_id))
                .add(OrderCol::Ordered.eq(false)),
        )
        .order_by_asc(OrderCol::CreatedAt)
        .find_also_related(Events)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(order, event)| {
            event.map(|event| CartLine {
                order: order_from_entity(order),
                event: event_from_entity(event),
            })
        })
        .collect())
}

pub async fn list_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartList>> {
    let items = cart_lines(&state.orm, user.user_id).await?;
    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "OK",
        CartList { items },
        Some(Meta::new(1, total, total)),
    ))
}

/// Puts an event in the caller's cart. Adding an event that is already in
/// the cart leaves the existing line untouched.
pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<Order>> {
    let txn = state.orm.begin().await?;

    let event = Events::find()
        .filter(EventCol::Slug.eq(payload.slug.as_str()))
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let cart = get_or_create_cart(&txn, user.user_id).await?;

    let existing = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::EventId.eq(event.id))
                .add(OrderCol::Ordered.eq(false)),
        )
        .one(&txn)
        .await?;

    let (line, created) = match existing {
        Some(line) if line.cart_id == Some(cart.id) => (line, false),
        Some(line) => {
            let mut active: OrderActive = line.into();
            active.cart_id = Set(Some(cart.id));
            (active.update(&txn).await?, false)
        }
        None => {
            let line = OrderActive {
                id: Set(Uuid::new_v4()),
                user_id: Set(user.user_id),
                event_id: Set(event.id),
                cart_id: Set(Some(cart.id)),
                quantity: Set(1),
                ordered: Set(false),
                ordered_at: Set(None),
                created_at: Set(Utc::now().into()),
            }
            .insert(&txn)
            .await?;
            (line, true)
        }
    };

    txn.commit().await?;

    if created {
        audit::record(
            &state.orm,
            Some(user.user_id),
            "cart_add",
            "orders",
            serde_json::json!({ "event_id": event.id, "order_id": line.id }),
        )
        .await;
    }

    let message = if created { "Added to cart" } else { "Already in cart" };
    Ok(ApiResponse::success(message, order_from_entity(line), None))
}

/// Applies pack-size changes and deletions to the caller's open lines.
pub async fn update_quantities(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateCartRequest,
) -> AppResult<ApiResponse<CartList>> {
    for item in payload.items.iter().filter(|item| !item.delete) {
        validate_offer(item.offer)?;
    }

    let txn = state.orm.begin().await?;
    for item in &payload.items {
        let line = Orders::find()
            .filter(
                Condition::all()
                    .add(OrderCol::Id.eq(item.order_id))
                    .add(OrderCol::UserId.eq(user.user_id))
                    .add(OrderCol::Ordered.eq(false)),
            )
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound)?;

        if item.delete {
            Orders::delete_by_id(line.id).exec(&txn).await?;
        } else if line.quantity != item.offer {
            let mut active: OrderActive = line.into();
            active.quantity = Set(item.offer);
            active.update(&txn).await?;
        }
    }
    let items = cart_lines(&txn, user.user_id).await?;
    txn.commit().await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "cart_update",
        "orders",
        serde_json::json!({ "lines": payload.items.len() }),
    )
    .await;

    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Cart updated",
        CartList { items },
        Some(Meta::new(1, total, total)),
    ))
}

pub async fn clear_cart(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let txn = state.orm.begin().await?;
    let cart = find_cart(&txn, user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;
    let removed = delete_cart(&txn, &cart).await?;
    txn.commit().await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "cart_clear",
        "carts",
        serde_json::json!({ "cart_id": cart.id, "removed_lines": removed }),
    )
    .await;

    Ok(ApiResponse::success(
        "Cart deleted",
        serde_json::json!({ "removed_lines": removed }),
        Some(Meta::empty()),
    ))
}

/// Opens a hosted checkout session for the caller's cart and returns the
/// redirect URL. Completion arrives later through the webhook.
pub async fn start_checkout(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<CheckoutSessionResponse>> {
    let account = user.load(state).await?;
    let lines = cart_lines(&state.orm, user.user_id).await?;
    if lines.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }

    let mut line_items = Vec::with_capacity(lines.len());
    for line in &lines {
        if line.event.price_ref.is_empty() {
            return Err(AppError::BadRequest(format!(
                "Event {} is not on sale",
                line.event.slug
            )));
        }
        line_items.push(LineItem {
            price_ref: line.event.price_ref.clone(),
            quantity: line.order.quantity,
        });
    }

    let customer = match account.customer_ref.filter(|r| !r.is_empty()) {
        Some(customer_ref) => CheckoutCustomer::Existing(customer_ref),
        None => CheckoutCustomer::New {
            email: account.email,
        },
    };

    let base = state.config.public_base_url.trim_end_matches('/');
    let request = CheckoutSessionRequest {
        line_items,
        customer,
        success_url: format!("{base}/checkout/success"),
        cancel_url: format!("{base}/cart"),
    };

    let session = tokio::time::timeout(
        state.config.external_timeout,
        state.payments.create_checkout_session(request),
    )
    .await
    .map_err(|_| AppError::ExternalService("checkout session creation timed out".into()))?
    .map_err(|e| AppError::ExternalService(e.to_string()))?;

    Ok(ApiResponse::success(
        "Checkout session created",
        CheckoutSessionResponse {
            session_id: session.id,
            url: session.url,
        },
        Some(Meta::empty()),
    ))
}
