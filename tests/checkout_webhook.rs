mod common;

use std::collections::HashSet;

use axum::http::StatusCode;
use common::{
    FakeGateway, add_line, completed_event, create_event, create_user, setup, setup_on,
    setup_with_failing_mailer, shared_database_url, shipping_details, signed,
};
use eticketing_api::{
    dto::webhook::WebhookOutcome,
    entity::{
        AuditLogs, Carts, Etickets, Events, Orders, ProcessedNotifications, ShippingAddresses,
        Users, audit_logs::Column as AuditCol, carts::Column as CartCol,
        etickets::Column as EticketCol, orders::Column as OrderCol,
    },
    services::webhook_service::handle_stripe_webhook,
    state::AppState,
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;
use uuid::Uuid;

async fn ticket_count(state: &AppState) -> anyhow::Result<u64> {
    Ok(Etickets::find().count(&state.orm).await?)
}

#[tokio::test]
async fn completed_checkout_issues_one_ticket_per_line_and_clears_cart() -> anyhow::Result<()> {
    let app = setup().await?;
    let state = &app.state;
    let user = create_user(state, "fan@example.com", None).await?;
    let finale = create_event(state, "finale-100m", Some(10)).await?;
    let relay = create_event(state, "relais-4x100", Some(10)).await?;

    add_line(state, &user, &finale, 2).await?;
    add_line(state, &user, &relay, 4).await?;

    let payload = completed_event("evt_1", "fan@example.com", Some("cus_42"), shipping_details());
    let (header, body) = signed(&payload);
    let ack = handle_stripe_webhook(state, Some(header.as_str()), &body).await?;

    assert_eq!(ack.outcome, WebhookOutcome::Processed);
    assert_eq!(ack.tickets_issued, 2);

    let tickets = Etickets::find()
        .filter(EticketCol::UserId.eq(user.id))
        .all(&state.orm)
        .await?;
    assert_eq!(tickets.len(), 2);
    let ids: HashSet<_> = tickets.iter().map(|t| t.ticket_id).collect();
    assert_eq!(ids.len(), 2, "ticket ids must be distinct");
    assert!(tickets.iter().all(|t| t.qr_code.starts_with(&[0x89, b'P', b'N', b'G'])));

    let offers: HashSet<_> = tickets.iter().map(|t| (t.event_id, t.offer)).collect();
    assert!(offers.contains(&(finale.id, 2)));
    assert!(offers.contains(&(relay.id, 4)));

    // Seats taken.
    let finale = Events::find_by_id(finale.id).one(&state.orm).await?.unwrap();
    let relay = Events::find_by_id(relay.id).one(&state.orm).await?.unwrap();
    assert_eq!(finale.seats_available, Some(8));
    assert_eq!(relay.seats_available, Some(6));

    // Cart gone, lines kept as ordered history.
    assert_eq!(Carts::find().count(&state.orm).await?, 0);
    let orders = Orders::find()
        .filter(OrderCol::UserId.eq(user.id))
        .all(&state.orm)
        .await?;
    assert_eq!(orders.len(), 2);
    assert!(orders.iter().all(|o| o.ordered && o.ordered_at.is_some() && o.cart_id.is_none()));

    // Customer reference stored, address recorded, mails sent.
    let user = Users::find_by_id(user.id).one(&state.orm).await?.unwrap();
    assert_eq!(user.customer_ref.as_deref(), Some("cus_42"));
    let addresses = ShippingAddresses::find().all(&state.orm).await?;
    assert_eq!(addresses.len(), 1);
    assert_eq!(addresses[0].city, "PARIS");
    assert_eq!(addresses[0].country, "fr");
    assert_eq!(addresses[0].address_2, "");
    assert_eq!(app.mailer.sent.lock().unwrap().len(), 2);

    Ok(())
}

#[tokio::test]
async fn bad_signature_is_rejected_without_writes() -> anyhow::Result<()> {
    let app = setup().await?;
    let state = &app.state;
    let user = create_user(state, "fan@example.com", None).await?;
    let event = create_event(state, "finale-100m", Some(10)).await?;
    add_line(state, &user, &event, 1).await?;

    let payload = completed_event("evt_1", "fan@example.com", Some("cus_42"), shipping_details());
    let body = payload.to_string().into_bytes();

    for header in [Some("bad-sig"), None] {
        let err = handle_stripe_webhook(state, header, &body).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    let stale = format!("t=1,v1={}", "0".repeat(64));
    let err = handle_stripe_webhook(state, Some(stale.as_str()), &body).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    assert_eq!(ticket_count(state).await?, 0);
    assert_eq!(ProcessedNotifications::find().count(&state.orm).await?, 0);
    assert_eq!(ShippingAddresses::find().count(&state.orm).await?, 0);
    assert_eq!(Carts::find().count(&state.orm).await?, 1);
    let event = Events::find_by_id(event.id).one(&state.orm).await?.unwrap();
    assert_eq!(event.seats_available, Some(10));
    Ok(())
}

#[tokio::test]
async fn malformed_payload_is_rejected() -> anyhow::Result<()> {
    let app = setup().await?;
    let (header, body) = signed(&json!({ "id": "evt_1" }));
    let err = handle_stripe_webhook(&app.state, Some(header.as_str()), &body)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn missing_country_still_completes_order() -> anyhow::Result<()> {
    let app = setup().await?;
    let state = &app.state;
    let user = create_user(state, "fan@example.com", None).await?;
    let event = create_event(state, "finale-100m", Some(10)).await?;
    add_line(state, &user, &event, 1).await?;

    let mut shipping = shipping_details();
    shipping["address"]
        .as_object_mut()
        .unwrap()
        .remove("country");
    let payload = completed_event("evt_1", "fan@example.com", None, shipping);
    let (header, body) = signed(&payload);

    let err = handle_stripe_webhook(state, Some(header.as_str()), &body)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    assert_eq!(ticket_count(state).await?, 1);
    assert_eq!(Carts::find().count(&state.orm).await?, 0);
    assert_eq!(ShippingAddresses::find().count(&state.orm).await?, 0);
    Ok(())
}

#[tokio::test]
async fn unknown_purchaser_is_not_found() -> anyhow::Result<()> {
    let app = setup().await?;
    let state = &app.state;
    let payload = completed_event("evt_1", "nobody@example.com", None, shipping_details());
    let (header, body) = signed(&payload);

    let err = handle_stripe_webhook(state, Some(header.as_str()), &body)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
    assert_eq!(ProcessedNotifications::find().count(&state.orm).await?, 0);
    Ok(())
}

#[tokio::test]
async fn other_event_types_are_acknowledged() -> anyhow::Result<()> {
    let app = setup().await?;
    let state = &app.state;
    let payload = json!({
        "id": "evt_2",
        "type": "payment_intent.succeeded",
        "data": { "object": {} }
    });
    let (header, body) = signed(&payload);

    let ack = handle_stripe_webhook(state, Some(header.as_str()), &body).await?;
    assert_eq!(ack.outcome, WebhookOutcome::Ignored);
    assert_eq!(ProcessedNotifications::find().count(&state.orm).await?, 0);
    Ok(())
}

#[tokio::test]
async fn redelivery_is_a_no_op() -> anyhow::Result<()> {
    let app = setup().await?;
    let state = &app.state;
    let user = create_user(state, "fan@example.com", None).await?;
    let event = create_event(state, "finale-100m", Some(10)).await?;
    add_line(state, &user, &event, 2).await?;

    let payload = completed_event("evt_1", "fan@example.com", None, shipping_details());
    let (header, body) = signed(&payload);
    handle_stripe_webhook(state, Some(header.as_str()), &body).await?;

    // A new cart filled before the redelivery must stay untouched.
    add_line(state, &user, &event, 1).await?;

    let ack = handle_stripe_webhook(state, Some(header.as_str()), &body).await?;
    assert_eq!(ack.outcome, WebhookOutcome::Duplicate);
    assert_eq!(ticket_count(state).await?, 1);
    assert_eq!(Carts::find().count(&state.orm).await?, 1);
    let event = Events::find_by_id(event.id).one(&state.orm).await?.unwrap();
    assert_eq!(event.seats_available, Some(8));
    Ok(())
}

#[tokio::test]
async fn completion_without_cart_is_bad_request() -> anyhow::Result<()> {
    let app = setup().await?;
    let state = &app.state;
    create_user(state, "fan@example.com", None).await?;

    let payload = completed_event("evt_1", "fan@example.com", None, shipping_details());
    let (header, body) = signed(&payload);
    let err = handle_stripe_webhook(state, Some(header.as_str()), &body)
        .await
        .unwrap_err();

    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert_eq!(ProcessedNotifications::find().count(&state.orm).await?, 0);
    // Shipping recording runs on its own.
    assert_eq!(ShippingAddresses::find().count(&state.orm).await?, 1);
    Ok(())
}

// The in-memory database has a single connection, so the two completions
// take turns here. The shared-database variant below races for real.
#[tokio::test]
async fn concurrent_completions_never_oversell() -> anyhow::Result<()> {
    let app = setup().await?;
    let state = &app.state;
    let event = create_event(state, "finale-100m", Some(3)).await?;
    let first = create_user(state, "first@example.com", None).await?;
    let second = create_user(state, "second@example.com", None).await?;
    add_line(state, &first, &event, 2).await?;
    add_line(state, &second, &event, 2).await?;

    let (h1, b1) = signed(&completed_event("evt_a", "first@example.com", None, shipping_details()));
    let (h2, b2) = signed(&completed_event("evt_b", "second@example.com", None, shipping_details()));

    let (r1, r2) = tokio::join!(
        handle_stripe_webhook(state, Some(h1.as_str()), &b1),
        handle_stripe_webhook(state, Some(h2.as_str()), &b2),
    );

    let outcomes = [r1, r2];
    let succeeded = outcomes.iter().filter(|r| r.is_ok()).count();
    let conflicts = outcomes
        .iter()
        .filter(|r| matches!(r, Err(e) if e.status() == StatusCode::CONFLICT))
        .count();
    assert_eq!(succeeded, 1);
    assert_eq!(conflicts, 1);

    let event = Events::find_by_id(event.id).one(&state.orm).await?.unwrap();
    assert_eq!(event.seats_available, Some(1));
    assert_eq!(ticket_count(state).await?, 1);

    // The refused cart is left for follow-up.
    assert_eq!(Carts::find().count(&state.orm).await?, 1);
    Ok(())
}

#[tokio::test]
async fn events_without_seat_counter_are_unlimited() -> anyhow::Result<()> {
    let app = setup().await?;
    let state = &app.state;
    let user = create_user(state, "fan@example.com", None).await?;
    let event = create_event(state, "ceremonie", None).await?;
    add_line(state, &user, &event, 4).await?;

    let (header, body) = signed(&completed_event("evt_1", "fan@example.com", None, shipping_details()));
    let ack = handle_stripe_webhook(state, Some(header.as_str()), &body).await?;

    assert_eq!(ack.tickets_issued, 1);
    let event = Events::find_by_id(event.id).one(&state.orm).await?.unwrap();
    assert_eq!(event.seats_available, None);
    Ok(())
}

#[tokio::test]
async fn concurrent_completions_never_oversell_on_shared_database() -> anyhow::Result<()> {
    let Some(database_url) = shared_database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL to race completions on a real database.");
        return Ok(());
    };
    let app = setup_on(&database_url, FakeGateway::default()).await?;
    let state = &app.state;

    // The database outlives the test, so every row gets a fresh name.
    let run = Uuid::new_v4().simple().to_string();
    let event = create_event(state, &format!("race-{run}"), Some(3)).await?;
    let emails = [
        format!("first-{run}@example.com"),
        format!("second-{run}@example.com"),
    ];
    let mut users = Vec::new();
    for email in &emails {
        let user = create_user(state, email, None).await?;
        add_line(state, &user, &event, 2).await?;
        users.push(user);
    }

    let first = completed_event(&format!("evt_a_{run}"), &emails[0], None, shipping_details());
    let second = completed_event(&format!("evt_b_{run}"), &emails[1], None, shipping_details());
    let (h1, b1) = signed(&first);
    let (h2, b2) = signed(&second);
    let (r1, r2) = tokio::join!(
        handle_stripe_webhook(state, Some(h1.as_str()), &b1),
        handle_stripe_webhook(state, Some(h2.as_str()), &b2),
    );

    let outcomes = [r1, r2];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(e) if e.status() == StatusCode::CONFLICT)));

    let event_row = Events::find_by_id(event.id).one(&state.orm).await?.unwrap();
    assert_eq!(event_row.seats_available, Some(1));
    let tickets = Etickets::find()
        .filter(EticketCol::EventId.eq(event.id))
        .count(&state.orm)
        .await?;
    assert_eq!(tickets, 1);
    let carts = Carts::find()
        .filter(CartCol::UserId.is_in(users.iter().map(|u| u.id)))
        .count(&state.orm)
        .await?;
    assert_eq!(carts, 1);
    Ok(())
}

#[tokio::test]
async fn refused_capacity_is_audited_and_redelivery_changes_nothing() -> anyhow::Result<()> {
    let app = setup().await?;
    let state = &app.state;
    let user = create_user(state, "fan@example.com", None).await?;
    let event = create_event(state, "finale-100m", Some(1)).await?;
    let order_id = add_line(state, &user, &event, 2).await?;

    let (header, body) = signed(&completed_event("evt_1", "fan@example.com", None, shipping_details()));
    for _ in 0..2 {
        let err = handle_stripe_webhook(state, Some(header.as_str()), &body)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    let event = Events::find_by_id(event.id).one(&state.orm).await?.unwrap();
    assert_eq!(event.seats_available, Some(1));
    assert_eq!(ticket_count(state).await?, 0);
    assert_eq!(ProcessedNotifications::find().count(&state.orm).await?, 0);
    assert_eq!(Carts::find().count(&state.orm).await?, 1);
    let line = Orders::find_by_id(order_id).one(&state.orm).await?.unwrap();
    assert!(!line.ordered);

    // One trace per refused delivery.
    let refusals = AuditLogs::find()
        .filter(AuditCol::Action.eq("checkout_capacity_exceeded"))
        .filter(AuditCol::UserId.eq(user.id))
        .all(&state.orm)
        .await?;
    assert_eq!(refusals.len(), 2);
    let metadata = refusals[0].metadata.clone().unwrap_or_default();
    assert_eq!(metadata["notification_id"], "evt_1");
    Ok(())
}

#[tokio::test]
async fn failed_ticket_mail_keeps_the_purchase() -> anyhow::Result<()> {
    let app = setup_with_failing_mailer().await?;
    let state = &app.state;
    let user = create_user(state, "fan@example.com", None).await?;
    let event = create_event(state, "finale-100m", Some(10)).await?;
    add_line(state, &user, &event, 2).await?;

    let (header, body) = signed(&completed_event("evt_1", "fan@example.com", None, shipping_details()));
    let ack = handle_stripe_webhook(state, Some(header.as_str()), &body).await?;

    assert_eq!(ack.outcome, WebhookOutcome::Processed);
    assert_eq!(ack.tickets_issued, 1);
    assert_eq!(ticket_count(state).await?, 1);
    assert_eq!(Carts::find().count(&state.orm).await?, 0);
    let event = Events::find_by_id(event.id).one(&state.orm).await?.unwrap();
    assert_eq!(event.seats_available, Some(8));
    assert!(ProcessedNotifications::find_by_id("evt_1".to_string())
        .one(&state.orm)
        .await?
        .is_some());
    Ok(())
}

#[tokio::test]
async fn same_address_in_other_casing_is_reused() -> anyhow::Result<()> {
    let app = setup().await?;
    let state = &app.state;
    let user = create_user(state, "fan@example.com", None).await?;
    let event = create_event(state, "finale-100m", None).await?;

    add_line(state, &user, &event, 1).await?;
    let (header, body) = signed(&completed_event("evt_1", "fan@example.com", None, shipping_details()));
    handle_stripe_webhook(state, Some(header.as_str()), &body).await?;

    let mut lower = shipping_details();
    lower["address"]["city"] = json!("paris");
    lower["address"]["country"] = json!("fr");
    add_line(state, &user, &event, 1).await?;
    let (header, body) = signed(&completed_event("evt_2", "fan@example.com", None, lower));
    handle_stripe_webhook(state, Some(header.as_str()), &body).await?;
    assert_eq!(ShippingAddresses::find().count(&state.orm).await?, 1);

    let mut other_floor = shipping_details();
    other_floor["address"]["line2"] = json!("Bât. B");
    add_line(state, &user, &event, 1).await?;
    let (header, body) = signed(&completed_event("evt_3", "fan@example.com", None, other_floor));
    handle_stripe_webhook(state, Some(header.as_str()), &body).await?;

    let addresses = ShippingAddresses::find().all(&state.orm).await?;
    assert_eq!(addresses.len(), 2);
    assert!(addresses.iter().any(|a| a.address_2 == "Bât. B" && a.city == "PARIS"));
    assert_eq!(ticket_count(state).await?, 3);
    Ok(())
}
