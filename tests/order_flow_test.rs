//! HTTP-level tests of the order lifecycle, run against the in-memory store.
//!
//!   cargo test --test order_flow_test

use std::str::FromStr;
use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use bigdecimal::BigDecimal;
use order_lifecycle::config::AppConfig;
use order_lifecycle::domain::payment::{response_hash, PayuCredentials, WebhookPayload};
use order_lifecycle::domain::ports::{PartnerRepository, SettingsRepository};
use order_lifecycle::domain::partner::PartnerStatus;
use order_lifecycle::handlers::{self, USER_ID_HEADER, USER_ROLE_HEADER};
use order_lifecycle::infrastructure::memory::MemoryStore;
use order_lifecycle::relay::{ChangeKind, ChangeRelay, RecvOutcome, Table};
use order_lifecycle::AppState;
use serde_json::{json, Value};
use uuid::Uuid;

const MERCHANT_KEY: &str = "test-key";
const SALT: &str = "test-salt";

fn config() -> AppConfig {
    AppConfig::from_lookup(|name| match name {
        "DATABASE_URL" => Some("postgres://unused/db".to_string()),
        "PAYU_MERCHANT_KEY" => Some(MERCHANT_KEY.to_string()),
        "PAYU_SALT" => Some(SALT.to_string()),
        _ => None,
    })
    .expect("test configuration is valid")
}

fn state(store: &MemoryStore) -> AppState {
    AppState::new(Arc::new(store.clone()), ChangeRelay::new(), &config())
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state.clone()))
                .configure(handlers::configure),
        )
        .await
    };
}

fn as_user(req: test::TestRequest, user: Uuid, role: &str) -> test::TestRequest {
    req.insert_header((USER_ID_HEADER, user.to_string()))
        .insert_header((USER_ROLE_HEADER, role.to_string()))
}

fn address() -> Value {
    json!({
        "recipient_name": "Asha",
        "phone": "9876543210",
        "apartment": "Lake View",
        "block_no": "B",
        "flat_no": "402",
        "note": null
    })
}

fn checkout_body(store: &MemoryStore, customer: Uuid, method: &str) -> Value {
    let lines: Vec<Value> = store
        .cart_lines(customer)
        .into_iter()
        .map(|l| json!({ "product_id": l.product_id, "quantity": l.quantity }))
        .collect();
    json!({
        "lines": lines,
        "address": address(),
        "payment_method": method,
        "first_name": "Asha",
        "email": "asha@example.com"
    })
}

fn amount(v: &Value) -> BigDecimal {
    BigDecimal::from_str(v.as_str().expect("amount is a string")).expect("amount parses")
}

/// Registers an approved partner directly in the store.
fn approved_partner(store: &MemoryStore) -> (Uuid, Uuid) {
    let user = Uuid::new_v4();
    let partner = store.create_partner(user).unwrap();
    store
        .set_partner_status(partner.id, PartnerStatus::Approved)
        .unwrap();
    (user, partner.id)
}

/// Gateway callback for `fields` as handed out at checkout, signed with the
/// test salt.
fn signed_callback(fields: &Value, status: &str) -> Vec<(String, String)> {
    let field = |name: &str| fields[name].as_str().unwrap_or_default().to_string();
    let mut payload = WebhookPayload {
        txnid: field("txnid"),
        status: status.to_string(),
        amount: field("amount"),
        productinfo: field("productinfo"),
        firstname: field("firstname"),
        email: field("email"),
        hash: String::new(),
    };
    let creds = PayuCredentials {
        merchant_key: MERCHANT_KEY.to_string(),
        salt: SALT.to_string(),
    };
    payload.hash = response_hash(&creds, &payload);
    vec![
        ("txnid".to_string(), payload.txnid),
        ("status".to_string(), payload.status),
        ("amount".to_string(), payload.amount),
        ("productinfo".to_string(), payload.productinfo),
        ("firstname".to_string(), payload.firstname),
        ("email".to_string(), payload.email),
        ("hash".to_string(), payload.hash),
        ("mihpayid".to_string(), "403993715521".to_string()),
    ]
}

fn assert_invariants(order: &Value) {
    let status = order["status"].as_str().unwrap();
    if !order["delivery_partner_id"].is_null() {
        assert!(
            ["assigned", "out_for_delivery", "delivered"].contains(&status),
            "partner set on a {status} order"
        );
    }
    if !order["delivery_confirmation_requested_at"].is_null() {
        assert_eq!(status, "out_for_delivery");
    }
}

#[actix_web::test]
async fn cod_order_runs_the_full_delivery_protocol() {
    let store = MemoryStore::new();
    let state = state(&store);
    let app = app!(state);

    let customer = Uuid::new_v4();
    let admin = Uuid::new_v4();
    let product = store.put_product("Product A", BigDecimal::from(100), 10);
    store.put_cart_item(customer, product, 2);

    // Checkout.
    let req = as_user(test::TestRequest::post().uri("/orders"), customer, "customer")
        .set_json(checkout_body(&store, customer, "cod"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let order = &body["order"];
    let order_id = order["id"].as_str().unwrap().to_string();
    assert_eq!(order["status"], "pending");
    assert_eq!(order["payment_status"], "pending");
    assert_eq!(amount(&order["total_amount"]), BigDecimal::from(220));
    assert!(body["payment"].is_null());
    assert_eq!(store.cart_quantity(customer), 0);

    // Partner P signs up and is approved; partner Q is approved too.
    let p_user = Uuid::new_v4();
    let req = as_user(test::TestRequest::post().uri("/delivery/partners"), p_user, "delivery_partner")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let partner: Value = test::read_body_json(resp).await;
    assert_eq!(partner["status"], "pending");
    let p_id = partner["id"].as_str().unwrap().to_string();

    let req = as_user(
        test::TestRequest::put().uri(&format!("/admin/partners/{p_id}/status")),
        admin,
        "admin",
    )
    .set_json(json!({ "status": "approved" }))
    .to_request();
    let approved: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(approved["allowed"], true);
    let (q_user, _) = approved_partner(&store);

    // Admin assigns P.
    let req = as_user(
        test::TestRequest::post().uri(&format!("/admin/orders/{order_id}/assign")),
        admin,
        "admin",
    )
    .set_json(json!({ "delivery_partner_id": p_id }))
    .to_request();
    let assigned: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(assigned["status"], "assigned");
    assert_eq!(assigned["delivery_partner_id"], p_id.as_str());

    // Q is not the assigned partner: rejected, nothing changes.
    let req = as_user(
        test::TestRequest::post().uri(&format!("/delivery/orders/{order_id}/mark-delivered")),
        q_user,
        "delivery_partner",
    )
    .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    let req = as_user(test::TestRequest::get().uri(&format!("/orders/{order_id}")), customer, "customer")
        .to_request();
    let unchanged: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(unchanged, assigned);

    // P sees the order and marks it delivered.
    let req = as_user(test::TestRequest::get().uri("/delivery/orders"), p_user, "delivery_partner")
        .to_request();
    let open: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(open["total"], 1);

    let req = as_user(
        test::TestRequest::post().uri(&format!("/delivery/orders/{order_id}/mark-delivered")),
        p_user,
        "delivery_partner",
    )
    .to_request();
    let out: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(out["status"], "out_for_delivery");
    assert!(!out["delivery_confirmation_requested_at"].is_null());
    assert_invariants(&out);

    // Customer confirms.
    let req = as_user(
        test::TestRequest::post().uri(&format!("/orders/{order_id}/confirm-delivery")),
        customer,
        "customer",
    )
    .set_json(json!({ "confirmed": true }))
    .to_request();
    let delivered: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(delivered["status"], "delivered");
    assert_eq!(delivered["user_confirmed_delivery"], true);
    assert!(delivered["delivery_confirmation_requested_at"].is_null());
    assert_invariants(&delivered);

    let req = as_user(test::TestRequest::get().uri("/admin/stats"), admin, "admin").to_request();
    let stats: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(stats["total_orders"], 1);
    assert_eq!(stats["by_status"]["delivered"], 1);
    assert_eq!(amount(&stats["delivered_revenue"]), BigDecimal::from(220));
}

#[actix_web::test]
async fn second_confirmation_applies_nothing() {
    let store = MemoryStore::new();
    let state = state(&store);
    let app = app!(state);

    let customer = Uuid::new_v4();
    let admin = Uuid::new_v4();
    let (p_user, p_id) = approved_partner(&store);
    let product = store.put_product("Milk", BigDecimal::from(30), 10);
    store.put_cart_item(customer, product, 1);

    let req = as_user(test::TestRequest::post().uri("/orders"), customer, "customer")
        .set_json(checkout_body(&store, customer, "cod"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let order_id = body["order"]["id"].as_str().unwrap().to_string();

    let req = as_user(
        test::TestRequest::post().uri(&format!("/admin/orders/{order_id}/assign")),
        admin,
        "admin",
    )
    .set_json(json!({ "delivery_partner_id": p_id }))
    .to_request();
    test::call_service(&app, req).await;
    let req = as_user(
        test::TestRequest::post().uri(&format!("/delivery/orders/{order_id}/mark-delivered")),
        p_user,
        "delivery_partner",
    )
    .to_request();
    test::call_service(&app, req).await;

    let confirm = || {
        as_user(
            test::TestRequest::post().uri(&format!("/orders/{order_id}/confirm-delivery")),
            customer,
            "customer",
        )
        .set_json(json!({ "confirmed": true }))
        .to_request()
    };
    let first: Value = test::call_and_read_body_json(&app, confirm()).await;
    let id = Uuid::parse_str(&order_id).unwrap();
    let events_after_first = store.outbox_events(id);

    let resp = test::call_service(&app, confirm()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let second: Value = test::read_body_json(resp).await;
    assert_eq!(first, second);
    assert_eq!(store.outbox_events(id), events_after_first);
    assert_eq!(
        events_after_first.last().map(String::as_str),
        Some("OrderDelivered")
    );
}

#[actix_web::test]
async fn disputed_delivery_goes_back_to_the_partner_and_is_audited() {
    let store = MemoryStore::new();
    let state = state(&store);
    let app = app!(state);

    let customer = Uuid::new_v4();
    let admin = Uuid::new_v4();
    let (p_user, p_id) = approved_partner(&store);
    let product = store.put_product("Bread", BigDecimal::from(40), 10);
    store.put_cart_item(customer, product, 1);

    let req = as_user(test::TestRequest::post().uri("/orders"), customer, "customer")
        .set_json(checkout_body(&store, customer, "cod"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let order_id = body["order"]["id"].as_str().unwrap().to_string();

    let req = as_user(
        test::TestRequest::post().uri(&format!("/admin/orders/{order_id}/assign")),
        admin,
        "admin",
    )
    .set_json(json!({ "delivery_partner_id": p_id }))
    .to_request();
    test::call_service(&app, req).await;
    let req = as_user(
        test::TestRequest::post().uri(&format!("/delivery/orders/{order_id}/mark-delivered")),
        p_user,
        "delivery_partner",
    )
    .to_request();
    test::call_service(&app, req).await;

    let req = as_user(
        test::TestRequest::post().uri(&format!("/orders/{order_id}/confirm-delivery")),
        customer,
        "customer",
    )
    .set_json(json!({ "confirmed": false }))
    .to_request();
    let disputed: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(disputed["status"], "assigned");
    assert_eq!(disputed["delivery_partner_id"], p_id.to_string().as_str());
    assert_eq!(disputed["user_confirmed_delivery"], false);
    assert!(disputed["delivery_confirmation_requested_at"].is_null());
    assert_invariants(&disputed);

    let req = as_user(
        test::TestRequest::get().uri("/admin/activities?status=pending"),
        admin,
        "admin",
    )
    .to_request();
    let activities: Value = test::call_and_read_body_json(&app, req).await;
    let activities = activities.as_array().unwrap();
    assert_eq!(activities.len(), 1);
    assert_eq!(activities[0]["order_id"], order_id.as_str());
    assert_eq!(activities[0]["activity_type"], "rejected_confirmation");
    assert_eq!(activities[0]["severity"], "medium");

    let activity_id = activities[0]["id"].as_str().unwrap();
    let req = as_user(
        test::TestRequest::put().uri(&format!("/admin/activities/{activity_id}/review")),
        admin,
        "admin",
    )
    .set_json(json!({ "status": "resolved", "notes": "customer was not home" }))
    .to_request();
    let resolved: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resolved["status"], "resolved");
    assert_eq!(resolved["reviewed_by"], admin.to_string().as_str());

    let req = as_user(
        test::TestRequest::put().uri(&format!("/admin/activities/{activity_id}/review")),
        admin,
        "admin",
    )
    .set_json(json!({ "status": "dismissed" }))
    .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn empty_cart_is_rejected_without_writing() {
    let store = MemoryStore::new();
    let state = state(&store);
    let app = app!(state);
    let customer = Uuid::new_v4();

    let req = as_user(test::TestRequest::post().uri("/orders"), customer, "customer")
        .set_json(checkout_body(&store, customer, "cod"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("empty"));
    assert_eq!(store.order_count(), 0);
}

#[actix_web::test]
async fn malformed_phone_is_rejected() {
    let store = MemoryStore::new();
    let state = state(&store);
    let app = app!(state);
    let customer = Uuid::new_v4();
    let product = store.put_product("Eggs", BigDecimal::from(60), 10);
    store.put_cart_item(customer, product, 1);

    let mut body = checkout_body(&store, customer, "cod");
    body["address"]["phone"] = json!("12345");
    let req = as_user(test::TestRequest::post().uri("/orders"), customer, "customer")
        .set_json(body)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    assert_eq!(store.order_count(), 0);
    assert_eq!(store.cart_quantity(customer), 1);
}

#[actix_web::test]
async fn later_price_changes_do_not_touch_existing_orders() {
    let store = MemoryStore::new();
    let state = state(&store);
    let app = app!(state);

    let customer = Uuid::new_v4();
    let product = store.put_product("Coffee", BigDecimal::from(250), 10);
    store.put_cart_item(customer, product, 1);

    let req = as_user(test::TestRequest::post().uri("/orders"), customer, "customer")
        .set_json(checkout_body(&store, customer, "cod"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let order_id = body["order"]["id"].as_str().unwrap().to_string();

    store.set_product_price(product, BigDecimal::from(999));

    let req = as_user(test::TestRequest::get().uri(&format!("/orders/{order_id}")), customer, "customer")
        .to_request();
    let order: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(amount(&order["total_amount"]), BigDecimal::from(270));
    assert_eq!(amount(&order["items"][0]["unit_price"]), BigDecimal::from(250));
    assert_eq!(order["items"][0]["product_name"], "Coffee");
}

#[actix_web::test]
async fn paid_upi_order_is_auto_assigned() {
    let store = MemoryStore::new();
    let state = state(&store);
    let app = app!(state);

    let customer = Uuid::new_v4();
    let (_, p_id) = approved_partner(&store);
    store.put_setting("auto_assign_orders", json!(true)).unwrap();
    let product = store.put_product("Rice", BigDecimal::from(100), 10);
    store.put_cart_item(customer, product, 2);

    let req = as_user(test::TestRequest::post().uri("/orders"), customer, "customer")
        .set_json(checkout_body(&store, customer, "upi"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let order_id = body["order"]["id"].as_str().unwrap().to_string();
    let fields = &body["payment"]["fields"];
    assert_eq!(fields["amount"], "220.00");
    assert_eq!(fields["key"], MERCHANT_KEY);
    // Pay-now carts are kept until the payment succeeds.
    assert_eq!(store.cart_quantity(customer), 2);

    let req = test::TestRequest::post()
        .uri("/payments/payu/webhook")
        .set_form(signed_callback(fields, "success"))
        .to_request();
    let settled: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(settled["status"], "settled");
    assert_eq!(settled["payment_status"], "paid");
    assert_eq!(store.cart_quantity(customer), 0);

    let req = as_user(test::TestRequest::get().uri(&format!("/orders/{order_id}")), customer, "customer")
        .to_request();
    let order: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(order["status"], "assigned");
    assert_eq!(order["payment_status"], "paid");
    assert_eq!(order["delivery_partner_id"], p_id.to_string().as_str());

    // A replayed callback is acknowledged without side effects.
    let req = test::TestRequest::post()
        .uri("/payments/payu/webhook")
        .set_form(signed_callback(fields, "success"))
        .to_request();
    let replay: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(replay["status"], "already_settled");
}

#[actix_web::test]
async fn auto_assignment_is_skipped_when_disabled_or_nobody_is_eligible() {
    for (enabled, with_partner) in [(false, true), (true, false)] {
        let store = MemoryStore::new();
        let state = state(&store);
        let app = app!(state);

        let customer = Uuid::new_v4();
        if with_partner {
            approved_partner(&store);
        }
        store
            .put_setting("auto_assign_orders", json!(enabled))
            .unwrap();
        let product = store.put_product("Tea", BigDecimal::from(80), 10);
        store.put_cart_item(customer, product, 1);

        let req = as_user(test::TestRequest::post().uri("/orders"), customer, "customer")
            .set_json(checkout_body(&store, customer, "upi"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let order_id = body["order"]["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::post()
            .uri("/payments/payu/webhook")
            .set_form(signed_callback(&body["payment"]["fields"], "success"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = as_user(test::TestRequest::get().uri(&format!("/orders/{order_id}")), customer, "customer")
            .to_request();
        let order: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(order["status"], "pending");
        assert_eq!(order["payment_status"], "paid");
        assert!(order["delivery_partner_id"].is_null());
    }
}

#[actix_web::test]
async fn forged_callback_is_rejected() {
    let store = MemoryStore::new();
    let state = state(&store);
    let app = app!(state);

    let customer = Uuid::new_v4();
    let product = store.put_product("Oil", BigDecimal::from(150), 10);
    store.put_cart_item(customer, product, 1);
    let req = as_user(test::TestRequest::post().uri("/orders"), customer, "customer")
        .set_json(checkout_body(&store, customer, "upi"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let order_id = body["order"]["id"].as_str().unwrap().to_string();

    let mut form = signed_callback(&body["payment"]["fields"], "success");
    for (name, value) in form.iter_mut() {
        if name == "amount" {
            *value = "1.00".to_string();
        }
    }
    let req = test::TestRequest::post()
        .uri("/payments/payu/webhook")
        .set_form(form)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    let req = as_user(test::TestRequest::get().uri(&format!("/orders/{order_id}")), customer, "customer")
        .to_request();
    let order: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(order["payment_status"], "pending");
}

#[actix_web::test]
async fn out_of_range_page_returns_an_empty_listing() {
    let store = MemoryStore::new();
    let state = state(&store);
    let app = app!(state);
    let customer = Uuid::new_v4();
    let product = store.put_product("Rice", BigDecimal::from(90), 10);
    store.put_cart_item(customer, product, 1);
    let req = as_user(test::TestRequest::post().uri("/orders"), customer, "customer")
        .set_json(checkout_body(&store, customer, "cod"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = as_user(
        test::TestRequest::get().uri("/orders?page=9223372036854775807&limit=100"),
        customer,
        "customer",
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["total"], 1);
    assert!(body["items"].as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn strangers_cannot_see_or_cancel_orders() {
    let store = MemoryStore::new();
    let state = state(&store);
    let app = app!(state);

    let customer = Uuid::new_v4();
    let stranger = Uuid::new_v4();
    let product = store.put_product("Soap", BigDecimal::from(35), 10);
    store.put_cart_item(customer, product, 1);
    let req = as_user(test::TestRequest::post().uri("/orders"), customer, "customer")
        .set_json(checkout_body(&store, customer, "cod"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let order_id = body["order"]["id"].as_str().unwrap().to_string();

    let req = as_user(test::TestRequest::get().uri(&format!("/orders/{order_id}")), stranger, "customer")
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    let req = as_user(
        test::TestRequest::post().uri(&format!("/orders/{order_id}/cancel")),
        stranger,
        "customer",
    )
    .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = as_user(
        test::TestRequest::post().uri(&format!("/orders/{order_id}/cancel")),
        customer,
        "customer",
    )
    .to_request();
    let cancelled: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(cancelled["status"], "cancelled");

    let req = test::TestRequest::get().uri("/admin/stats").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn committed_writes_reach_relay_subscribers() {
    let store = MemoryStore::new();
    let state = state(&store);
    let mut orders = state.relay.subscribe(Table::Orders);
    let app = app!(state);

    let customer = Uuid::new_v4();
    let product = store.put_product("Butter", BigDecimal::from(55), 10);
    store.put_cart_item(customer, product, 1);
    let req = as_user(test::TestRequest::post().uri("/orders"), customer, "customer")
        .set_json(checkout_body(&store, customer, "cod"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    match orders.recv().await {
        RecvOutcome::Event(event) => {
            assert_eq!(event.kind, ChangeKind::Insert);
            assert_eq!(
                event.row_id.map(|id| id.to_string()),
                body["order"]["id"].as_str().map(str::to_string)
            );
        }
        other => panic!("expected an order event, got {other:?}"),
    }
}

#[actix_web::test]
async fn change_feed_is_an_event_stream() {
    let store = MemoryStore::new();
    let state = state(&store);
    let app = app!(state);
    let user = Uuid::new_v4();

    let req = as_user(test::TestRequest::get().uri("/changes?table=orders"), user, "admin")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "text/event-stream"
    );

    let req = as_user(test::TestRequest::get().uri("/changes?table=payments"), user, "admin")
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}
