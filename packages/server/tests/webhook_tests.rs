//! Gateway webhook ingestion.

mod common;

use axum::http::StatusCode;
use common::*;
use saas_core::domains::billing::models::Invoice;
use saas_core::domains::user::models::User;
use saas_core::kernel::test_dependencies::GatewayCall;
use saas_core::kernel::GatewayEvent;
use serde_json::{json, Value};
use test_context::test_context;

fn invoice_event(id: &str, customer: &str) -> GatewayEvent {
    GatewayEvent {
        id: id.to_string(),
        event_type: "invoice.created".to_string(),
        object: json!({
            "object": "invoice",
            "customer": customer,
            "currency": "usd",
            "receipt_number": "1234-5678",
            "tax": null,
            "tax_percent": null,
            "total": 999,
            "lines": {
                "data": [{
                    "plan": {
                        "id": "gold",
                        "name": "Gold",
                        "statement_descriptor": "SAAS GOLD",
                        "interval": "month"
                    },
                    "period": { "start": 1_434_371_855, "end": 1_437_050_255 }
                }]
            }
        }),
    }
}

fn other_event(id: &str) -> GatewayEvent {
    GatewayEvent {
        id: id.to_string(),
        event_type: "customer.updated".to_string(),
        object: Value::Null,
    }
}

#[test_context(TestHarness)]
#[tokio::test]
async fn invoice_created_is_recorded_with_card_snapshot(ctx: &TestHarness) {
    let alice = create_member(&ctx.db_pool, "alice").await.unwrap();
    let alice = subscribe(&ctx.db_pool, &alice, "gold", distant_expiry())
        .await
        .unwrap();
    ctx.mocks
        .gateway
        .add_event(invoice_event("evt_1", "cus_alice"));

    let response = ctx
        .client()
        .post("/api/stripe_webhook", json!({ "id": "evt_1", "type": "forged" }))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({ "success": true }));
    assert!(ctx.mocks.gateway.calls().contains(&GatewayCall::RetrieveEvent {
        event_id: "evt_1".to_string(),
    }));

    let invoices = Invoice::billing_history(alice.id, &ctx.db_pool).await.unwrap();
    assert_eq!(invoices.len(), 1);
    let invoice = &invoices[0];
    assert_eq!(invoice.plan.as_deref(), Some("Gold"));
    assert_eq!(invoice.description.as_deref(), Some("SAAS GOLD"));
    assert_eq!(invoice.total, 999);
    assert_eq!(invoice.last4.as_deref(), Some("4242"));
    assert_eq!(invoice.period_start_on.unwrap().to_string(), "2015-06-15");

    // Billing history shows it to the user
    let history = ctx
        .client()
        .bearer(token_for(&ctx.deps, &alice))
        .get("/api/v1/invoices")
        .await;
    assert_eq!(history.body["data"]["invoices"][0]["receipt_number"], "1234-5678");
}

#[test_context(TestHarness)]
#[tokio::test]
async fn invoice_for_unknown_customer_is_skipped(ctx: &TestHarness) {
    ctx.mocks
        .gateway
        .add_event(invoice_event("evt_2", "cus_nobody"));

    let response = ctx
        .client()
        .post("/api/stripe_webhook", json!({ "id": "evt_2" }))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["success"], true);
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices")
        .fetch_one(&ctx.db_pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn invoice_for_customer_without_card_is_skipped(ctx: &TestHarness) {
    let bob = create_member(&ctx.db_pool, "bob").await.unwrap();
    User::set_payment_details(bob.id, "cus_bob", "Bob", &ctx.db_pool)
        .await
        .unwrap();
    ctx.mocks
        .gateway
        .add_event(invoice_event("evt_5", "cus_bob"));

    let response = ctx
        .client()
        .post("/api/stripe_webhook", json!({ "id": "evt_5" }))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({ "success": true }));
    assert!(Invoice::billing_history(bob.id, &ctx.db_pool)
        .await
        .unwrap()
        .is_empty());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn untracked_event_types_are_acknowledged(ctx: &TestHarness) {
    ctx.mocks.gateway.add_event(other_event("evt_3"));

    let response = ctx
        .client()
        .post("/api/stripe_webhook", json!({ "id": "evt_3" }))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["success"], true);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn unknown_event_is_unprocessable(ctx: &TestHarness) {
    let response = ctx
        .client()
        .post("/api/stripe_webhook", json!({ "id": "evt_missing" }))
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.error(), "No such event: evt_missing");
}

#[test_context(TestHarness)]
#[tokio::test]
async fn event_without_id_is_a_bad_request(ctx: &TestHarness) {
    let response = ctx
        .client()
        .post("/api/stripe_webhook", json!({ "type": "invoice.created" }))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error(), "Invalid stripe event.");
}

#[test_context(TestHarness)]
#[tokio::test]
async fn unparseable_invoice_is_acknowledged_with_error(ctx: &TestHarness) {
    ctx.mocks.gateway.add_event(GatewayEvent {
        id: "evt_4".to_string(),
        event_type: "invoice.created".to_string(),
        object: json!({ "lines": { "data": [] } }),
    });

    let response = ctx
        .client()
        .post("/api/stripe_webhook", json!({ "id": "evt_4" }))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["error"].is_string());
}
