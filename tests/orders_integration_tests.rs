mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use dilkash_backend::services::telegram::SentItem;
use dilkash_backend::store::OrderStore;

use crate::common::{closed_right_now, spawn_app, spawn_app_with, COURIER_CHAT, KITCHEN_CHAT};

async fn post_json(router: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// Two portions of Lag'mon and a tea, delivered two kilometres north
fn order_payload() -> Value {
    json!({
        "chatId": 777,
        "fullName": "Aziz Karimov",
        "phoneNumber": "+998901234567",
        "paymentMethod": "cash",
        "items": [
            { "product": "Lag'mon", "quantity": 2 },
            { "product": "Choy", "quantity": 1 }
        ],
        "location": { "latitude": 40.683236, "longitude": 72.563908 },
        "deliveryAddress": "Navoiy ko'chasi 12"
    })
}

/// AC-1: Liveness endpoint responds
#[tokio::test]
async fn test_health() {
    let app = spawn_app().await;

    let (status, json) = get_json(app.router.clone(), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

/// AC-2: Order creation prices the cart server-side
#[tokio::test]
async fn test_create_order_prices_server_side() {
    let app = spawn_app().await;

    let (status, json) = post_json(app.router.clone(), "/api/orders", order_payload()).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["orderNumber"], "1");
    assert_eq!(json["status"], "new");
    assert_eq!(json["statusLabel"], "Yangi");
    assert_eq!(json["customerName"], "Aziz Karimov");
    assert_eq!(json["customerPhone"], "+998901234567");
    assert_eq!(json["itemsTotal"], "35000");
    assert_eq!(json["deliveryCost"], "15000");
    assert_eq!(json["totalPrice"], "50000");
    assert_eq!(json["deliveryAddress"], "Navoiy ko'chasi 12");
    assert!(json["deliveryDistanceKm"].as_f64().unwrap() > 2.0);
}

/// AC-2: Admission refusals surface as 422 with the denial reason
#[tokio::test]
async fn test_create_order_below_minimum_is_refused() {
    let app = spawn_app().await;

    let mut payload = order_payload();
    payload["items"] = json!([{ "product": "Choy", "quantity": 1 }]);
    let (status, json) = post_json(app.router.clone(), "/api/orders", payload).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["error"]
        .as_str()
        .unwrap()
        .contains("below_minimum"));
}

/// AC-2: A closed service window refuses panel orders as well
#[tokio::test]
async fn test_create_order_outside_service_window() {
    let app = spawn_app_with(closed_right_now()).await;

    let (status, json) = post_json(app.router.clone(), "/api/orders", order_payload()).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["error"]
        .as_str()
        .unwrap()
        .contains("outside_service_hours"));
}

/// AC-3: Transitions walk the forward chain and stamp milestones
#[tokio::test]
async fn test_status_transition_updates_the_order() {
    let app = spawn_app().await;
    post_json(app.router.clone(), "/api/orders", order_payload()).await;

    let (status, json) = post_json(
        app.router.clone(),
        "/api/orders/1/status",
        json!({ "status": "confirmed", "actor": "admin" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "confirmed");
    assert_eq!(json["statusLabel"], "Tasdiqlangan");
    assert!(json["confirmedAt"].is_string());
}

/// AC-3: Skipping a stage is rejected with 409 and changes nothing
#[tokio::test]
async fn test_invalid_transition_is_rejected() {
    let app = spawn_app().await;
    post_json(app.router.clone(), "/api/orders", order_payload()).await;

    let (status, json) = post_json(
        app.router.clone(),
        "/api/orders/1/status",
        json!({ "status": "delivered" }),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("not allowed"));

    let (_, details) = get_json(app.router.clone(), "/api/orders/1").await;
    assert_eq!(details["order"]["status"], "new");
    assert_eq!(details["history"].as_array().unwrap().len(), 1);
}

/// AC-3: Unknown orders get 404 on both read and transition
#[tokio::test]
async fn test_unknown_order_is_not_found() {
    let app = spawn_app().await;

    let (status, _) = get_json(app.router.clone(), "/api/orders/42").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = post_json(
        app.router.clone(),
        "/api/orders/42/status",
        json!({ "status": "confirmed" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

/// AC-4: Order details carry items and the full audit history
#[tokio::test]
async fn test_order_details_with_history() {
    let app = spawn_app().await;
    post_json(app.router.clone(), "/api/orders", order_payload()).await;
    post_json(
        app.router.clone(),
        "/api/orders/1/status",
        json!({ "status": "confirmed", "actor": "admin", "note": "qo'ng'iroq qilindi" }),
    )
    .await;

    let (status, json) = get_json(app.router.clone(), "/api/orders/1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["order"]["orderNumber"], "1");

    let items = json["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["productName"], "Lag'mon");
    assert_eq!(items[0]["lineTotal"], "30000");

    let history = json["history"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert!(history[0].get("oldStatus").is_none());
    assert_eq!(history[0]["newStatus"], "new");
    assert_eq!(history[1]["oldStatus"], "new");
    assert_eq!(history[1]["newStatus"], "confirmed");
    assert_eq!(history[1]["changedBy"], "admin");
    assert_eq!(history[1]["note"], "qo'ng'iroq qilindi");
}

/// AC-5: A customer's orders come back newest first; unknown chats get []
#[tokio::test]
async fn test_customer_orders_listing() {
    let app = spawn_app().await;
    post_json(app.router.clone(), "/api/orders", order_payload()).await;
    post_json(app.router.clone(), "/api/orders", order_payload()).await;

    let (status, json) = get_json(app.router.clone(), "/api/customers/777/orders").await;

    assert_eq!(status, StatusCode::OK);
    let orders = json.as_array().unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0]["orderNumber"], "2");
    assert_eq!(orders[1]["orderNumber"], "1");

    let (status, json) = get_json(app.router.clone(), "/api/customers/999/orders").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 0);
}

/// AC-6: Operator channels get one fresh message and edits afterwards; the
/// courier channel joins at ready with a location pin
#[tokio::test]
async fn test_notification_send_then_edit_discipline() {
    let app = spawn_app().await;
    post_json(app.router.clone(), "/api/orders", order_payload()).await;

    let kitchen = app.transport.sent_to(KITCHEN_CHAT);
    assert_eq!(kitchen.len(), 2, "fresh message plus the location pin");
    assert!(matches!(kitchen[0], SentItem::Message { .. }));
    assert!(matches!(kitchen[1], SentItem::Location { .. }));
    assert!(app.transport.sent_to(COURIER_CHAT).is_empty());

    post_json(
        app.router.clone(),
        "/api/orders/1/status",
        json!({ "status": "confirmed" }),
    )
    .await;
    post_json(
        app.router.clone(),
        "/api/orders/1/status",
        json!({ "status": "ready" }),
    )
    .await;

    let kitchen = app.transport.sent_to(KITCHEN_CHAT);
    let fresh = kitchen
        .iter()
        .filter(|item| matches!(item, SentItem::Message { .. }))
        .count();
    assert_eq!(fresh, 1, "later syncs must edit, not resend");

    let courier = app.transport.sent_to(COURIER_CHAT);
    assert!(matches!(courier[0], SentItem::Message { .. }));
    assert!(courier
        .iter()
        .any(|item| matches!(item, SentItem::Location { .. })));

    let order = app.store.find_order(1).await.unwrap().unwrap();
    assert!(order.kitchen_message_id.is_some());
    assert!(order.courier_message_id.is_some());
    assert!(order.customer_message_id.is_some());
}

/// AC-7: Cancellation is reachable from any active stage via the panel
#[tokio::test]
async fn test_cancel_from_en_route() {
    let app = spawn_app().await;
    post_json(app.router.clone(), "/api/orders", order_payload()).await;
    for step in ["confirmed", "ready", "en_route"] {
        let (status, _) = post_json(
            app.router.clone(),
            "/api/orders/1/status",
            json!({ "status": step }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, json) = post_json(
        app.router.clone(),
        "/api/orders/1/status",
        json!({ "status": "cancelled", "actor": "admin" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "cancelled");

    // Terminal means terminal
    let (status, _) = post_json(
        app.router.clone(),
        "/api/orders/1/status",
        json!({ "status": "delivered" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}
