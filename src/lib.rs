// src/lib.rs

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use services::checkout::CheckoutService;
use services::flow::BotFlow;
use services::lifecycle::OrderLifecycle;
use store::OrderStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn OrderStore>,
    pub checkout: CheckoutService,
    pub lifecycle: Arc<OrderLifecycle>,
    pub flow: Arc<BotFlow>,
}

pub mod entities {
    pub mod prelude;
    pub mod categories;
    pub mod customers;
    pub mod order_items;
    pub mod order_status_history;
    pub mod orders;
    pub mod products;
    pub mod service_settings;
}

pub mod services {
    pub mod cart;
    pub mod catalog;
    pub mod checkout;
    pub mod flow;
    pub mod lifecycle;
    pub mod notifier;
    pub mod pricing;
    pub mod render;
    pub mod service_window;
    pub mod telegram;
}

pub mod config;
pub mod handlers;
pub mod models;
pub mod store;

/// All application routes over the shared state
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/events", post(handlers::events::handle_event))
        .route("/api/orders", post(handlers::orders::create_order))
        .route(
            "/api/orders/{id}/status",
            post(handlers::orders::update_order_status),
        )
        .route("/api/orders/{id}", get(handlers::orders::get_order))
        .route(
            "/api/customers/{chat_id}/orders",
            get(handlers::orders::list_customer_orders),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
