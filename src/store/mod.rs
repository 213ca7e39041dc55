//! Persistence boundary.
//!
//! Everything the rest of the crate needs from storage goes through
//! [`OrderStore`]; `DbStore` backs it with SeaORM in production and
//! `MemoryStore` backs it in tests. The transition commit is the one
//! compare-and-set point: it flips the status, stamps the milestone column
//! and appends the audit row in a single transaction, refusing to apply on
//! top of a status it did not expect.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::prelude::DateTimeWithTimeZone;
use thiserror::Error;

use crate::config::SettingsSeed;
use crate::entities::{categories, customers, order_items, order_status_history, orders, products, service_settings};
use crate::models::channel::Channel;
use crate::models::order::GeoPoint;
use crate::models::payment::PaymentMethod;
use crate::models::status::OrderStatus;

pub mod db;
pub mod memory;

pub use db::DbStore;
pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),
    #[error("order {0} not found")]
    OrderNotFound(i32),
    #[error("customer {0} not found")]
    CustomerNotFound(i32),
    #[error("order {order_id} status changed concurrently, now {}", .current.as_str())]
    StatusConflict { order_id: i32, current: OrderStatus },
    #[error("stored {column} value is not recognized: {value}")]
    CorruptColumn { column: &'static str, value: String },
    #[error("service settings row is missing")]
    SettingsMissing,
}

/// Input for the atomic order insert
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_id: i32,
    pub payment_method: PaymentMethod,
    pub delivery_address: Option<String>,
    pub location: Option<GeoPoint>,
    pub delivery_distance_km: Option<f64>,
    pub delivery_cost: Decimal,
    pub items_total: Decimal,
    pub total_price: Decimal,
}

#[derive(Debug, Clone)]
pub struct NewOrderLine {
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

/// Input for the atomic transition commit
#[derive(Debug, Clone)]
pub struct TransitionChange {
    pub to: OrderStatus,
    pub changed_by: Option<String>,
    pub note: Option<String>,
    pub at: DateTimeWithTimeZone,
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn upsert_customer(
        &self,
        chat_id: i64,
        full_name: &str,
        phone_number: &str,
    ) -> Result<customers::Model, StoreError>;
    async fn find_customer(&self, id: i32) -> Result<Option<customers::Model>, StoreError>;
    async fn find_customer_by_chat(&self, chat_id: i64)
        -> Result<Option<customers::Model>, StoreError>;

    async fn list_active_categories(&self) -> Result<Vec<categories::Model>, StoreError>;
    async fn list_available_products(&self) -> Result<Vec<products::Model>, StoreError>;
    async fn find_available_product(&self, name: &str)
        -> Result<Option<products::Model>, StoreError>;

    /// Successor of the numeric maximum across all orders; "1" when empty
    async fn next_order_number(&self) -> Result<String, StoreError>;
    /// Number allocation, order row, item rows and the initial history row in
    /// one transaction
    async fn create_order(
        &self,
        order: NewOrder,
        lines: Vec<NewOrderLine>,
    ) -> Result<orders::Model, StoreError>;
    async fn find_order(&self, id: i32) -> Result<Option<orders::Model>, StoreError>;
    async fn list_order_items(&self, order_id: i32) -> Result<Vec<order_items::Model>, StoreError>;
    /// The customer's orders, newest first
    async fn list_orders_for_chat(&self, chat_id: i64) -> Result<Vec<orders::Model>, StoreError>;
    /// Audit rows for one order, oldest first
    async fn order_history(
        &self,
        order_id: i32,
    ) -> Result<Vec<order_status_history::Model>, StoreError>;
    /// Compare-and-set transition commit; fails with `StatusConflict` when the
    /// stored status no longer equals `from`
    async fn commit_transition(
        &self,
        order_id: i32,
        from: OrderStatus,
        change: TransitionChange,
    ) -> Result<orders::Model, StoreError>;
    async fn save_channel_handle(
        &self,
        order_id: i32,
        channel: Channel,
        message_id: i64,
    ) -> Result<(), StoreError>;

    async fn load_settings(&self) -> Result<service_settings::Model, StoreError>;
    async fn ensure_settings(
        &self,
        seed: &SettingsSeed,
    ) -> Result<service_settings::Model, StoreError>;
}

pub(crate) fn now() -> DateTimeWithTimeZone {
    Utc::now().fixed_offset()
}

/// Decode the stored status string, surfacing corruption instead of guessing
pub fn order_status(order: &orders::Model) -> Result<OrderStatus, StoreError> {
    OrderStatus::parse(&order.status).ok_or_else(|| StoreError::CorruptColumn {
        column: "orders.status",
        value: order.status.clone(),
    })
}

pub fn order_payment(order: &orders::Model) -> Result<PaymentMethod, StoreError> {
    PaymentMethod::parse(&order.payment_method).ok_or_else(|| StoreError::CorruptColumn {
        column: "orders.payment_method",
        value: order.payment_method.clone(),
    })
}

/// Next order number given the numeric maximum so far
pub(crate) fn successor_number(max: Option<i64>) -> String {
    (max.unwrap_or(0) + 1).to_string()
}
