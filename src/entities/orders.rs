//! SeaORM Entity for orders
//!
//! Status and payment method are stored as short lowercase strings and decoded
//! through `OrderStatus`/`PaymentMethod`. The three message id columns hold
//! the per-channel chat message handles; once set, later status changes edit
//! those messages in place instead of sending new ones.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Human-facing decimal order number, "1" first, successor-of-max after
    pub order_number: String,
    pub customer_id: i32,
    pub status: String,
    pub payment_method: String,
    /// Free-text address; None renders as "Faqat lokatsiya"
    pub delivery_address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub delivery_distance_km: Option<f64>,
    pub delivery_cost: Decimal,
    /// Sum of the item lines, before delivery
    pub items_total: Decimal,
    pub total_price: Decimal,
    pub customer_message_id: Option<i64>,
    pub kitchen_message_id: Option<i64>,
    pub courier_message_id: Option<i64>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    /// Stamped on first entry into the matching status, never overwritten
    pub confirmed_at: Option<DateTimeWithTimeZone>,
    pub ready_at: Option<DateTimeWithTimeZone>,
    pub delivered_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
