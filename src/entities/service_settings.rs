//! SeaORM Entity for the service_settings singleton
//!
//! One row, ensured with defaults at startup. Snapshots of this row drive the
//! service window gate and the pricing engine.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "service_settings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub work_start_time: Time,
    pub work_end_time: Time,
    pub delivery_base_cost: Decimal,
    pub delivery_cost_per_km: Decimal,
    pub max_delivery_radius_km: f64,
    pub min_order_value: Decimal,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
