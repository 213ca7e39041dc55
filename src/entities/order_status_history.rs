//! SeaORM Entity for the append-only order status audit trail
//!
//! The creation row carries an empty `old_status`. Rows are only ever
//! inserted, never updated or deleted.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "order_status_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub order_id: i32,
    pub old_status: String,
    pub new_status: String,
    /// Free-form actor label ("chef", "courier", a panel user name)
    pub changed_by: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
