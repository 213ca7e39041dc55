//! Migration to create the service_settings singleton table
//!
//! Holds the operational knobs: daily service window, delivery tariff,
//! feasibility radius and the minimum order value. One row, ensured with
//! defaults at startup.

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ServiceSettings::Table)
                    .if_not_exists()
                    .col(pk_auto(ServiceSettings::Id))
                    .col(time(ServiceSettings::WorkStartTime).not_null())
                    .col(time(ServiceSettings::WorkEndTime).not_null())
                    .col(decimal(ServiceSettings::DeliveryBaseCost).not_null())
                    .col(decimal(ServiceSettings::DeliveryCostPerKm).not_null())
                    .col(double(ServiceSettings::MaxDeliveryRadiusKm).not_null())
                    .col(decimal(ServiceSettings::MinOrderValue).not_null())
                    .col(timestamp_with_time_zone(ServiceSettings::UpdatedAt).default(Expr::current_timestamp()))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ServiceSettings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ServiceSettings {
    Table,
    Id,
    WorkStartTime,
    WorkEndTime,
    DeliveryBaseCost,
    DeliveryCostPerKm,
    MaxDeliveryRadiusKm,
    MinOrderValue,
    UpdatedAt,
}
