//! Migration to create the orders table
//!
//! Status and payment method are stored as short lowercase strings and decoded
//! through the domain enums. Message id columns hold the per-channel chat
//! message handles used for edit-in-place notification sync.

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(pk_auto(Orders::Id))
                    .col(string(Orders::OrderNumber).not_null())
                    .col(integer(Orders::CustomerId).not_null())
                    .col(string(Orders::Status).default("new"))
                    .col(string(Orders::PaymentMethod).default("cash"))
                    .col(string_null(Orders::DeliveryAddress))
                    .col(double_null(Orders::Latitude))
                    .col(double_null(Orders::Longitude))
                    .col(double_null(Orders::DeliveryDistanceKm))
                    .col(decimal(Orders::DeliveryCost).default(0))
                    .col(decimal(Orders::ItemsTotal).not_null())
                    .col(decimal(Orders::TotalPrice).not_null())
                    .col(big_integer_null(Orders::CustomerMessageId))
                    .col(big_integer_null(Orders::KitchenMessageId))
                    .col(big_integer_null(Orders::CourierMessageId))
                    .col(timestamp_with_time_zone(Orders::CreatedAt).default(Expr::current_timestamp()))
                    .col(timestamp_with_time_zone(Orders::UpdatedAt).default(Expr::current_timestamp()))
                    .col(timestamp_with_time_zone_null(Orders::ConfirmedAt))
                    .col(timestamp_with_time_zone_null(Orders::ReadyAt))
                    .col(timestamp_with_time_zone_null(Orders::DeliveredAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_orders_customer_id")
                    .from(Orders::Table, Orders::CustomerId)
                    .to(Customers::Table, Customers::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_orders_order_number")
                    .table(Orders::Table)
                    .col(Orders::OrderNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index for the operator panels (pending orders by status)
        manager
            .create_index(
                Index::create()
                    .name("idx_orders_status")
                    .table(Orders::Table)
                    .col(Orders::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_orders_customer_id")
                    .table(Orders::Table)
                    .col(Orders::CustomerId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Orders {
    Table,
    Id,
    OrderNumber,
    CustomerId,
    Status,
    PaymentMethod,
    DeliveryAddress,
    Latitude,
    Longitude,
    DeliveryDistanceKm,
    DeliveryCost,
    ItemsTotal,
    TotalPrice,
    CustomerMessageId,
    KitchenMessageId,
    CourierMessageId,
    CreatedAt,
    UpdatedAt,
    ConfirmedAt,
    ReadyAt,
    DeliveredAt,
}

#[derive(DeriveIden)]
enum Customers {
    Table,
    Id,
}
