//! Migration to create the order_status_history audit table
//!
//! Append-only. The creation row carries an empty old_status.

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OrderStatusHistory::Table)
                    .if_not_exists()
                    .col(pk_auto(OrderStatusHistory::Id))
                    .col(integer(OrderStatusHistory::OrderId).not_null())
                    .col(string(OrderStatusHistory::OldStatus).not_null())
                    .col(string(OrderStatusHistory::NewStatus).not_null())
                    .col(string_null(OrderStatusHistory::ChangedBy))
                    .col(string_null(OrderStatusHistory::Note))
                    .col(timestamp_with_time_zone(OrderStatusHistory::CreatedAt).default(Expr::current_timestamp()))
                    .to_owned(),
            )
            .await?;

        manager
            .create_foreign_key(
                ForeignKey::create()
                    .name("fk_order_status_history_order_id")
                    .from(OrderStatusHistory::Table, OrderStatusHistory::OrderId)
                    .to(Orders::Table, Orders::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_order_status_history_order_id")
                    .table(OrderStatusHistory::Table)
                    .col(OrderStatusHistory::OrderId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OrderStatusHistory::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum OrderStatusHistory {
    Table,
    Id,
    OrderId,
    OldStatus,
    NewStatus,
    ChangedBy,
    Note,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Orders {
    Table,
    Id,
}
