//! Migration to create the customers table
//!
//! One row per chat identity; name/phone are refreshed on every order.

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Customers::Table)
                    .if_not_exists()
                    .col(pk_auto(Customers::Id))
                    .col(big_integer(Customers::TelegramChatId).not_null())
                    .col(string(Customers::FullName).not_null())
                    .col(string(Customers::PhoneNumber).not_null())
                    .col(timestamp_with_time_zone(Customers::CreatedAt).default(Expr::current_timestamp()))
                    .col(timestamp_with_time_zone(Customers::UpdatedAt).default(Expr::current_timestamp()))
                    .to_owned(),
            )
            .await?;

        // Chat id is the lookup key for every conversational event
        manager
            .create_index(
                Index::create()
                    .name("idx_customers_telegram_chat_id")
                    .table(Customers::Table)
                    .col(Customers::TelegramChatId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Customers::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Customers {
    Table,
    Id,
    TelegramChatId,
    FullName,
    PhoneNumber,
    CreatedAt,
    UpdatedAt,
}
