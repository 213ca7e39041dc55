//! SeaORM-backed [`OrderStore`].

use async_trait::async_trait;
use sea_orm::sea_query::{Alias, Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};

use crate::config::SettingsSeed;
use crate::entities::prelude::{
    Categories, Customers, OrderItems, OrderStatusHistory, Orders, Products, ServiceSettings,
};
use crate::entities::{categories, customers, order_items, order_status_history, orders, products, service_settings};
use crate::models::channel::Channel;
use crate::models::status::OrderStatus;
use crate::store::{
    now, successor_number, NewOrder, NewOrderLine, OrderStore, StoreError, TransitionChange,
};

#[derive(Clone)]
pub struct DbStore {
    db: DatabaseConnection,
}

impl DbStore {
    pub fn new(db: DatabaseConnection) -> DbStore {
        DbStore { db }
    }

    async fn max_order_number<C: ConnectionTrait>(conn: &C) -> Result<Option<i64>, StoreError> {
        let max = Orders::find()
            .select_only()
            .column_as(
                Expr::expr(Func::max(
                    Expr::col(orders::Column::OrderNumber).cast_as(Alias::new("BIGINT")),
                )),
                "max_number",
            )
            .into_tuple::<Option<i64>>()
            .one(conn)
            .await?;
        Ok(max.flatten())
    }
}

#[async_trait]
impl OrderStore for DbStore {
    async fn upsert_customer(
        &self,
        chat_id: i64,
        full_name: &str,
        phone_number: &str,
    ) -> Result<customers::Model, StoreError> {
        let existing = Customers::find()
            .filter(customers::Column::TelegramChatId.eq(chat_id))
            .one(&self.db)
            .await?;

        match existing {
            Some(customer) => {
                let mut active: customers::ActiveModel = customer.into();
                active.full_name = Set(full_name.to_string());
                active.phone_number = Set(phone_number.to_string());
                active.updated_at = Set(now());
                Ok(active.update(&self.db).await?)
            }
            None => {
                let stamp = now();
                let active = customers::ActiveModel {
                    telegram_chat_id: Set(chat_id),
                    full_name: Set(full_name.to_string()),
                    phone_number: Set(phone_number.to_string()),
                    created_at: Set(stamp),
                    updated_at: Set(stamp),
                    ..Default::default()
                };
                Ok(active.insert(&self.db).await?)
            }
        }
    }

    async fn find_customer(&self, id: i32) -> Result<Option<customers::Model>, StoreError> {
        Ok(Customers::find_by_id(id).one(&self.db).await?)
    }

    async fn find_customer_by_chat(
        &self,
        chat_id: i64,
    ) -> Result<Option<customers::Model>, StoreError> {
        Ok(Customers::find()
            .filter(customers::Column::TelegramChatId.eq(chat_id))
            .one(&self.db)
            .await?)
    }

    async fn list_active_categories(&self) -> Result<Vec<categories::Model>, StoreError> {
        Ok(Categories::find()
            .filter(categories::Column::IsActive.eq(true))
            .order_by_asc(categories::Column::Position)
            .order_by_asc(categories::Column::Name)
            .all(&self.db)
            .await?)
    }

    async fn list_available_products(&self) -> Result<Vec<products::Model>, StoreError> {
        Ok(Products::find()
            .filter(products::Column::IsAvailable.eq(true))
            .order_by_asc(products::Column::Name)
            .all(&self.db)
            .await?)
    }

    async fn find_available_product(
        &self,
        name: &str,
    ) -> Result<Option<products::Model>, StoreError> {
        Ok(Products::find()
            .filter(products::Column::Name.eq(name))
            .filter(products::Column::IsAvailable.eq(true))
            .one(&self.db)
            .await?)
    }

    async fn next_order_number(&self) -> Result<String, StoreError> {
        let max = Self::max_order_number(&self.db).await?;
        Ok(successor_number(max))
    }

    async fn create_order(
        &self,
        order: NewOrder,
        lines: Vec<NewOrderLine>,
    ) -> Result<orders::Model, StoreError> {
        let txn = self.db.begin().await?;

        let number = successor_number(Self::max_order_number(&txn).await?);
        let stamp = now();
        let inserted = orders::ActiveModel {
            order_number: Set(number),
            customer_id: Set(order.customer_id),
            status: Set(OrderStatus::New.as_str().to_string()),
            payment_method: Set(order.payment_method.as_str().to_string()),
            delivery_address: Set(order.delivery_address),
            latitude: Set(order.location.map(|p| p.latitude)),
            longitude: Set(order.location.map(|p| p.longitude)),
            delivery_distance_km: Set(order.delivery_distance_km),
            delivery_cost: Set(order.delivery_cost),
            items_total: Set(order.items_total),
            total_price: Set(order.total_price),
            created_at: Set(stamp),
            updated_at: Set(stamp),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        for line in lines {
            order_items::ActiveModel {
                order_id: Set(inserted.id),
                product_name: Set(line.product_name),
                unit_price: Set(line.unit_price),
                quantity: Set(line.quantity),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }

        order_status_history::ActiveModel {
            order_id: Set(inserted.id),
            old_status: Set(String::new()),
            new_status: Set(OrderStatus::New.as_str().to_string()),
            changed_by: Set(None),
            note: Set(Some("Telegram bot orqali yaratildi".to_string())),
            created_at: Set(stamp),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        tracing::debug!(
            order_id = inserted.id,
            order_number = %inserted.order_number,
            "order persisted"
        );
        Ok(inserted)
    }

    async fn find_order(&self, id: i32) -> Result<Option<orders::Model>, StoreError> {
        Ok(Orders::find_by_id(id).one(&self.db).await?)
    }

    async fn list_order_items(&self, order_id: i32) -> Result<Vec<order_items::Model>, StoreError> {
        Ok(OrderItems::find()
            .filter(order_items::Column::OrderId.eq(order_id))
            .order_by_asc(order_items::Column::Id)
            .all(&self.db)
            .await?)
    }

    async fn list_orders_for_chat(&self, chat_id: i64) -> Result<Vec<orders::Model>, StoreError> {
        let Some(customer) = self.find_customer_by_chat(chat_id).await? else {
            return Ok(Vec::new());
        };
        Ok(Orders::find()
            .filter(orders::Column::CustomerId.eq(customer.id))
            .order_by_desc(orders::Column::CreatedAt)
            .order_by_desc(orders::Column::Id)
            .all(&self.db)
            .await?)
    }

    async fn order_history(
        &self,
        order_id: i32,
    ) -> Result<Vec<order_status_history::Model>, StoreError> {
        Ok(OrderStatusHistory::find()
            .filter(order_status_history::Column::OrderId.eq(order_id))
            .order_by_asc(order_status_history::Column::CreatedAt)
            .order_by_asc(order_status_history::Column::Id)
            .all(&self.db)
            .await?)
    }

    async fn commit_transition(
        &self,
        order_id: i32,
        from: OrderStatus,
        change: TransitionChange,
    ) -> Result<orders::Model, StoreError> {
        let txn = self.db.begin().await?;

        let mut update = Orders::update_many()
            .col_expr(orders::Column::Status, Expr::value(change.to.as_str()))
            .col_expr(orders::Column::UpdatedAt, Expr::value(change.at));
        // Milestone columns are stamped on first entry; the transition matrix
        // makes re-entry impossible, so a plain set never overwrites
        update = match change.to {
            OrderStatus::Confirmed => {
                update.col_expr(orders::Column::ConfirmedAt, Expr::value(change.at))
            }
            OrderStatus::Ready => update.col_expr(orders::Column::ReadyAt, Expr::value(change.at)),
            OrderStatus::Delivered => {
                update.col_expr(orders::Column::DeliveredAt, Expr::value(change.at))
            }
            _ => update,
        };

        let result = update
            .filter(orders::Column::Id.eq(order_id))
            .filter(orders::Column::Status.eq(from.as_str()))
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            // Someone else moved the order first; report what it is now
            let current = Orders::find_by_id(order_id).one(&txn).await?;
            return Err(match current {
                None => StoreError::OrderNotFound(order_id),
                Some(order) => StoreError::StatusConflict {
                    order_id,
                    current: crate::store::order_status(&order)?,
                },
            });
        }

        order_status_history::ActiveModel {
            order_id: Set(order_id),
            old_status: Set(from.as_str().to_string()),
            new_status: Set(change.to.as_str().to_string()),
            changed_by: Set(change.changed_by),
            note: Set(change.note),
            created_at: Set(change.at),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        Orders::find_by_id(order_id)
            .one(&self.db)
            .await?
            .ok_or(StoreError::OrderNotFound(order_id))
    }

    async fn save_channel_handle(
        &self,
        order_id: i32,
        channel: Channel,
        message_id: i64,
    ) -> Result<(), StoreError> {
        let column = match channel {
            Channel::Customer => orders::Column::CustomerMessageId,
            Channel::Kitchen => orders::Column::KitchenMessageId,
            Channel::Courier => orders::Column::CourierMessageId,
        };
        let result = Orders::update_many()
            .col_expr(column, Expr::value(message_id))
            .filter(orders::Column::Id.eq(order_id))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(StoreError::OrderNotFound(order_id));
        }
        Ok(())
    }

    async fn load_settings(&self) -> Result<service_settings::Model, StoreError> {
        ServiceSettings::find()
            .one(&self.db)
            .await?
            .ok_or(StoreError::SettingsMissing)
    }

    async fn ensure_settings(
        &self,
        seed: &SettingsSeed,
    ) -> Result<service_settings::Model, StoreError> {
        if let Some(existing) = ServiceSettings::find().one(&self.db).await? {
            return Ok(existing);
        }
        tracing::info!("seeding service settings with defaults");
        let active = service_settings::ActiveModel {
            work_start_time: Set(seed.work_start_time),
            work_end_time: Set(seed.work_end_time),
            delivery_base_cost: Set(seed.delivery_base_cost),
            delivery_cost_per_km: Set(seed.delivery_cost_per_km),
            max_delivery_radius_km: Set(seed.max_delivery_radius_km),
            min_order_value: Set(seed.min_order_value),
            updated_at: Set(now()),
            ..Default::default()
        };
        Ok(active.insert(&self.db).await?)
    }
}
