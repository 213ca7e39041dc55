//! In-memory [`OrderStore`] with the same observable semantics as `DbStore`,
//! including the compare-and-set transition commit. Used by the test suites
//! and by local demos that run without Postgres.

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::config::SettingsSeed;
use crate::entities::{categories, customers, order_items, order_status_history, orders, products, service_settings};
use crate::models::channel::Channel;
use crate::models::status::OrderStatus;
use crate::store::{
    now, successor_number, NewOrder, NewOrderLine, OrderStore, StoreError, TransitionChange,
};

#[derive(Default)]
struct Inner {
    customers: Vec<customers::Model>,
    categories: Vec<categories::Model>,
    products: Vec<products::Model>,
    orders: Vec<orders::Model>,
    order_items: Vec<order_items::Model>,
    history: Vec<order_status_history::Model>,
    settings: Option<service_settings::Model>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn add_category(&self, name: &str, position: i32) -> categories::Model {
        let mut inner = self.inner.lock();
        let category = categories::Model {
            id: inner.categories.len() as i32 + 1,
            name: name.to_string(),
            position,
            is_active: true,
            created_at: now(),
        };
        inner.categories.push(category.clone());
        category
    }

    pub fn add_product(&self, category_id: i32, name: &str, price: Decimal) -> products::Model {
        let mut inner = self.inner.lock();
        let stamp = now();
        let product = products::Model {
            id: inner.products.len() as i32 + 1,
            category_id,
            name: name.to_string(),
            price,
            is_available: true,
            created_at: stamp,
            updated_at: stamp,
        };
        inner.products.push(product.clone());
        product
    }

    pub fn set_product_availability(&self, name: &str, available: bool) {
        let mut inner = self.inner.lock();
        if let Some(product) = inner.products.iter_mut().find(|p| p.name == name) {
            product.is_available = available;
        }
    }

    fn max_number(inner: &Inner) -> Option<i64> {
        inner
            .orders
            .iter()
            .filter_map(|o| o.order_number.parse::<i64>().ok())
            .max()
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn upsert_customer(
        &self,
        chat_id: i64,
        full_name: &str,
        phone_number: &str,
    ) -> Result<customers::Model, StoreError> {
        let mut inner = self.inner.lock();
        if let Some(customer) = inner
            .customers
            .iter_mut()
            .find(|c| c.telegram_chat_id == chat_id)
        {
            customer.full_name = full_name.to_string();
            customer.phone_number = phone_number.to_string();
            customer.updated_at = now();
            return Ok(customer.clone());
        }
        let stamp = now();
        let customer = customers::Model {
            id: inner.customers.len() as i32 + 1,
            telegram_chat_id: chat_id,
            full_name: full_name.to_string(),
            phone_number: phone_number.to_string(),
            created_at: stamp,
            updated_at: stamp,
        };
        inner.customers.push(customer.clone());
        Ok(customer)
    }

    async fn find_customer(&self, id: i32) -> Result<Option<customers::Model>, StoreError> {
        Ok(self.inner.lock().customers.iter().find(|c| c.id == id).cloned())
    }

    async fn find_customer_by_chat(
        &self,
        chat_id: i64,
    ) -> Result<Option<customers::Model>, StoreError> {
        Ok(self
            .inner
            .lock()
            .customers
            .iter()
            .find(|c| c.telegram_chat_id == chat_id)
            .cloned())
    }

    async fn list_active_categories(&self) -> Result<Vec<categories::Model>, StoreError> {
        let mut categories: Vec<_> = self
            .inner
            .lock()
            .categories
            .iter()
            .filter(|c| c.is_active)
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.name.cmp(&b.name)));
        Ok(categories)
    }

    async fn list_available_products(&self) -> Result<Vec<products::Model>, StoreError> {
        let mut products: Vec<_> = self
            .inner
            .lock()
            .products
            .iter()
            .filter(|p| p.is_available)
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    async fn find_available_product(
        &self,
        name: &str,
    ) -> Result<Option<products::Model>, StoreError> {
        Ok(self
            .inner
            .lock()
            .products
            .iter()
            .find(|p| p.name == name && p.is_available)
            .cloned())
    }

    async fn next_order_number(&self) -> Result<String, StoreError> {
        let inner = self.inner.lock();
        Ok(successor_number(Self::max_number(&inner)))
    }

    async fn create_order(
        &self,
        order: NewOrder,
        lines: Vec<NewOrderLine>,
    ) -> Result<orders::Model, StoreError> {
        let mut inner = self.inner.lock();
        let stamp = now();
        let created = orders::Model {
            id: inner.orders.len() as i32 + 1,
            order_number: successor_number(Self::max_number(&inner)),
            customer_id: order.customer_id,
            status: OrderStatus::New.as_str().to_string(),
            payment_method: order.payment_method.as_str().to_string(),
            delivery_address: order.delivery_address,
            latitude: order.location.map(|p| p.latitude),
            longitude: order.location.map(|p| p.longitude),
            delivery_distance_km: order.delivery_distance_km,
            delivery_cost: order.delivery_cost,
            items_total: order.items_total,
            total_price: order.total_price,
            customer_message_id: None,
            kitchen_message_id: None,
            courier_message_id: None,
            created_at: stamp,
            updated_at: stamp,
            confirmed_at: None,
            ready_at: None,
            delivered_at: None,
        };
        inner.orders.push(created.clone());

        for line in lines {
            let item = order_items::Model {
                id: inner.order_items.len() as i32 + 1,
                order_id: created.id,
                product_name: line.product_name,
                unit_price: line.unit_price,
                quantity: line.quantity,
            };
            inner.order_items.push(item);
        }

        let entry = order_status_history::Model {
            id: inner.history.len() as i32 + 1,
            order_id: created.id,
            old_status: String::new(),
            new_status: OrderStatus::New.as_str().to_string(),
            changed_by: None,
            note: Some("Telegram bot orqali yaratildi".to_string()),
            created_at: stamp,
        };
        inner.history.push(entry);

        Ok(created)
    }

    async fn find_order(&self, id: i32) -> Result<Option<orders::Model>, StoreError> {
        Ok(self.inner.lock().orders.iter().find(|o| o.id == id).cloned())
    }

    async fn list_order_items(&self, order_id: i32) -> Result<Vec<order_items::Model>, StoreError> {
        Ok(self
            .inner
            .lock()
            .order_items
            .iter()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn list_orders_for_chat(&self, chat_id: i64) -> Result<Vec<orders::Model>, StoreError> {
        let inner = self.inner.lock();
        let Some(customer) = inner
            .customers
            .iter()
            .find(|c| c.telegram_chat_id == chat_id)
        else {
            return Ok(Vec::new());
        };
        let mut orders: Vec<_> = inner
            .orders
            .iter()
            .filter(|o| o.customer_id == customer.id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(orders)
    }

    async fn order_history(
        &self,
        order_id: i32,
    ) -> Result<Vec<order_status_history::Model>, StoreError> {
        Ok(self
            .inner
            .lock()
            .history
            .iter()
            .filter(|h| h.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn commit_transition(
        &self,
        order_id: i32,
        from: OrderStatus,
        change: TransitionChange,
    ) -> Result<orders::Model, StoreError> {
        let mut inner = self.inner.lock();

        let history_id = inner.history.len() as i32 + 1;
        let Some(order) = inner.orders.iter_mut().find(|o| o.id == order_id) else {
            return Err(StoreError::OrderNotFound(order_id));
        };
        if order.status != from.as_str() {
            let current =
                OrderStatus::parse(&order.status).ok_or_else(|| StoreError::CorruptColumn {
                    column: "orders.status",
                    value: order.status.clone(),
                })?;
            return Err(StoreError::StatusConflict { order_id, current });
        }

        order.status = change.to.as_str().to_string();
        order.updated_at = change.at;
        match change.to {
            OrderStatus::Confirmed => order.confirmed_at = Some(change.at),
            OrderStatus::Ready => order.ready_at = Some(change.at),
            OrderStatus::Delivered => order.delivered_at = Some(change.at),
            _ => {}
        }
        let updated = order.clone();

        inner.history.push(order_status_history::Model {
            id: history_id,
            order_id,
            old_status: from.as_str().to_string(),
            new_status: change.to.as_str().to_string(),
            changed_by: change.changed_by,
            note: change.note,
            created_at: change.at,
        });

        Ok(updated)
    }

    async fn save_channel_handle(
        &self,
        order_id: i32,
        channel: Channel,
        message_id: i64,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let Some(order) = inner.orders.iter_mut().find(|o| o.id == order_id) else {
            return Err(StoreError::OrderNotFound(order_id));
        };
        match channel {
            Channel::Customer => order.customer_message_id = Some(message_id),
            Channel::Kitchen => order.kitchen_message_id = Some(message_id),
            Channel::Courier => order.courier_message_id = Some(message_id),
        }
        Ok(())
    }

    async fn load_settings(&self) -> Result<service_settings::Model, StoreError> {
        self.inner
            .lock()
            .settings
            .clone()
            .ok_or(StoreError::SettingsMissing)
    }

    async fn ensure_settings(
        &self,
        seed: &SettingsSeed,
    ) -> Result<service_settings::Model, StoreError> {
        let mut inner = self.inner.lock();
        if let Some(settings) = &inner.settings {
            return Ok(settings.clone());
        }
        let settings = service_settings::Model {
            id: 1,
            work_start_time: seed.work_start_time,
            work_end_time: seed.work_end_time,
            delivery_base_cost: seed.delivery_base_cost,
            delivery_cost_per_km: seed.delivery_cost_per_km,
            max_delivery_radius_km: seed.max_delivery_radius_km,
            min_order_value: seed.min_order_value,
            updated_at: now(),
        };
        inner.settings = Some(settings.clone());
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::payment::PaymentMethod;
    use rust_decimal_macros::dec;

    fn draft(customer_id: i32) -> NewOrder {
        NewOrder {
            customer_id,
            payment_method: PaymentMethod::Cash,
            delivery_address: None,
            location: None,
            delivery_distance_km: None,
            delivery_cost: dec!(0),
            items_total: dec!(20000),
            total_price: dec!(20000),
        }
    }

    #[tokio::test]
    async fn order_numbers_start_at_one_and_follow_the_maximum() {
        let store = MemoryStore::new();
        let customer = store.upsert_customer(1, "Ali", "+998901112233").await.unwrap();

        assert_eq!(store.next_order_number().await.unwrap(), "1");
        let first = store.create_order(draft(customer.id), vec![]).await.unwrap();
        assert_eq!(first.order_number, "1");
        let second = store.create_order(draft(customer.id), vec![]).await.unwrap();
        assert_eq!(second.order_number, "2");
    }

    #[tokio::test]
    async fn transition_commit_rejects_a_stale_expected_status() {
        let store = MemoryStore::new();
        let customer = store.upsert_customer(1, "Ali", "+998901112233").await.unwrap();
        let order = store.create_order(draft(customer.id), vec![]).await.unwrap();

        let change = TransitionChange {
            to: OrderStatus::Confirmed,
            changed_by: Some("chef".to_string()),
            note: None,
            at: now(),
        };
        store
            .commit_transition(order.id, OrderStatus::New, change.clone())
            .await
            .unwrap();

        let err = store
            .commit_transition(order.id, OrderStatus::New, change)
            .await
            .unwrap_err();
        match err {
            StoreError::StatusConflict { current, .. } => {
                assert_eq!(current, OrderStatus::Confirmed)
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn milestones_are_stamped_with_the_transition_time() {
        let store = MemoryStore::new();
        let customer = store.upsert_customer(1, "Ali", "+998901112233").await.unwrap();
        let order = store.create_order(draft(customer.id), vec![]).await.unwrap();

        let at = now();
        let updated = store
            .commit_transition(
                order.id,
                OrderStatus::New,
                TransitionChange {
                    to: OrderStatus::Confirmed,
                    changed_by: None,
                    note: None,
                    at,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.confirmed_at, Some(at));
        assert_eq!(updated.ready_at, None);
        assert_eq!(updated.delivered_at, None);
    }

    #[tokio::test]
    async fn upsert_refreshes_identity_without_duplicating_the_customer() {
        let store = MemoryStore::new();
        let first = store.upsert_customer(9, "Ali", "+998901112233").await.unwrap();
        let second = store
            .upsert_customer(9, "Ali Valiyev", "+998909998877")
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.full_name, "Ali Valiyev");
        assert_eq!(second.phone_number, "+998909998877");
    }
}
