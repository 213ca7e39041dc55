//! Per-channel notification fan-out.
//!
//! Runs strictly after the database commit. Each channel follows the same
//! rule: an order that already has a message handle for the channel gets an
//! in-place edit; one that does not gets a fresh message, but only while the
//! channel still has actionable buttons to show. Handles are persisted the
//! moment a send succeeds so a concurrent transition edits instead of
//! re-sending. Channel failures are logged and never reach the caller; the
//! committed transition stands regardless.

use std::sync::Arc;

use crate::entities::{customers, order_items, orders};
use crate::models::channel::Channel;
use crate::models::keyboard::ReplyMarkup;
use crate::models::status::OrderStatus;
use crate::services::render;
use crate::services::telegram::Transport;
use crate::store::{order_status, OrderStore};

#[derive(Clone)]
pub struct OrderNotifier {
    store: Arc<dyn OrderStore>,
    transport: Arc<dyn Transport>,
    kitchen_chat_id: i64,
    courier_chat_id: i64,
}

impl OrderNotifier {
    pub fn new(
        store: Arc<dyn OrderStore>,
        transport: Arc<dyn Transport>,
        kitchen_chat_id: i64,
        courier_chat_id: i64,
    ) -> OrderNotifier {
        OrderNotifier {
            store,
            transport,
            kitchen_chat_id,
            courier_chat_id,
        }
    }

    /// Brings all three channels up to date with the committed order state.
    /// Channels are synced concurrently and independently.
    pub async fn sync(&self, order: &orders::Model) {
        let status = match order_status(order) {
            Ok(status) => status,
            Err(err) => {
                tracing::error!(order_id = order.id, "cannot notify: {err}");
                return;
            }
        };
        let customer = match self.store.find_customer(order.customer_id).await {
            Ok(Some(customer)) => customer,
            Ok(None) => {
                tracing::error!(
                    order_id = order.id,
                    "cannot notify: customer {} is missing",
                    order.customer_id
                );
                return;
            }
            Err(err) => {
                tracing::error!(order_id = order.id, "cannot notify: {err}");
                return;
            }
        };
        let items = match self.store.list_order_items(order.id).await {
            Ok(items) => items,
            Err(err) => {
                tracing::error!(order_id = order.id, "cannot notify: {err}");
                return;
            }
        };

        tokio::join!(
            self.sync_customer(order, &items, &customer, status),
            self.sync_kitchen(order, &items, &customer, status),
            self.sync_courier(order, &items, &customer, status),
        );
    }

    async fn sync_customer(
        &self,
        order: &orders::Model,
        items: &[order_items::Model],
        customer: &customers::Model,
        status: OrderStatus,
    ) {
        let body = render::customer_body(order, items, customer, status);
        let markup = render::customer_keyboard();
        match order.customer_message_id {
            Some(message_id) => {
                self.edit(customer.telegram_chat_id, message_id, order.id, &body, &markup)
                    .await
            }
            None => {
                self.send_fresh(
                    order,
                    Channel::Customer,
                    customer.telegram_chat_id,
                    &body,
                    &markup,
                )
                .await
            }
        }
    }

    async fn sync_kitchen(
        &self,
        order: &orders::Model,
        items: &[order_items::Model],
        customer: &customers::Model,
        status: OrderStatus,
    ) {
        let markup = render::kitchen_keyboard(order.id, status);
        match order.kitchen_message_id {
            Some(message_id) => {
                let body = render::kitchen_update_body(order, items, customer, status);
                self.edit(self.kitchen_chat_id, message_id, order.id, &body, &markup)
                    .await;
            }
            None if markup.has_buttons() => {
                let body = render::kitchen_creation_body(order, items, customer);
                self.send_fresh(order, Channel::Kitchen, self.kitchen_chat_id, &body, &markup)
                    .await;
                self.drop_pin(order, self.kitchen_chat_id).await;
            }
            None => {}
        }
    }

    async fn sync_courier(
        &self,
        order: &orders::Model,
        items: &[order_items::Model],
        customer: &customers::Model,
        status: OrderStatus,
    ) {
        let markup = render::courier_keyboard(order.id, status);
        match order.courier_message_id {
            Some(message_id) => {
                let body = render::courier_update_body(order, items, customer, status);
                self.edit(self.courier_chat_id, message_id, order.id, &body, &markup)
                    .await;
            }
            None if markup.has_buttons() => {
                let body = render::courier_dispatch_body(order, items, customer);
                self.send_fresh(order, Channel::Courier, self.courier_chat_id, &body, &markup)
                    .await;
                self.drop_pin(order, self.courier_chat_id).await;
            }
            None => {}
        }
    }

    async fn edit(
        &self,
        chat_id: i64,
        message_id: i64,
        order_id: i32,
        body: &str,
        markup: &ReplyMarkup,
    ) {
        if let Err(err) = self
            .transport
            .edit_message(chat_id, message_id, body, Some(markup))
            .await
        {
            tracing::warn!(order_id, chat_id, "message edit failed: {err}");
        }
    }

    async fn send_fresh(
        &self,
        order: &orders::Model,
        channel: Channel,
        chat_id: i64,
        body: &str,
        markup: &ReplyMarkup,
    ) {
        match self.transport.send_message(chat_id, body, Some(markup)).await {
            Ok(message_id) => {
                if let Err(err) = self
                    .store
                    .save_channel_handle(order.id, channel, message_id)
                    .await
                {
                    tracing::warn!(
                        order_id = order.id,
                        channel = channel.as_str(),
                        "could not persist message handle: {err}"
                    );
                }
            }
            Err(err) => {
                tracing::warn!(
                    order_id = order.id,
                    channel = channel.as_str(),
                    "notification send failed: {err}"
                );
            }
        }
    }

    /// Raw location message accompanying the first send to an operator
    /// channel. Not edited later, no handle kept.
    async fn drop_pin(&self, order: &orders::Model, chat_id: i64) {
        if let (Some(lat), Some(lon)) = (order.latitude, order.longitude) {
            if let Err(err) = self.transport.send_location(chat_id, lat, lon).await {
                tracing::warn!(order_id = order.id, chat_id, "location pin failed: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    use crate::models::callback::CallbackAction;
    use crate::models::order::GeoPoint;
    use crate::models::payment::PaymentMethod;
    use crate::services::telegram::{RecordingTransport, SentItem};
    use crate::store::{MemoryStore, NewOrder, NewOrderLine, TransitionChange};

    const CUSTOMER_CHAT: i64 = 777;
    const KITCHEN_CHAT: i64 = -100500;
    const COURIER_CHAT: i64 = -100600;

    fn notifier(
        store: &Arc<MemoryStore>,
        transport: &Arc<RecordingTransport>,
    ) -> OrderNotifier {
        OrderNotifier::new(
            store.clone(),
            transport.clone(),
            KITCHEN_CHAT,
            COURIER_CHAT,
        )
    }

    async fn seeded_order(store: &MemoryStore) -> orders::Model {
        let customer = store
            .upsert_customer(CUSTOMER_CHAT, "Aziz Karimov", "+998901234567")
            .await
            .unwrap();
        store
            .create_order(
                NewOrder {
                    customer_id: customer.id,
                    payment_method: PaymentMethod::Cash,
                    delivery_address: None,
                    location: Some(GeoPoint {
                        latitude: 40.7,
                        longitude: 72.3,
                    }),
                    delivery_distance_km: Some(2.3),
                    delivery_cost: dec!(15000),
                    items_total: dec!(20000),
                    total_price: dec!(35000),
                },
                vec![NewOrderLine {
                    product_name: "Lag'mon".to_string(),
                    unit_price: dec!(10000),
                    quantity: 2,
                }],
            )
            .await
            .unwrap()
    }

    async fn advance(
        store: &MemoryStore,
        order_id: i32,
        from: OrderStatus,
        to: OrderStatus,
    ) -> orders::Model {
        store
            .commit_transition(
                order_id,
                from,
                TransitionChange {
                    to,
                    changed_by: None,
                    note: None,
                    at: Utc::now().fixed_offset(),
                },
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn creation_sync_reaches_customer_and_kitchen_but_not_courier() {
        let store = Arc::new(MemoryStore::default());
        let transport = Arc::new(RecordingTransport::new());
        let order = seeded_order(&store).await;

        notifier(&store, &transport).sync(&order).await;

        let to_customer = transport.sent_to(CUSTOMER_CHAT);
        assert_eq!(to_customer.len(), 1);
        match &to_customer[0] {
            SentItem::Message {
                markup: Some(ReplyMarkup::Inline(keyboard)),
                ..
            } => assert_eq!(
                keyboard.inline_keyboard[0][0].callback_data,
                CallbackAction::MainMenu
            ),
            other => panic!("expected a customer message with a menu button, got {other:?}"),
        }

        let to_kitchen = transport.sent_to(KITCHEN_CHAT);
        assert_eq!(to_kitchen.len(), 2);
        assert!(matches!(to_kitchen[0], SentItem::Message { .. }));
        assert!(matches!(to_kitchen[1], SentItem::Location { .. }));

        assert!(transport.sent_to(COURIER_CHAT).is_empty());

        let stored = store.find_order(order.id).await.unwrap().unwrap();
        assert!(stored.customer_message_id.is_some());
        assert!(stored.kitchen_message_id.is_some());
        assert!(stored.courier_message_id.is_none());
    }

    #[tokio::test]
    async fn later_syncs_edit_in_place_instead_of_resending() {
        let store = Arc::new(MemoryStore::default());
        let transport = Arc::new(RecordingTransport::new());
        let order = seeded_order(&store).await;
        let notifier = notifier(&store, &transport);

        notifier.sync(&order).await;
        let confirmed = advance(&store, order.id, OrderStatus::New, OrderStatus::Confirmed).await;
        notifier.sync(&confirmed).await;

        let to_customer = transport.sent_to(CUSTOMER_CHAT);
        assert_eq!(to_customer.len(), 2);
        assert!(matches!(to_customer[1], SentItem::Edit { .. }));

        let to_kitchen = transport.sent_to(KITCHEN_CHAT);
        assert!(matches!(to_kitchen[2], SentItem::Edit { ref text, .. }
            if text.starts_with("✅ **Buyurtma #1 holati o'zgardi: Tasdiqlangan**")));

        assert!(transport.sent_to(COURIER_CHAT).is_empty());
    }

    #[tokio::test]
    async fn ready_order_dispatches_the_courier_with_a_location_pin() {
        let store = Arc::new(MemoryStore::default());
        let transport = Arc::new(RecordingTransport::new());
        let order = seeded_order(&store).await;

        advance(&store, order.id, OrderStatus::New, OrderStatus::Confirmed).await;
        let ready = advance(&store, order.id, OrderStatus::Confirmed, OrderStatus::Ready).await;
        notifier(&store, &transport).sync(&ready).await;

        let to_courier = transport.sent_to(COURIER_CHAT);
        assert_eq!(to_courier.len(), 2);
        assert!(matches!(to_courier[0], SentItem::Message { ref text, .. }
            if text.starts_with("🚚 **Yetkazib berish uchun yangi buyurtma #1**")));
        assert!(matches!(
            to_courier[1],
            SentItem::Location {
                latitude: lat,
                longitude: lon,
                ..
            } if lat == 40.7 && lon == 72.3
        ));

        let stored = store.find_order(order.id).await.unwrap().unwrap();
        assert!(stored.courier_message_id.is_some());
    }

    #[tokio::test]
    async fn one_unreachable_channel_does_not_block_the_others() {
        let store = Arc::new(MemoryStore::default());
        let transport = Arc::new(RecordingTransport::new());
        transport.fail_chat(CUSTOMER_CHAT);
        let order = seeded_order(&store).await;

        notifier(&store, &transport).sync(&order).await;

        assert!(transport.sent_to(CUSTOMER_CHAT).is_empty());
        assert_eq!(transport.sent_to(KITCHEN_CHAT).len(), 2);

        let stored = store.find_order(order.id).await.unwrap().unwrap();
        assert!(stored.customer_message_id.is_none());
        assert!(stored.kitchen_message_id.is_some());
    }
}
