//! Final order admission and creation.
//!
//! The single entry point for turning a confirmed cart into a persisted
//! order, shared by the conversational flow and the HTTP order endpoint.
//! Admission re-runs every gate against live data: the service window, the
//! delivery assessment, each cart line against the current catalog, and the
//! minimum order value. Prices and totals are computed here, never taken
//! from the client.

use std::sync::Arc;

use chrono::NaiveTime;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::entities::orders;
use crate::models::order::{CreateOrderRequest, DenialReason, GeoPoint};
use crate::services::cart::DeliveryPlan;
use crate::services::catalog::CatalogService;
use crate::services::notifier::OrderNotifier;
use crate::services::pricing::{self, DeliveryQuote, DeliveryTariff};
use crate::services::service_window::{ServiceWindow, ServiceWindowError};
use crate::store::{NewOrder, NewOrderLine, OrderStore, StoreError};

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("order admission denied: {0}")]
    Denied(DenialReason),
    #[error("product \"{0}\" is not in the live catalog")]
    MissingProduct(String),
    #[error("service window is misconfigured: {0}")]
    Window(#[from] ServiceWindowError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct CheckoutService {
    store: Arc<dyn OrderStore>,
    catalog: CatalogService,
    notifier: OrderNotifier,
    store_location: GeoPoint,
}

impl CheckoutService {
    pub fn new(
        store: Arc<dyn OrderStore>,
        catalog: CatalogService,
        notifier: OrderNotifier,
        store_location: GeoPoint,
    ) -> CheckoutService {
        CheckoutService {
            store,
            catalog,
            notifier,
            store_location,
        }
    }

    pub async fn place_order(
        &self,
        request: CreateOrderRequest,
        quoted: Option<DeliveryPlan>,
    ) -> Result<orders::Model, CheckoutError> {
        self.place_order_at(request, quoted, chrono::Local::now().time())
            .await
    }

    /// Admission and creation with an explicit wall-clock time
    pub async fn place_order_at(
        &self,
        request: CreateOrderRequest,
        quoted: Option<DeliveryPlan>,
        at: NaiveTime,
    ) -> Result<orders::Model, CheckoutError> {
        let settings = self.store.load_settings().await?;
        let window = ServiceWindow::from_settings(&settings)?;
        if !window.contains(at) {
            return Err(CheckoutError::Denied(DenialReason::OutsideServiceHours));
        }

        // An earlier quote keeps its quoted cost but is re-checked against the
        // current radius; a bare location is priced now; no location means no
        // delivery fee.
        let tariff = DeliveryTariff::from_settings(&settings);
        let delivery = match (quoted, request.location) {
            (Some(plan), _) => {
                if plan.distance_km > tariff.max_radius_km {
                    return Err(CheckoutError::Denied(DenialReason::OutsideDeliveryRadius));
                }
                Some(plan)
            }
            (None, Some(point)) => {
                match pricing::assess(&tariff, self.store_location, point) {
                    DeliveryQuote::Feasible { distance_km, cost } => Some(DeliveryPlan {
                        location: point,
                        distance_km,
                        cost,
                    }),
                    DeliveryQuote::OutOfRange { .. } => {
                        return Err(CheckoutError::Denied(DenialReason::OutsideDeliveryRadius));
                    }
                }
            }
            (None, None) => None,
        };

        // Live re-resolution; a renamed or disabled product aborts the whole
        // creation before anything is persisted
        let mut lines = Vec::new();
        let mut items_total = Decimal::ZERO;
        for requested in &request.items {
            if requested.quantity == 0 {
                continue;
            }
            let Some(product) = self.catalog.resolve_for_checkout(&requested.product).await?
            else {
                tracing::warn!(
                    product = %requested.product,
                    "order refused, cart line no longer resolves"
                );
                return Err(CheckoutError::MissingProduct(requested.product.clone()));
            };
            let quantity = requested.quantity as i32;
            items_total += product.price * Decimal::from(quantity);
            lines.push(NewOrderLine {
                product_name: product.name,
                unit_price: product.price,
                quantity,
            });
        }
        if lines.is_empty() {
            return Err(CheckoutError::Denied(DenialReason::EmptyCart));
        }
        if items_total < settings.min_order_value {
            return Err(CheckoutError::Denied(DenialReason::BelowMinimum));
        }

        let customer = self
            .store
            .upsert_customer(request.chat_id, &request.full_name, &request.phone_number)
            .await?;

        let delivery_cost = delivery.as_ref().map(|p| p.cost).unwrap_or(Decimal::ZERO);
        let order = self
            .store
            .create_order(
                NewOrder {
                    customer_id: customer.id,
                    payment_method: request.payment_method,
                    delivery_address: request.delivery_address,
                    location: delivery.as_ref().map(|p| p.location),
                    delivery_distance_km: delivery.as_ref().map(|p| p.distance_km),
                    delivery_cost,
                    items_total,
                    total_price: items_total + delivery_cost,
                },
                lines,
            )
            .await?;

        tracing::info!(
            order_id = order.id,
            order_number = %order.order_number,
            chat_id = request.chat_id,
            total = %order.total_price,
            "order placed"
        );

        self.notifier.sync(&order).await;
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    use crate::config::SettingsSeed;
    use crate::models::order::RequestedLine;
    use crate::models::payment::PaymentMethod;
    use crate::services::telegram::RecordingTransport;
    use crate::store::MemoryStore;

    const STORE_POINT: GeoPoint = GeoPoint {
        latitude: 40.665236,
        longitude: 72.563908,
    };

    fn noon() -> NaiveTime {
        NaiveTime::from_hms_opt(12, 0, 0).unwrap()
    }

    async fn checkout_fixture() -> (Arc<MemoryStore>, Arc<RecordingTransport>, CheckoutService) {
        let store = Arc::new(MemoryStore::default());
        store.ensure_settings(&SettingsSeed::default()).await.unwrap();
        let category = store.add_category("Taomlar", 1);
        store.add_product(category.id, "Lag'mon", dec!(15000));
        store.add_product(category.id, "Choy", dec!(5000));

        let transport = Arc::new(RecordingTransport::new());
        let notifier = OrderNotifier::new(store.clone(), transport.clone(), -1, -2);
        let catalog = CatalogService::new(store.clone());
        let checkout = CheckoutService::new(store.clone(), catalog, notifier, STORE_POINT);
        (store, transport, checkout)
    }

    fn request(items: Vec<RequestedLine>) -> CreateOrderRequest {
        CreateOrderRequest {
            chat_id: 777,
            full_name: "Aziz Karimov".to_string(),
            phone_number: "+998901234567".to_string(),
            payment_method: PaymentMethod::Cash,
            items,
            location: None,
            delivery_address: None,
        }
    }

    fn quoted_plan(distance_km: f64, cost: Decimal) -> DeliveryPlan {
        DeliveryPlan {
            location: GeoPoint {
                latitude: 40.7,
                longitude: 72.6,
            },
            distance_km,
            cost,
        }
    }

    #[tokio::test]
    async fn admitted_cart_becomes_a_priced_order() {
        let (store, transport, checkout) = checkout_fixture().await;

        let order = checkout
            .place_order_at(
                request(vec![
                    RequestedLine {
                        product: "Lag'mon".to_string(),
                        quantity: 2,
                    },
                    RequestedLine {
                        product: "Choy".to_string(),
                        quantity: 1,
                    },
                ]),
                Some(quoted_plan(2.3, dec!(15000))),
                noon(),
            )
            .await
            .unwrap();

        assert_eq!(order.order_number, "1");
        assert_eq!(order.status, "new");
        assert_eq!(order.items_total, dec!(35000));
        assert_eq!(order.delivery_cost, dec!(15000));
        assert_eq!(order.total_price, dec!(50000));

        let items = store.list_order_items(order.id).await.unwrap();
        assert_eq!(items.len(), 2);
        assert!(!transport.sent().is_empty());
    }

    #[tokio::test]
    async fn closed_window_denies_confirmation() {
        let (_store, transport, checkout) = checkout_fixture().await;

        let late = NaiveTime::from_hms_opt(23, 30, 0).unwrap();
        let result = checkout
            .place_order_at(
                request(vec![RequestedLine {
                    product: "Lag'mon".to_string(),
                    quantity: 2,
                }]),
                Some(quoted_plan(2.3, dec!(15000))),
                late,
            )
            .await;
        assert!(matches!(
            result,
            Err(CheckoutError::Denied(DenialReason::OutsideServiceHours))
        ));
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn unresolvable_cart_line_aborts_the_whole_order() {
        let (store, transport, checkout) = checkout_fixture().await;

        let result = checkout
            .place_order_at(
                request(vec![
                    RequestedLine {
                        product: "Lag'mon".to_string(),
                        quantity: 2,
                    },
                    RequestedLine {
                        product: "Osh".to_string(),
                        quantity: 3,
                    },
                ]),
                None,
                noon(),
            )
            .await;
        assert!(matches!(
            result,
            Err(CheckoutError::MissingProduct(ref name)) if name == "Osh"
        ));

        // Nothing persisted, nobody notified
        assert!(store.find_order(1).await.unwrap().is_none());
        assert!(transport.sent().is_empty());

        // A product pulled from sale after browsing aborts the same way
        let lagmon = store
            .find_available_product("Lag'mon")
            .await
            .unwrap()
            .unwrap();
        store.set_product_availability(&lagmon.name, false);
        let result = checkout
            .place_order_at(
                request(vec![RequestedLine {
                    product: "Lag'mon".to_string(),
                    quantity: 2,
                }]),
                None,
                noon(),
            )
            .await;
        assert!(matches!(result, Err(CheckoutError::MissingProduct(_))));

        // An empty draft is an admission denial, not a missing product
        let result = checkout
            .place_order_at(request(Vec::new()), None, noon())
            .await;
        assert!(matches!(
            result,
            Err(CheckoutError::Denied(DenialReason::EmptyCart))
        ));
    }

    #[tokio::test]
    async fn stale_quote_is_rechecked_against_the_current_radius() {
        let (_store, _transport, checkout) = checkout_fixture().await;

        let result = checkout
            .place_order_at(
                request(vec![RequestedLine {
                    product: "Lag'mon".to_string(),
                    quantity: 2,
                }]),
                Some(quoted_plan(12.0, dec!(60000))),
                noon(),
            )
            .await;
        assert!(matches!(
            result,
            Err(CheckoutError::Denied(DenialReason::OutsideDeliveryRadius))
        ));
    }

    #[tokio::test]
    async fn subtotal_below_the_minimum_is_denied() {
        let (_store, _transport, checkout) = checkout_fixture().await;

        let result = checkout
            .place_order_at(
                request(vec![RequestedLine {
                    product: "Choy".to_string(),
                    quantity: 1,
                }]),
                None,
                noon(),
            )
            .await;
        assert!(matches!(
            result,
            Err(CheckoutError::Denied(DenialReason::BelowMinimum))
        ));
    }

    #[tokio::test]
    async fn bare_location_is_priced_at_submission_time() {
        let (_store, _transport, checkout) = checkout_fixture().await;

        // Roughly two kilometers due north of the store
        let mut req = request(vec![RequestedLine {
            product: "Lag'mon".to_string(),
            quantity: 2,
        }]);
        req.location = Some(GeoPoint {
            latitude: STORE_POINT.latitude + 0.018,
            longitude: STORE_POINT.longitude,
        });

        let order = checkout.place_order_at(req, None, noon()).await.unwrap();
        let distance = order.delivery_distance_km.unwrap();
        assert!(distance > 2.0 && distance < 2.01);
        assert_eq!(order.delivery_cost, dec!(15000));
        assert_eq!(order.total_price, dec!(45000));
    }

    #[tokio::test]
    async fn missing_location_places_the_order_without_a_delivery_fee() {
        let (_store, _transport, checkout) = checkout_fixture().await;

        let order = checkout
            .place_order_at(
                request(vec![RequestedLine {
                    product: "Lag'mon".to_string(),
                    quantity: 2,
                }]),
                None,
                noon(),
            )
            .await
            .unwrap();
        assert_eq!(order.delivery_cost, Decimal::ZERO);
        assert!(order.delivery_distance_km.is_none());
        assert_eq!(order.total_price, dec!(30000));
    }

    #[tokio::test]
    async fn repeat_orders_reuse_the_customer_row() {
        let (store, _transport, checkout) = checkout_fixture().await;

        let first = checkout
            .place_order_at(
                request(vec![RequestedLine {
                    product: "Lag'mon".to_string(),
                    quantity: 2,
                }]),
                None,
                noon(),
            )
            .await
            .unwrap();
        let second = checkout
            .place_order_at(
                request(vec![RequestedLine {
                    product: "Lag'mon".to_string(),
                    quantity: 1,
                }]),
                None,
                noon(),
            )
            .await
            .unwrap();

        assert_eq!(first.customer_id, second.customer_id);
        assert_eq!(second.order_number, "2");
        let customer = store.find_customer_by_chat(777).await.unwrap().unwrap();
        assert_eq!(customer.full_name, "Aziz Karimov");
    }
}
