use std::sync::Arc;

use axum::Router;
use chrono::{NaiveTime, Timelike};
use rust_decimal_macros::dec;

use dilkash_backend::config::SettingsSeed;
use dilkash_backend::models::order::GeoPoint;
use dilkash_backend::services::catalog::CatalogService;
use dilkash_backend::services::checkout::CheckoutService;
use dilkash_backend::services::flow::BotFlow;
use dilkash_backend::services::lifecycle::OrderLifecycle;
use dilkash_backend::services::notifier::OrderNotifier;
use dilkash_backend::services::telegram::RecordingTransport;
use dilkash_backend::store::{MemoryStore, OrderStore};
use dilkash_backend::{router, AppState};

pub const KITCHEN_CHAT: i64 = -100500;
pub const COURIER_CHAT: i64 = -100600;

pub const STORE_POINT: GeoPoint = GeoPoint {
    latitude: 40.665236,
    longitude: 72.563908,
};

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub transport: Arc<RecordingTransport>,
}

/// In-memory application with a seeded menu and a recording transport.
/// The service window spans the whole day so wall-clock admission checks
/// pass whenever the suite runs.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(open_all_day()).await
}

#[allow(dead_code)]
pub async fn spawn_app_with(seed: SettingsSeed) -> TestApp {
    let store = Arc::new(MemoryStore::default());
    store.ensure_settings(&seed).await.expect("seed settings");
    let category = store.add_category("Taomlar", 1);
    store.add_product(category.id, "Lag'mon", dec!(15000));
    store.add_product(category.id, "Osh", dec!(20000));
    store.add_product(category.id, "Choy", dec!(5000));

    let transport = Arc::new(RecordingTransport::new());
    let notifier = OrderNotifier::new(
        store.clone() as Arc<dyn OrderStore>,
        transport.clone(),
        KITCHEN_CHAT,
        COURIER_CHAT,
    );
    let catalog = CatalogService::new(store.clone() as Arc<dyn OrderStore>);
    let checkout = CheckoutService::new(
        store.clone() as Arc<dyn OrderStore>,
        catalog.clone(),
        notifier.clone(),
        STORE_POINT,
    );
    let lifecycle = Arc::new(OrderLifecycle::new(
        store.clone() as Arc<dyn OrderStore>,
        notifier,
    ));
    let flow = Arc::new(BotFlow::new(
        store.clone() as Arc<dyn OrderStore>,
        catalog,
        checkout.clone(),
        lifecycle.clone(),
        KITCHEN_CHAT,
        STORE_POINT,
    ));

    let state = AppState {
        store: store.clone() as Arc<dyn OrderStore>,
        checkout,
        lifecycle,
        flow,
    };

    TestApp {
        router: router(state),
        store,
        transport,
    }
}

pub fn open_all_day() -> SettingsSeed {
    SettingsSeed {
        work_start_time: NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
        work_end_time: NaiveTime::from_hms_opt(23, 59, 59).unwrap(),
        ..SettingsSeed::default()
    }
}

/// A one-hour window guaranteed not to contain the current wall-clock time
#[allow(dead_code)]
pub fn closed_right_now() -> SettingsSeed {
    let now = chrono::Local::now().time();
    let (start, end) = if now.hour() < 12 {
        (
            NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
        )
    } else {
        (
            NaiveTime::from_hms_opt(3, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(4, 0, 0).unwrap(),
        )
    };
    SettingsSeed {
        work_start_time: start,
        work_end_time: end,
        ..SettingsSeed::default()
    }
}
