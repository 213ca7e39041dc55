use std::sync::Arc;

use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dilkash_backend::config::{Config, SettingsSeed};
use dilkash_backend::services::catalog::CatalogService;
use dilkash_backend::services::checkout::CheckoutService;
use dilkash_backend::services::flow::BotFlow;
use dilkash_backend::services::lifecycle::OrderLifecycle;
use dilkash_backend::services::notifier::OrderNotifier;
use dilkash_backend::services::telegram::TelegramClient;
use dilkash_backend::store::{DbStore, OrderStore};
use dilkash_backend::AppState;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,dilkash_backend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env().expect("Invalid configuration");

    // Connect to database
    tracing::info!("Connecting to database...");
    let db = Database::connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    tracing::info!("Running migrations...");
    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    let store: Arc<dyn OrderStore> = Arc::new(DbStore::new(db));
    store
        .ensure_settings(&SettingsSeed::default())
        .await
        .expect("Failed to seed service settings");

    let transport = Arc::new(TelegramClient::new(&config.bot_token));
    let notifier = OrderNotifier::new(
        store.clone(),
        transport,
        config.kitchen_chat_id,
        config.courier_chat_id,
    );
    let catalog = CatalogService::new(store.clone());
    let checkout = CheckoutService::new(
        store.clone(),
        catalog.clone(),
        notifier.clone(),
        config.store_location,
    );
    let lifecycle = Arc::new(OrderLifecycle::new(store.clone(), notifier));
    let flow = Arc::new(BotFlow::new(
        store.clone(),
        catalog,
        checkout.clone(),
        lifecycle.clone(),
        config.kitchen_chat_id,
        config.store_location,
    ));

    let state = AppState {
        store,
        checkout,
        lifecycle,
        flow,
    };

    let app = dilkash_backend::router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind server address");

    tracing::info!("Server listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}
