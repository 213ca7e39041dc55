pub use sea_orm_migration::prelude::*;

mod m20260810_000001_create_customers;
mod m20260810_000002_create_categories;
mod m20260810_000003_create_products;
mod m20260811_000001_create_orders;
mod m20260811_000002_create_order_items;
mod m20260811_000003_create_order_status_history;
mod m20260812_000001_create_service_settings;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260810_000001_create_customers::Migration),
            Box::new(m20260810_000002_create_categories::Migration),
            Box::new(m20260810_000003_create_products::Migration),
            Box::new(m20260811_000001_create_orders::Migration),
            Box::new(m20260811_000002_create_order_items::Migration),
            Box::new(m20260811_000003_create_order_status_history::Migration),
            Box::new(m20260812_000001_create_service_settings::Migration),
        ]
    }
}
