pub use super::categories::Entity as Categories;
pub use super::customers::Entity as Customers;
pub use super::order_items::Entity as OrderItems;
pub use super::order_status_history::Entity as OrderStatusHistory;
pub use super::orders::Entity as Orders;
pub use super::products::Entity as Products;
pub use super::service_settings::Entity as ServiceSettings;
