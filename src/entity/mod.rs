pub mod audit_logs;
pub mod carts;
pub mod etickets;
pub mod events;
pub mod orders;
pub mod processed_notifications;
pub mod shipping_addresses;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use carts::Entity as Carts;
pub use etickets::Entity as Etickets;
pub use events::Entity as Events;
pub use orders::Entity as Orders;
pub use processed_notifications::Entity as ProcessedNotifications;
pub use shipping_addresses::Entity as ShippingAddresses;
pub use users::Entity as Users;
