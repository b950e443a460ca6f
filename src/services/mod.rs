pub mod cart_service;
pub mod event_service;
pub mod inventory;
pub mod order_service;
pub mod shipping_service;
pub mod ticket_service;
pub mod webhook_service;
