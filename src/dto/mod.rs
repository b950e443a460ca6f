pub mod addresses;
pub mod auth;
pub mod cart;
pub mod events;
pub mod tickets;
pub mod webhook;
