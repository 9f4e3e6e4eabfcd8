//! Background services.

pub mod expiry_listener;

pub use expiry_listener::ExpiryListener;
