//! HTTP handlers.
//!
//! Thin adapters between the HTTP surface and the reservation core: parse,
//! delegate, serialize. All interesting behavior lives behind
//! [`crate::coordinator`] and [`crate::store`].

pub mod health;
pub mod inventory;
pub mod purchase;
