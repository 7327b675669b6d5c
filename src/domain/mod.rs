//! Core domain logic: the cart store, promotion resolution and order events.

pub mod cart;
pub mod events;
pub mod promotions;
