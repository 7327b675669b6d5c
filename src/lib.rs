//! Dentastore
//!
//! Storefront and administration API for a dental equipment distributor.
//!
//! ## Features
//! - Product catalog by category, with per-product image galleries
//! - Date-windowed percentage promotions resolved to effective prices
//! - Process-wide shopping cart persisted between runs
//! - Checkout producing orders with line-item snapshots
//! - Homepage slides and admin dashboard counters

pub mod api;
pub mod config;
pub mod domain;

use std::sync::Arc;

use crate::domain::cart::CartStore;
use crate::domain::promotions::PromotionResolver;

/// Shared handler state.
///
/// `cart` is the single process-wide cart: every handler clones the same
/// `Arc`, so all requests observe one consistent view.
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub cart: Arc<CartStore>,
    pub promotions: PromotionResolver,
    pub nats: Option<async_nats::Client>,
}
