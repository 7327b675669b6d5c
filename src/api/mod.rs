//! HTTP surface. Storefront and admin share one router under `/api/v1`;
//! authentication and session handling sit in front of this service.

pub mod cart;
pub mod categories;
pub mod orders;
pub mod products;
pub mod promotions;
pub mod slides;
pub mod stats;

use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/products", get(products::list).post(products::create))
        .route(
            "/api/v1/products/:id",
            get(products::detail).put(products::update).delete(products::remove),
        )
        .route(
            "/api/v1/products/:id/images",
            get(products::list_images).put(products::replace_images),
        )
        .route("/api/v1/categories", get(categories::list).post(categories::create))
        .route(
            "/api/v1/categories/:id",
            put(categories::update).delete(categories::remove),
        )
        .route(
            "/api/v1/category-images",
            get(categories::list_images).put(categories::upsert_image),
        )
        .route("/api/v1/slides", get(slides::list).post(slides::create))
        .route("/api/v1/slides/:id", put(slides::update).delete(slides::remove))
        .route("/api/v1/promotions", get(promotions::list).post(promotions::create))
        .route("/api/v1/promotions/resolve", get(promotions::resolve))
        .route(
            "/api/v1/promotions/:id",
            put(promotions::update).delete(promotions::remove),
        )
        .route(
            "/api/v1/promotions/:id/products",
            get(promotions::list_products).put(promotions::assign_products),
        )
        .route("/api/v1/cart", get(cart::view).delete(cart::clear))
        .route("/api/v1/cart/items", post(cart::add_item))
        .route(
            "/api/v1/cart/items/:id",
            put(cart::update_quantity).delete(cart::remove_item),
        )
        .route("/api/v1/orders", get(orders::list))
        .route("/api/v1/orders/:id", get(orders::detail))
        .route("/api/v1/orders/:id/status", put(orders::update_status))
        .route("/api/v1/checkout", post(orders::checkout))
        .route("/api/v1/admin/stats", get(stats::overview))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "healthy", "service": "dentastore"}))
}

/// Rejection shape shared by every handler.
pub type Rejection = (StatusCode, String);

pub(crate) fn internal(err: impl std::fmt::Display) -> Rejection {
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

pub(crate) fn not_found(what: &str) -> Rejection {
    (StatusCode::NOT_FOUND, format!("{what} not found"))
}

pub(crate) fn bad_request(msg: impl Into<String>) -> Rejection {
    (StatusCode::BAD_REQUEST, msg.into())
}

/// Envelope for paginated listings.
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
}

/// Normalized `(page, limit, offset)`: pages start at 1, page size defaults
/// to 20 and caps at 100.
pub(crate) fn page_bounds(page: Option<u32>, per_page: Option<u32>) -> (u32, i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let limit = i64::from(per_page.unwrap_or(20).clamp(1, 100));
    (page, limit, i64::from(page - 1) * limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_bounds_defaults_and_caps() {
        assert_eq!(page_bounds(None, None), (1, 20, 0));
        assert_eq!(page_bounds(Some(3), Some(500)), (3, 100, 200));
        assert_eq!(page_bounds(Some(0), Some(0)), (1, 1, 0));
    }
}
