//! Admin dashboard counters.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::{internal, Rejection};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct StatsOverview {
    pub products: i64,
    pub active_products: i64,
    pub categories: i64,
    pub orders: i64,
    pub pending_orders: i64,
    pub promotions: i64,
    /// Sum of non-cancelled order totals, in MAD.
    pub revenue: f64,
}

pub async fn overview(State(s): State<AppState>) -> Result<Json<StatsOverview>, Rejection> {
    let (products,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products")
        .fetch_one(&s.db)
        .await
        .map_err(internal)?;
    let (active_products,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM products WHERE is_active")
            .fetch_one(&s.db)
            .await
            .map_err(internal)?;
    let (categories,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM categories")
        .fetch_one(&s.db)
        .await
        .map_err(internal)?;
    let (orders,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders")
        .fetch_one(&s.db)
        .await
        .map_err(internal)?;
    let (pending_orders,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM orders WHERE status = 'pending'")
            .fetch_one(&s.db)
            .await
            .map_err(internal)?;
    let (promotions,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM promotions")
        .fetch_one(&s.db)
        .await
        .map_err(internal)?;
    let (revenue,): (f64,) = sqlx::query_as(
        "SELECT COALESCE(SUM(total_amount), 0) FROM orders WHERE status <> 'cancelled'",
    )
    .fetch_one(&s.db)
    .await
    .map_err(internal)?;

    Ok(Json(StatsOverview {
        products,
        active_products,
        categories,
        orders,
        pending_orders,
        promotions,
        revenue,
    }))
}
