//! Promotion administration and storefront resolution.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::products::Product;
use crate::api::{bad_request, internal, not_found, Rejection};
use crate::domain::promotions::{BestDiscount, Promotion};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub active_only: Option<bool>,
}

/// `active_only` narrows to promotions effective today: flagged active and
/// with today inside their date window.
pub async fn list(
    State(s): State<AppState>,
    Query(p): Query<ListParams>,
) -> Result<Json<Vec<Promotion>>, Rejection> {
    let active_only = p.active_only.unwrap_or(false);
    let today = Utc::now().date_naive();
    let promotions = sqlx::query_as::<_, Promotion>(
        "SELECT * FROM promotions \
         WHERE (NOT $1 OR (is_active AND start_date <= $2 AND end_date >= $2)) \
         ORDER BY created_at DESC",
    )
    .bind(active_only)
    .bind(today)
    .fetch_all(&s.db)
    .await
    .map_err(internal)?;
    Ok(Json(promotions))
}

#[derive(Debug, Deserialize)]
pub struct PromotionPayload {
    pub title: String,
    pub description: Option<String>,
    pub discount_percentage: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: Option<bool>,
}

fn validate(payload: &PromotionPayload) -> Result<(), Rejection> {
    if payload.title.trim().is_empty() {
        return Err(bad_request("title must not be empty"));
    }
    if !(1..=100).contains(&payload.discount_percentage) {
        return Err(bad_request("discount_percentage must be between 1 and 100"));
    }
    if payload.end_date < payload.start_date {
        return Err(bad_request("end_date must not precede start_date"));
    }
    Ok(())
}

pub async fn create(
    State(s): State<AppState>,
    Json(r): Json<PromotionPayload>,
) -> Result<(StatusCode, Json<Promotion>), Rejection> {
    validate(&r)?;
    let promotion = sqlx::query_as::<_, Promotion>(
        "INSERT INTO promotions (id, title, description, discount_percentage, start_date, end_date, is_active) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&r.title)
    .bind(&r.description)
    .bind(r.discount_percentage)
    .bind(r.start_date)
    .bind(r.end_date)
    .bind(r.is_active.unwrap_or(true))
    .fetch_one(&s.db)
    .await
    .map_err(internal)?;
    Ok((StatusCode::CREATED, Json(promotion)))
}

pub async fn update(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<PromotionPayload>,
) -> Result<Json<Promotion>, Rejection> {
    validate(&r)?;
    let promotion = sqlx::query_as::<_, Promotion>(
        "UPDATE promotions SET title = $2, description = $3, discount_percentage = $4, \
         start_date = $5, end_date = $6, is_active = $7 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&r.title)
    .bind(&r.description)
    .bind(r.discount_percentage)
    .bind(r.start_date)
    .bind(r.end_date)
    .bind(r.is_active.unwrap_or(true))
    .fetch_optional(&s.db)
    .await
    .map_err(internal)?
    .ok_or_else(|| not_found("promotion"))?;
    Ok(Json(promotion))
}

pub async fn remove(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, Rejection> {
    let result = sqlx::query("DELETE FROM promotions WHERE id = $1")
        .bind(id)
        .execute(&s.db)
        .await
        .map_err(internal)?;
    if result.rows_affected() == 0 {
        return Err(not_found("promotion"));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_products(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Product>>, Rejection> {
    let products = sqlx::query_as::<_, Product>(
        "SELECT p.* FROM products p \
         JOIN promotion_products pp ON pp.product_id = p.id \
         WHERE pp.promotion_id = $1 ORDER BY p.title",
    )
    .bind(id)
    .fetch_all(&s.db)
    .await
    .map_err(internal)?;
    Ok(Json(products))
}

#[derive(Debug, Deserialize)]
pub struct AssignProductsPayload {
    pub product_ids: Vec<Uuid>,
}

/// Replace a promotion's product set in one transaction, the way the admin
/// screen submits its checkbox list.
pub async fn assign_products(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<AssignProductsPayload>,
) -> Result<StatusCode, Rejection> {
    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM promotions WHERE id = $1")
        .bind(id)
        .fetch_optional(&s.db)
        .await
        .map_err(internal)?;
    if exists.is_none() {
        return Err(not_found("promotion"));
    }

    let mut tx = s.db.begin().await.map_err(internal)?;
    sqlx::query("DELETE FROM promotion_products WHERE promotion_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(internal)?;
    for product_id in &r.product_ids {
        sqlx::query(
            "INSERT INTO promotion_products (promotion_id, product_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(id)
        .bind(product_id)
        .execute(&mut *tx)
        .await
        .map_err(internal)?;
    }
    tx.commit().await.map_err(internal)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ResolveParams {
    /// Comma-separated product ids.
    pub product_ids: String,
    /// Resolution date; defaults to today.
    pub date: Option<NaiveDate>,
}

/// Batch price resolution for product listings: best effective discount per
/// product, products without one omitted.
pub async fn resolve(
    State(s): State<AppState>,
    Query(p): Query<ResolveParams>,
) -> Result<Json<HashMap<Uuid, BestDiscount>>, Rejection> {
    let ids = parse_product_ids(&p.product_ids)?;
    let today = p.date.unwrap_or_else(|| Utc::now().date_naive());
    Ok(Json(s.promotions.resolve_for_products(&ids, today).await))
}

fn parse_product_ids(raw: &str) -> Result<Vec<Uuid>, Rejection> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<Uuid>()
                .map_err(|_| bad_request(format!("invalid product id: {part}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_ids() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let ids = parse_product_ids(&format!("{a}, {b},")).unwrap();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn rejects_garbage_ids() {
        assert!(parse_product_ids("not-a-uuid").is_err());
    }
}
