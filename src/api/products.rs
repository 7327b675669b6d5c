//! Product catalog: storefront reads and admin CRUD.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{bad_request, internal, not_found, page_bounds, Paginated, Rejection};
use crate::domain::promotions::ResolvedPromotion;
use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub category: String,
    pub image_url: Option<String>,
    pub stock_quantity: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductImage {
    pub id: Uuid,
    pub product_id: Uuid,
    pub image_url: String,
    pub display_order: i32,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub include_inactive: Option<bool>,
}

pub async fn list(
    State(s): State<AppState>,
    Query(p): Query<ListParams>,
) -> Result<Json<Paginated<Product>>, Rejection> {
    let (page, limit, offset) = page_bounds(p.page, p.per_page);
    let include_inactive = p.include_inactive.unwrap_or(false);
    let search = p.search.map(|term| format!("%{term}%"));

    let products = sqlx::query_as::<_, Product>(
        "SELECT * FROM products \
         WHERE (is_active OR $1) \
           AND ($2::text IS NULL OR category = $2) \
           AND ($3::text IS NULL OR title ILIKE $3) \
         ORDER BY created_at DESC LIMIT $4 OFFSET $5",
    )
    .bind(include_inactive)
    .bind(&p.category)
    .bind(&search)
    .bind(limit)
    .bind(offset)
    .fetch_all(&s.db)
    .await
    .map_err(internal)?;

    let (total,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM products \
         WHERE (is_active OR $1) \
           AND ($2::text IS NULL OR category = $2) \
           AND ($3::text IS NULL OR title ILIKE $3)",
    )
    .bind(include_inactive)
    .bind(&p.category)
    .bind(&search)
    .fetch_one(&s.db)
    .await
    .map_err(internal)?;

    Ok(Json(Paginated { data: products, total, page }))
}

/// Product page payload: the row, today's resolved promotion (if any) and
/// the image gallery.
#[derive(Debug, Serialize)]
pub struct ProductDetail {
    pub product: Product,
    pub promotion: Option<ResolvedPromotion>,
    pub images: Vec<ProductImage>,
}

pub async fn detail(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductDetail>, Rejection> {
    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(&s.db)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("product"))?;

    let today = Utc::now().date_naive();
    let promotion = s
        .promotions
        .resolve_for_product(product.id, product.price, today)
        .await;

    let images = sqlx::query_as::<_, ProductImage>(
        "SELECT * FROM product_images WHERE product_id = $1 ORDER BY display_order",
    )
    .bind(id)
    .fetch_all(&s.db)
    .await
    .map_err(internal)?;

    Ok(Json(ProductDetail { product, promotion, images }))
}

#[derive(Debug, Deserialize)]
pub struct ProductPayload {
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub category: String,
    pub image_url: Option<String>,
    pub stock_quantity: Option<i32>,
    pub is_active: Option<bool>,
}

fn validate(payload: &ProductPayload) -> Result<(), Rejection> {
    if payload.title.trim().is_empty() {
        return Err(bad_request("title must not be empty"));
    }
    if !payload.price.is_finite() || payload.price < 0.0 {
        return Err(bad_request("price must be a non-negative amount"));
    }
    if payload.category.trim().is_empty() {
        return Err(bad_request("category must not be empty"));
    }
    Ok(())
}

pub async fn create(
    State(s): State<AppState>,
    Json(r): Json<ProductPayload>,
) -> Result<(StatusCode, Json<Product>), Rejection> {
    validate(&r)?;
    let product = sqlx::query_as::<_, Product>(
        "INSERT INTO products (id, title, description, price, category, image_url, stock_quantity, is_active) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&r.title)
    .bind(&r.description)
    .bind(r.price)
    .bind(&r.category)
    .bind(&r.image_url)
    .bind(r.stock_quantity.unwrap_or(0))
    .bind(r.is_active.unwrap_or(true))
    .fetch_one(&s.db)
    .await
    .map_err(internal)?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<ProductPayload>,
) -> Result<Json<Product>, Rejection> {
    validate(&r)?;
    let product = sqlx::query_as::<_, Product>(
        "UPDATE products SET title = $2, description = $3, price = $4, category = $5, \
         image_url = $6, stock_quantity = $7, is_active = $8 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&r.title)
    .bind(&r.description)
    .bind(r.price)
    .bind(&r.category)
    .bind(&r.image_url)
    .bind(r.stock_quantity.unwrap_or(0))
    .bind(r.is_active.unwrap_or(true))
    .fetch_optional(&s.db)
    .await
    .map_err(internal)?
    .ok_or_else(|| not_found("product"))?;
    Ok(Json(product))
}

pub async fn remove(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, Rejection> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(&s.db)
        .await
        .map_err(internal)?;
    if result.rows_affected() == 0 {
        return Err(not_found("product"));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_images(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ProductImage>>, Rejection> {
    let images = sqlx::query_as::<_, ProductImage>(
        "SELECT * FROM product_images WHERE product_id = $1 ORDER BY display_order",
    )
    .bind(id)
    .fetch_all(&s.db)
    .await
    .map_err(internal)?;
    Ok(Json(images))
}

#[derive(Debug, Deserialize)]
pub struct ReplaceImagesPayload {
    pub images: Vec<NewProductImage>,
}

#[derive(Debug, Deserialize)]
pub struct NewProductImage {
    pub image_url: String,
    pub display_order: Option<i32>,
}

/// Replace the whole gallery in one transaction, the way the admin screen
/// submits it. Positions default to the submitted order.
pub async fn replace_images(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<ReplaceImagesPayload>,
) -> Result<Json<Vec<ProductImage>>, Rejection> {
    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(&s.db)
        .await
        .map_err(internal)?;
    if exists.is_none() {
        return Err(not_found("product"));
    }

    let mut tx = s.db.begin().await.map_err(internal)?;
    sqlx::query("DELETE FROM product_images WHERE product_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(internal)?;
    for (position, image) in r.images.iter().enumerate() {
        sqlx::query(
            "INSERT INTO product_images (id, product_id, image_url, display_order) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(id)
        .bind(&image.image_url)
        .bind(image.display_order.unwrap_or(position as i32))
        .execute(&mut *tx)
        .await
        .map_err(internal)?;
    }
    tx.commit().await.map_err(internal)?;

    let images = sqlx::query_as::<_, ProductImage>(
        "SELECT * FROM product_images WHERE product_id = $1 ORDER BY display_order",
    )
    .bind(id)
    .fetch_all(&s.db)
    .await
    .map_err(internal)?;
    Ok(Json(images))
}
