//! Categories and their hero images.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{bad_request, internal, not_found, Rejection};
use crate::AppState;

pub const CATEGORY_TYPES: [&str; 2] = ["equipment", "consumable"];

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub category_type: String,
    pub icon_url: Option<String>,
    pub display_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CategoryImage {
    pub id: Uuid,
    pub category_slug: String,
    pub category_type: String,
    pub image_url: String,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub category_type: Option<String>,
    pub include_inactive: Option<bool>,
}

pub async fn list(
    State(s): State<AppState>,
    Query(p): Query<ListParams>,
) -> Result<Json<Vec<Category>>, Rejection> {
    let include_inactive = p.include_inactive.unwrap_or(false);
    let categories = sqlx::query_as::<_, Category>(
        "SELECT * FROM categories \
         WHERE (is_active OR $1) AND ($2::text IS NULL OR category_type = $2) \
         ORDER BY display_order, name",
    )
    .bind(include_inactive)
    .bind(&p.category_type)
    .fetch_all(&s.db)
    .await
    .map_err(internal)?;
    Ok(Json(categories))
}

#[derive(Debug, Deserialize)]
pub struct CategoryPayload {
    pub name: String,
    pub slug: String,
    pub category_type: String,
    pub icon_url: Option<String>,
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}

fn validate(payload: &CategoryPayload) -> Result<(), Rejection> {
    if payload.name.trim().is_empty() {
        return Err(bad_request("name must not be empty"));
    }
    if payload.slug.trim().is_empty() {
        return Err(bad_request("slug must not be empty"));
    }
    if !CATEGORY_TYPES.contains(&payload.category_type.as_str()) {
        return Err(bad_request(format!(
            "category_type must be one of: {}",
            CATEGORY_TYPES.join(", ")
        )));
    }
    Ok(())
}

pub async fn create(
    State(s): State<AppState>,
    Json(r): Json<CategoryPayload>,
) -> Result<(StatusCode, Json<Category>), Rejection> {
    validate(&r)?;
    let category = sqlx::query_as::<_, Category>(
        "INSERT INTO categories (id, name, slug, category_type, icon_url, display_order, is_active) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&r.name)
    .bind(&r.slug)
    .bind(&r.category_type)
    .bind(&r.icon_url)
    .bind(r.display_order.unwrap_or(0))
    .bind(r.is_active.unwrap_or(true))
    .fetch_one(&s.db)
    .await
    .map_err(internal)?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<CategoryPayload>,
) -> Result<Json<Category>, Rejection> {
    validate(&r)?;
    let category = sqlx::query_as::<_, Category>(
        "UPDATE categories SET name = $2, slug = $3, category_type = $4, icon_url = $5, \
         display_order = $6, is_active = $7 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&r.name)
    .bind(&r.slug)
    .bind(&r.category_type)
    .bind(&r.icon_url)
    .bind(r.display_order.unwrap_or(0))
    .bind(r.is_active.unwrap_or(true))
    .fetch_optional(&s.db)
    .await
    .map_err(internal)?
    .ok_or_else(|| not_found("category"))?;
    Ok(Json(category))
}

pub async fn remove(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, Rejection> {
    let result = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(&s.db)
        .await
        .map_err(internal)?;
    if result.rows_affected() == 0 {
        return Err(not_found("category"));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ImageListParams {
    pub category_type: Option<String>,
}

pub async fn list_images(
    State(s): State<AppState>,
    Query(p): Query<ImageListParams>,
) -> Result<Json<Vec<CategoryImage>>, Rejection> {
    let images = sqlx::query_as::<_, CategoryImage>(
        "SELECT * FROM category_images WHERE ($1::text IS NULL OR category_type = $1) \
         ORDER BY category_slug",
    )
    .bind(&p.category_type)
    .fetch_all(&s.db)
    .await
    .map_err(internal)?;
    Ok(Json(images))
}

#[derive(Debug, Deserialize)]
pub struct CategoryImagePayload {
    pub category_slug: String,
    pub category_type: String,
    pub image_url: String,
}

/// One hero image per (slug, type); submitting again replaces it.
pub async fn upsert_image(
    State(s): State<AppState>,
    Json(r): Json<CategoryImagePayload>,
) -> Result<Json<CategoryImage>, Rejection> {
    if !CATEGORY_TYPES.contains(&r.category_type.as_str()) {
        return Err(bad_request(format!(
            "category_type must be one of: {}",
            CATEGORY_TYPES.join(", ")
        )));
    }
    if r.image_url.trim().is_empty() {
        return Err(bad_request("image_url must not be empty"));
    }
    let image = sqlx::query_as::<_, CategoryImage>(
        "INSERT INTO category_images (id, category_slug, category_type, image_url) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (category_slug, category_type) \
         DO UPDATE SET image_url = EXCLUDED.image_url RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&r.category_slug)
    .bind(&r.category_type)
    .bind(&r.image_url)
    .fetch_one(&s.db)
    .await
    .map_err(internal)?;
    Ok(Json(image))
}
