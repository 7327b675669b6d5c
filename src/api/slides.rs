//! Homepage slides.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{bad_request, internal, not_found, Rejection};
use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Slide {
    pub id: Uuid,
    pub image_url: String,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub link_url: Option<String>,
    pub display_order: i32,
    pub is_active: bool,
    pub category_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub active_only: Option<bool>,
}

pub async fn list(
    State(s): State<AppState>,
    Query(p): Query<ListParams>,
) -> Result<Json<Vec<Slide>>, Rejection> {
    let active_only = p.active_only.unwrap_or(false);
    let slides = sqlx::query_as::<_, Slide>(
        "SELECT * FROM homepage_slides WHERE (NOT $1 OR is_active) ORDER BY display_order",
    )
    .bind(active_only)
    .fetch_all(&s.db)
    .await
    .map_err(internal)?;
    Ok(Json(slides))
}

#[derive(Debug, Deserialize)]
pub struct SlidePayload {
    pub image_url: String,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub link_url: Option<String>,
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
    pub category_type: Option<String>,
}

pub async fn create(
    State(s): State<AppState>,
    Json(r): Json<SlidePayload>,
) -> Result<(StatusCode, Json<Slide>), Rejection> {
    if r.image_url.trim().is_empty() {
        return Err(bad_request("image_url must not be empty"));
    }
    // New slides go to the end of the carousel unless a position was given.
    let display_order = match r.display_order {
        Some(order) => order,
        None => {
            let (max,): (Option<i32>,) =
                sqlx::query_as("SELECT MAX(display_order) FROM homepage_slides")
                    .fetch_one(&s.db)
                    .await
                    .map_err(internal)?;
            max.map_or(0, |m| m + 1)
        }
    };
    let slide = sqlx::query_as::<_, Slide>(
        "INSERT INTO homepage_slides (id, image_url, title, subtitle, link_url, display_order, is_active, category_type) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&r.image_url)
    .bind(&r.title)
    .bind(&r.subtitle)
    .bind(&r.link_url)
    .bind(display_order)
    .bind(r.is_active.unwrap_or(true))
    .bind(&r.category_type)
    .fetch_one(&s.db)
    .await
    .map_err(internal)?;
    Ok((StatusCode::CREATED, Json(slide)))
}

pub async fn update(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<SlidePayload>,
) -> Result<Json<Slide>, Rejection> {
    if r.image_url.trim().is_empty() {
        return Err(bad_request("image_url must not be empty"));
    }
    let slide = sqlx::query_as::<_, Slide>(
        "UPDATE homepage_slides SET image_url = $2, title = $3, subtitle = $4, link_url = $5, \
         display_order = COALESCE($6, display_order), is_active = $7, category_type = $8 \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&r.image_url)
    .bind(&r.title)
    .bind(&r.subtitle)
    .bind(&r.link_url)
    .bind(r.display_order)
    .bind(r.is_active.unwrap_or(true))
    .bind(&r.category_type)
    .fetch_optional(&s.db)
    .await
    .map_err(internal)?
    .ok_or_else(|| not_found("slide"))?;
    Ok(Json(slide))
}

pub async fn remove(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, Rejection> {
    let result = sqlx::query("DELETE FROM homepage_slides WHERE id = $1")
        .bind(id)
        .execute(&s.db)
        .await
        .map_err(internal)?;
    if result.rows_affected() == 0 {
        return Err(not_found("slide"));
    }
    Ok(StatusCode::NO_CONTENT)
}
