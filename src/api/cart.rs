//! Cart endpoints over the process-wide cart store.
//!
//! This is where the two core pieces meet: adding a product resolves
//! today's effective price first, then snapshots it into the cart. The
//! store and the resolver never call each other.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::products::Product;
use crate::api::{internal, not_found, Rejection};
use crate::domain::cart::{CartItem, CartStore, NewCartItem};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartItem>,
    pub total_items: u32,
    pub total_price: f64,
}

fn view_of(cart: &CartStore) -> CartView {
    CartView {
        items: cart.items(),
        total_items: cart.total_items(),
        total_price: cart.total_price(),
    }
}

pub async fn view(State(s): State<AppState>) -> Json<CartView> {
    Json(view_of(&s.cart))
}

#[derive(Debug, Deserialize)]
pub struct AddItemPayload {
    pub product_id: Uuid,
}

pub async fn add_item(
    State(s): State<AppState>,
    Json(r): Json<AddItemPayload>,
) -> Result<(StatusCode, Json<CartView>), Rejection> {
    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1 AND is_active")
        .bind(r.product_id)
        .fetch_optional(&s.db)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("product"))?;

    let today = Utc::now().date_naive();
    let price = match s
        .promotions
        .resolve_for_product(product.id, product.price, today)
        .await
    {
        Some(promotion) => promotion.discounted_price,
        None => product.price,
    };

    s.cart.add_item(NewCartItem {
        id: product.id,
        title: product.title,
        price,
        image_url: product.image_url,
    });
    Ok((StatusCode::CREATED, Json(view_of(&s.cart))))
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuantityPayload {
    pub quantity: i64,
}

pub async fn update_quantity(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<UpdateQuantityPayload>,
) -> Json<CartView> {
    s.cart.update_quantity(id, r.quantity);
    Json(view_of(&s.cart))
}

pub async fn remove_item(State(s): State<AppState>, Path(id): Path<Uuid>) -> Json<CartView> {
    s.cart.remove_item(id);
    Json(view_of(&s.cart))
}

pub async fn clear(State(s): State<AppState>) -> Json<CartView> {
    s.cart.clear();
    Json(view_of(&s.cart))
}
