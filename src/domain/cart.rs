//! Shopping cart state, shared process-wide and persisted between runs.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A product snapshot held in the cart.
///
/// `title`, `price` and `image_url` are captured when the item is added and
/// never re-read from the catalog. `price` is the unit price in MAD in
/// effect at add time, promotion included.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: Uuid,
    pub title: String,
    pub price: f64,
    pub image_url: Option<String>,
    pub quantity: u32,
}

/// Fields supplied when adding a product to the cart.
#[derive(Clone, Debug, Deserialize)]
pub struct NewCartItem {
    pub id: Uuid,
    pub title: String,
    pub price: f64,
    pub image_url: Option<String>,
}

/// On-disk shape of the cart state file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CartState {
    items: Vec<CartItem>,
}

/// Why a cart state file could not be rehydrated.
#[derive(Debug, Error)]
pub enum CartStateError {
    #[error("read failed: {0}")]
    Io(#[from] io::Error),
    #[error("malformed state: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Process-wide cart. One instance lives in the app state and every request
/// observes the same view. Items are keyed by product id (at most one line
/// per product) and kept in insertion order.
///
/// Mutations apply in memory first, then write the state file. The write is
/// best-effort: a failure is logged and the in-memory cart stays
/// authoritative for the rest of the process lifetime.
#[derive(Debug)]
pub struct CartStore {
    items: RwLock<Vec<CartItem>>,
    state_path: Option<PathBuf>,
}

impl CartStore {
    /// Store without a state file; contents live for the process only.
    pub fn in_memory() -> Self {
        Self {
            items: RwLock::new(Vec::new()),
            state_path: None,
        }
    }

    /// Store backed by `path`, rehydrated from it when present.
    ///
    /// A missing file starts an empty cart. An unreadable or malformed file
    /// is logged and also falls back to empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let items = match load_state(&path) {
            Ok(items) => items,
            Err(CartStateError::Io(e)) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not rehydrate cart state, starting empty");
                Vec::new()
            }
        };
        Self {
            items: RwLock::new(items),
            state_path: Some(path),
        }
    }

    /// Add one unit of a product. An already-present product id has its
    /// quantity bumped instead of gaining a second line.
    pub fn add_item(&self, item: NewCartItem) {
        let mut items = self.write();
        match items.iter_mut().find(|i| i.id == item.id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(1),
            None => items.push(CartItem {
                id: item.id,
                title: item.title,
                price: item.price,
                image_url: item.image_url,
                quantity: 1,
            }),
        }
        self.persist(&items);
    }

    /// Set the quantity for `id`. Inputs below 1 clamp to 1; removal is only
    /// ever the explicit [`CartStore::remove_item`]. Unknown ids are a no-op.
    pub fn update_quantity(&self, id: Uuid, quantity: i64) {
        let quantity = u32::try_from(quantity.max(1)).unwrap_or(u32::MAX);
        let mut items = self.write();
        let Some(item) = items.iter_mut().find(|i| i.id == id) else {
            return;
        };
        if item.quantity == quantity {
            return;
        }
        item.quantity = quantity;
        self.persist(&items);
    }

    /// Remove the line for `id`. Returns whether anything was removed.
    pub fn remove_item(&self, id: Uuid) -> bool {
        let mut items = self.write();
        let before = items.len();
        items.retain(|i| i.id != id);
        let removed = items.len() < before;
        if removed {
            self.persist(&items);
        }
        removed
    }

    /// Empty the cart.
    pub fn clear(&self) {
        let mut items = self.write();
        items.clear();
        self.persist(&items);
    }

    /// Snapshot of the lines in insertion order.
    pub fn items(&self) -> Vec<CartItem> {
        self.read().clone()
    }

    /// Sum of quantities across all lines (the badge counter), not the
    /// number of distinct products.
    pub fn total_items(&self) -> u32 {
        self.read().iter().map(|i| i.quantity).sum()
    }

    /// Sum of price × quantity in MAD. Display rounding is the caller's.
    pub fn total_price(&self) -> f64 {
        self.read()
            .iter()
            .map(|i| i.price * f64::from(i.quantity))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<CartItem>> {
        self.items.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<CartItem>> {
        self.items.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, items: &[CartItem]) {
        let Some(path) = &self.state_path else { return };
        let state = CartState {
            items: items.to_vec(),
        };
        let bytes = match serde_json::to_vec(&state) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "could not encode cart state");
                return;
            }
        };
        if let Err(e) = fs::write(path, bytes) {
            tracing::warn!(path = %path.display(), error = %e, "could not write cart state, keeping in-memory cart");
        }
    }
}

fn load_state(path: &Path) -> Result<Vec<CartItem>, CartStateError> {
    let bytes = fs::read(path)?;
    let state: CartState = serde_json::from_slice(&bytes)?;
    // Drop zero-quantity lines a tampered file could smuggle in.
    Ok(state.items.into_iter().filter(|i| i.quantity > 0).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scaler(id: Uuid) -> NewCartItem {
        NewCartItem {
            id,
            title: "Ultrasonic Scaler".into(),
            price: 1200.0,
            image_url: None,
        }
    }

    fn compressor(id: Uuid) -> NewCartItem {
        NewCartItem {
            id,
            title: "Dental Compressor".into(),
            price: 8500.0,
            image_url: Some("https://cdn.example/compressor.jpg".into()),
        }
    }

    #[test]
    fn distinct_products_get_their_own_lines() {
        let cart = CartStore::in_memory();
        cart.add_item(scaler(Uuid::new_v4()));
        cart.add_item(compressor(Uuid::new_v4()));
        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.total_items(), 2);
    }

    #[test]
    fn repeated_product_merges_into_one_line() {
        let cart = CartStore::in_memory();
        let id = Uuid::new_v4();
        cart.add_item(scaler(id));
        cart.add_item(scaler(id));
        cart.add_item(scaler(id));
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.total_items(), 3);
    }

    #[test]
    fn total_price_tracks_quantity_updates() {
        let cart = CartStore::in_memory();
        let id = Uuid::new_v4();
        cart.add_item(scaler(id));
        cart.add_item(compressor(Uuid::new_v4()));
        cart.update_quantity(id, 3);
        assert!((cart.total_price() - (3.0 * 1200.0 + 8500.0)).abs() < 1e-9);
    }

    #[test]
    fn non_positive_quantity_clamps_to_one() {
        let cart = CartStore::in_memory();
        let id = Uuid::new_v4();
        cart.add_item(scaler(id));
        cart.update_quantity(id, 0);
        assert_eq!(cart.total_items(), 1);
        cart.update_quantity(id, -5);
        assert_eq!(cart.total_items(), 1);
    }

    #[test]
    fn updating_unknown_id_is_a_noop() {
        let cart = CartStore::in_memory();
        cart.add_item(scaler(Uuid::new_v4()));
        cart.update_quantity(Uuid::new_v4(), 7);
        assert_eq!(cart.total_items(), 1);
    }

    #[test]
    fn remove_item_reports_whether_it_removed() {
        let cart = CartStore::in_memory();
        let id = Uuid::new_v4();
        cart.add_item(scaler(id));
        assert!(cart.remove_item(id));
        assert!(!cart.remove_item(id));
        assert!(cart.is_empty());
    }

    #[test]
    fn clear_empties_everything() {
        let cart = CartStore::in_memory();
        cart.add_item(scaler(Uuid::new_v4()));
        cart.add_item(compressor(Uuid::new_v4()));
        cart.clear();
        assert_eq!(cart.total_items(), 0);
        assert!(cart.items().is_empty());
    }

    #[test]
    fn lines_keep_insertion_order() {
        let cart = CartStore::in_memory();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        cart.add_item(scaler(first));
        cart.add_item(compressor(second));
        cart.add_item(scaler(first));
        let items = cart.items();
        assert_eq!(items[0].id, first);
        assert_eq!(items[1].id, second);
    }

    #[test]
    fn state_round_trips_through_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cart-state.json");
        let id = Uuid::new_v4();

        let cart = CartStore::open(&path);
        cart.add_item(scaler(id));
        cart.add_item(scaler(id));
        cart.add_item(compressor(Uuid::new_v4()));
        let expected = cart.items();
        drop(cart);

        let reloaded = CartStore::open(&path);
        assert_eq!(reloaded.items(), expected);
        assert_eq!(reloaded.total_items(), 3);
    }

    #[test]
    fn missing_state_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cart = CartStore::open(dir.path().join("never-written.json"));
        assert!(cart.is_empty());
    }

    #[test]
    fn malformed_state_file_falls_back_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cart-state.json");
        fs::write(&path, b"{not json").unwrap();

        let cart = CartStore::open(&path);
        assert!(cart.is_empty());

        // The store must stay usable and overwrite the bad file.
        cart.add_item(scaler(Uuid::new_v4()));
        let reloaded = CartStore::open(&path);
        assert_eq!(reloaded.total_items(), 1);
    }

    #[test]
    fn zero_quantity_lines_are_dropped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cart-state.json");
        fs::write(
            &path,
            format!(
                r#"{{"items":[{{"id":"{}","title":"Scaler","price":10.0,"image_url":null,"quantity":0}}]}}"#,
                Uuid::new_v4()
            ),
        )
        .unwrap();

        let cart = CartStore::open(&path);
        assert!(cart.is_empty());
    }
}
