//! Date-windowed percentage promotions and their resolution to prices.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

/// A promotion row. `start_date` and `end_date` bound the window
/// inclusively; `is_active` is an independent kill switch.
#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct Promotion {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub discount_percentage: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// The best discount in effect for one product on a given day, priced
/// against that product's list price.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResolvedPromotion {
    pub discount_percentage: i32,
    pub discounted_price: f64,
    pub original_price: f64,
    pub promotion_title: String,
}

/// Batch resolution value. Prices are left to the caller since original
/// prices differ per call site.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BestDiscount {
    pub discount_percentage: i32,
    pub promotion_title: String,
}

/// A promotion counts on `today` iff it is flagged active and the date
/// falls inside its window, both ends inclusive.
pub fn is_effective(promotion: &Promotion, today: NaiveDate) -> bool {
    promotion.is_active && promotion.start_date <= today && today <= promotion.end_date
}

/// Price after applying `discount_percentage`. No rounding here; two-decimal
/// display formatting is a presentation concern.
pub fn discounted_price(original_price: f64, discount_percentage: i32) -> f64 {
    original_price * (1.0 - f64::from(discount_percentage) / 100.0)
}

/// Pick the effective promotion with the strictly greatest discount.
/// Equal discounts keep the first one seen.
pub fn best_effective<'a, I>(promotions: I, today: NaiveDate) -> Option<&'a Promotion>
where
    I: IntoIterator<Item = &'a Promotion>,
{
    promotions
        .into_iter()
        .filter(|p| is_effective(p, today))
        .fold(None, |best, p| match best {
            Some(b) if p.discount_percentage <= b.discount_percentage => Some(b),
            _ => Some(p),
        })
}

/// Per-product best pick across `(product_id, promotion)` association rows.
/// Products with no effective promotion are absent from the result, not
/// mapped to a placeholder.
pub fn best_by_product(rows: &[(Uuid, Promotion)], today: NaiveDate) -> HashMap<Uuid, BestDiscount> {
    let mut best: HashMap<Uuid, BestDiscount> = HashMap::new();
    for (product_id, promotion) in rows {
        if !is_effective(promotion, today) {
            continue;
        }
        match best.get(product_id) {
            Some(current) if current.discount_percentage >= promotion.discount_percentage => {}
            _ => {
                best.insert(
                    *product_id,
                    BestDiscount {
                        discount_percentage: promotion.discount_percentage,
                        promotion_title: promotion.title.clone(),
                    },
                );
            }
        }
    }
    best
}

/// One row of the `promotion_products LEFT JOIN promotions` read model.
/// The promotion side is nullable so dangling associations surface as
/// all-NULL columns instead of failing the query.
#[derive(Debug, sqlx::FromRow)]
struct AssociationRow {
    product_id: Uuid,
    promotion_id: Option<Uuid>,
    title: Option<String>,
    description: Option<String>,
    discount_percentage: Option<i32>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    is_active: Option<bool>,
    created_at: Option<DateTime<Utc>>,
}

impl AssociationRow {
    /// Dangling associations yield `None` and are treated as "no promotion".
    fn into_promotion(self) -> Option<(Uuid, Promotion)> {
        Some((
            self.product_id,
            Promotion {
                id: self.promotion_id?,
                title: self.title?,
                description: self.description,
                discount_percentage: self.discount_percentage?,
                start_date: self.start_date?,
                end_date: self.end_date?,
                is_active: self.is_active?,
                created_at: self.created_at?,
            },
        ))
    }
}

/// Read side of promotion resolution. Lookup failures are logged and
/// degrade to "no promotion" so price display never blocks on this table.
#[derive(Clone)]
pub struct PromotionResolver {
    db: PgPool,
}

impl PromotionResolver {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Best effective promotion for one product on `today`, priced against
    /// `original_price`. `None` means the list price stands.
    pub async fn resolve_for_product(
        &self,
        product_id: Uuid,
        original_price: f64,
        today: NaiveDate,
    ) -> Option<ResolvedPromotion> {
        let rows = match self.fetch_associations(&[product_id]).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(%product_id, error = %e, "promotion lookup failed, falling back to list price");
                return None;
            }
        };
        let promotions: Vec<Promotion> = rows
            .into_iter()
            .filter_map(AssociationRow::into_promotion)
            .map(|(_, promotion)| promotion)
            .collect();
        let best = best_effective(&promotions, today)?;
        Some(ResolvedPromotion {
            discount_percentage: best.discount_percentage,
            discounted_price: discounted_price(original_price, best.discount_percentage),
            original_price,
            promotion_title: best.title.clone(),
        })
    }

    /// Best effective discount per product on `today`. Products without one
    /// are simply absent from the map.
    pub async fn resolve_for_products(
        &self,
        product_ids: &[Uuid],
        today: NaiveDate,
    ) -> HashMap<Uuid, BestDiscount> {
        if product_ids.is_empty() {
            return HashMap::new();
        }
        let rows = match self.fetch_associations(product_ids).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(products = product_ids.len(), error = %e, "promotion lookup failed, falling back to list prices");
                return HashMap::new();
            }
        };
        let pairs: Vec<(Uuid, Promotion)> = rows
            .into_iter()
            .filter_map(AssociationRow::into_promotion)
            .collect();
        best_by_product(&pairs, today)
    }

    async fn fetch_associations(
        &self,
        product_ids: &[Uuid],
    ) -> Result<Vec<AssociationRow>, sqlx::Error> {
        sqlx::query_as::<_, AssociationRow>(
            "SELECT pp.product_id, p.id AS promotion_id, p.title, p.description, \
             p.discount_percentage, p.start_date, p.end_date, p.is_active, p.created_at \
             FROM promotion_products pp \
             LEFT JOIN promotions p ON p.id = pp.promotion_id \
             WHERE pp.product_id = ANY($1)",
        )
        .bind(product_ids)
        .fetch_all(&self.db)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn promo(title: &str, pct: i32, start: NaiveDate, end: NaiveDate, active: bool) -> Promotion {
        Promotion {
            id: Uuid::new_v4(),
            title: title.into(),
            description: None,
            discount_percentage: pct,
            start_date: start,
            end_date: end,
            is_active: active,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn highest_discount_wins() {
        let promotions = vec![
            promo("January sale", 10, day(2024, 1, 1), day(2024, 1, 31), true),
            promo("Flash sale", 25, day(2024, 1, 10), day(2024, 1, 20), true),
        ];
        let best = best_effective(&promotions, day(2024, 1, 15)).unwrap();
        assert_eq!(best.discount_percentage, 25);
        assert!((discounted_price(100.0, best.discount_percentage) - 75.0).abs() < 1e-9);
    }

    #[test]
    fn inactive_promotion_is_never_selected() {
        let promotions = vec![promo(
            "Paused",
            50,
            day(2024, 1, 1),
            day(2024, 12, 31),
            false,
        )];
        assert!(best_effective(&promotions, day(2024, 6, 1)).is_none());
    }

    #[test]
    fn dates_outside_the_window_are_never_selected() {
        let promotions = vec![promo("Spring", 20, day(2024, 3, 1), day(2024, 3, 31), true)];
        assert!(best_effective(&promotions, day(2024, 2, 29)).is_none());
        assert!(best_effective(&promotions, day(2024, 4, 1)).is_none());
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let promotions = vec![promo("Spring", 20, day(2024, 3, 1), day(2024, 3, 31), true)];
        assert!(best_effective(&promotions, day(2024, 3, 1)).is_some());
        assert!(best_effective(&promotions, day(2024, 3, 31)).is_some());
    }

    #[test]
    fn equal_discounts_keep_the_first_seen() {
        let promotions = vec![
            promo("First", 15, day(2024, 1, 1), day(2024, 1, 31), true),
            promo("Second", 15, day(2024, 1, 1), day(2024, 1, 31), true),
        ];
        let best = best_effective(&promotions, day(2024, 1, 15)).unwrap();
        assert_eq!(best.title, "First");
    }

    #[test]
    fn discount_arithmetic_is_unrounded() {
        assert!((discounted_price(100.0, 10) - 90.0).abs() < 1e-9);
        assert!((discounted_price(99.99, 33) - 99.99 * 0.67).abs() < 1e-9);
        assert!((discounted_price(50.0, 100)).abs() < 1e-9);
    }

    #[test]
    fn batch_omits_products_without_an_effective_promotion() {
        let promoted = Uuid::new_v4();
        let unpromoted = Uuid::new_v4();
        let rows = vec![
            (
                promoted,
                promo("Live", 10, day(2024, 1, 1), day(2024, 1, 31), true),
            ),
            (
                unpromoted,
                promo("Paused", 40, day(2024, 1, 1), day(2024, 1, 31), false),
            ),
        ];
        let map = best_by_product(&rows, day(2024, 1, 15));
        assert_eq!(map.len(), 1);
        assert!(map.contains_key(&promoted));
        assert!(!map.contains_key(&unpromoted));
    }

    #[test]
    fn batch_keeps_the_best_discount_per_product() {
        let product = Uuid::new_v4();
        let rows = vec![
            (
                product,
                promo("Small", 5, day(2024, 1, 1), day(2024, 1, 31), true),
            ),
            (
                product,
                promo("Big", 30, day(2024, 1, 1), day(2024, 1, 31), true),
            ),
            (
                product,
                promo("Medium", 20, day(2024, 1, 1), day(2024, 1, 31), true),
            ),
        ];
        let map = best_by_product(&rows, day(2024, 1, 15));
        assert_eq!(map[&product].discount_percentage, 30);
        assert_eq!(map[&product].promotion_title, "Big");
    }

    #[test]
    fn dangling_association_rows_are_skipped() {
        let row = AssociationRow {
            product_id: Uuid::new_v4(),
            promotion_id: None,
            title: None,
            description: None,
            discount_percentage: None,
            start_date: None,
            end_date: None,
            is_active: None,
            created_at: None,
        };
        assert!(row.into_promotion().is_none());
    }
}
