use serde::{Deserialize, Serialize};

/// One product row as read from the marketplace sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: String,
    pub title: String,
    pub old_price: Option<i64>,
}

/// A recalculated price for a single product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub product_id: String,
    pub title: String,
    pub weight: f64,
    pub labor_percentage: u32,
    pub old_price: Option<i64>,
    pub new_price: i64,
}

impl PriceUpdate {
    /// New minus old price, if there was an old price.
    pub fn diff(&self) -> Option<i64> {
        self.old_price.map(|old| self.new_price - old)
    }

    /// Change relative to the old price in percent; 0 when the old price is 0.
    pub fn diff_percent(&self) -> Option<f64> {
        self.old_price.map(|old| {
            if old == 0 {
                0.0
            } else {
                (self.new_price - old) as f64 / old as f64 * 100.0
            }
        })
    }

    pub fn is_changed(&self) -> bool {
        self.old_price != Some(self.new_price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(old_price: Option<i64>, new_price: i64) -> PriceUpdate {
        PriceUpdate {
            product_id: "X9brx7".to_string(),
            title: "انگشتر 1.2 گرم".to_string(),
            weight: 1.2,
            labor_percentage: 30,
            old_price,
            new_price,
        }
    }

    #[test]
    fn diff_against_old_price() {
        let u = update(Some(1_000_000), 1_050_000);
        assert_eq!(u.diff(), Some(50_000));
        assert_eq!(u.diff_percent(), Some(5.0));
        assert!(u.is_changed());
    }

    #[test]
    fn diff_with_zero_or_missing_old_price() {
        assert_eq!(update(Some(0), 500).diff_percent(), Some(0.0));
        assert_eq!(update(None, 500).diff(), None);
        assert_eq!(update(None, 500).diff_percent(), None);
        assert!(!update(Some(500), 500).is_changed());
    }
}
