use crate::config::PricingConfig;
use crate::debug_println;
use crate::models::{PriceUpdate, ProductRecord};
use crate::pricing::{calculate_price, PricingInput};
use crate::weight::extract_weight;
use std::collections::HashMap;

pub struct RepriceResult {
    pub updates: Vec<PriceUpdate>,
    /// Ids of products whose title carries no weight.
    pub skipped: Vec<String>,
}

impl RepriceResult {
    /// New price per product id, for writing back into the sheet.
    pub fn price_map(&self) -> HashMap<String, i64> {
        self.updates
            .iter()
            .map(|u| (u.product_id.clone(), u.new_price))
            .collect()
    }

    pub fn changed_count(&self) -> usize {
        self.updates.iter().filter(|u| u.is_changed()).count()
    }
}

/// Prices a single product, or `None` if its title has no usable weight.
/// A zero weight is a data error in the listing, not a free product.
pub fn reprice_record(
    record: &ProductRecord,
    gold_price_per_gram: f64,
    config: &PricingConfig,
) -> Option<PriceUpdate> {
    let weight = extract_weight(&record.title).filter(|w| *w > 0.0)?;
    let labor_percentage = config.labor_percentage_for(&record.id);

    let input = PricingInput {
        weight,
        gold_price_per_gram,
        labor_percentage: labor_percentage as f64,
        shop_profit_percentage: config.shop_profit_percentage,
        tax_percentage: config.tax_percentage,
    };
    let new_price = calculate_price(&input, config.tax_base);

    Some(PriceUpdate {
        product_id: record.id.clone(),
        title: record.title.clone(),
        weight,
        labor_percentage,
        old_price: record.old_price,
        new_price,
    })
}

pub fn reprice_all(
    records: &[ProductRecord],
    gold_price_per_gram: f64,
    config: &PricingConfig,
) -> RepriceResult {
    let mut updates = Vec::new();
    let mut skipped = Vec::new();

    for record in records {
        match reprice_record(record, gold_price_per_gram, config) {
            Some(update) => updates.push(update),
            None => {
                debug_println!("No usable weight in title, skipping {}: {}", record.id, record.title);
                skipped.push(record.id.clone());
            }
        }
    }

    RepriceResult { updates, skipped }
}
