pub mod config;
pub mod debug;
pub mod marketplace;
pub mod models;
pub mod pricing;
pub mod report;
pub mod repricer;
pub mod sheet;
pub mod spot_price;
pub mod weight;
pub mod workflow;

pub use pricing::{calculate_price, PricingInput, TaxBase};
pub use weight::extract_weight;
