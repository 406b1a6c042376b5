//! Runtime configuration.
//!
//! Settings come from an optional TOML file, then environment variables
//! (a `.env` file in the working directory is loaded first). Secrets are
//! only ever read from the environment or the file, never compiled in.

use crate::debug_println;
use crate::pricing::TaxBase;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub const DEFAULT_LABOR_PERCENTAGE: u32 = 20;
pub const DEFAULT_SHOP_PROFIT_PERCENTAGE: f64 = 7.0;
pub const DEFAULT_TAX_PERCENTAGE: f64 = 10.0;

pub const ENV_MARKETPLACE_TOKEN: &str = "SNAPP_TOKEN";
pub const ENV_SELLER_CODE: &str = "SNAPP_SELLER_CODE";
pub const ENV_SPOT_API_KEY: &str = "NAVASAN_TOKEN";

/// Percentages that feed the price calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Labor percentage per marketplace product id.
    pub product_labor: HashMap<String, u32>,
    pub default_labor_percentage: u32,
    pub shop_profit_percentage: f64,
    pub tax_percentage: f64,
    pub tax_base: TaxBase,
}

impl Default for PricingConfig {
    fn default() -> Self {
        let product_labor = [
            ("MOv6kw", 16),
            ("exLEv4", 18),
            ("za254K", 22),
            ("a8bOMv", 18),
            ("Z4bQR3", 24),
            ("b1byEJ", 18),
            ("dJbV8l", 22),
            ("X9brx7", 30),
        ]
        .into_iter()
        .map(|(id, pct)| (id.to_string(), pct))
        .collect();

        Self {
            product_labor,
            default_labor_percentage: DEFAULT_LABOR_PERCENTAGE,
            shop_profit_percentage: DEFAULT_SHOP_PROFIT_PERCENTAGE,
            tax_percentage: DEFAULT_TAX_PERCENTAGE,
            tax_base: TaxBase::default(),
        }
    }
}

impl PricingConfig {
    /// Labor percentage for a product, falling back to the default on a miss.
    pub fn labor_percentage_for(&self, product_id: &str) -> u32 {
        self.product_labor
            .get(product_id)
            .copied()
            .unwrap_or(self.default_labor_percentage)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketplaceConfig {
    pub base_url: String,
    pub seller_code: String,
    #[serde(skip_serializing)]
    pub token: Option<String>,
    /// Seconds between export status checks.
    pub poll_interval_secs: u64,
    /// Give up waiting for the export after this many status checks.
    pub max_polls: u32,
    pub timeout_secs: u64,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://apix.snappshop.ir".to_string(),
            seller_code: String::new(),
            token: None,
            poll_interval_secs: 60,
            max_polls: 30,
            timeout_secs: 60,
        }
    }
}

impl MarketplaceConfig {
    /// Base URL of the seller's product excel endpoints.
    pub fn excel_url(&self) -> String {
        format!(
            "{}/vendors/v1/{}/inventory/products/excel",
            self.base_url.trim_end_matches('/'),
            self.seller_code
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotPriceConfig {
    pub api_url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Quote item to read from the API response, e.g. 18 karat gold.
    pub item: String,
    /// Stored price per gram used when every other source fails.
    pub fallback_gold_price: Option<f64>,
    pub timeout_secs: u64,
}

impl Default for SpotPriceConfig {
    fn default() -> Self {
        Self {
            api_url: "http://api.navasan.tech/latest/".to_string(),
            api_key: None,
            item: "18ayar".to_string(),
            fallback_gold_price: None,
            timeout_secs: 10,
        }
    }
}

/// Header texts used to locate columns in the marketplace sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetColumns {
    pub id: String,
    pub title: String,
    pub price: String,
    /// Optional second price column kept in sync with `price`.
    pub buy_box_price: Option<String>,
}

impl Default for SheetColumns {
    fn default() -> Self {
        Self {
            id: "ID".to_string(),
            title: "عنوان کالا".to_string(),
            price: "قیمت به تومان".to_string(),
            buy_box_price: Some("قیمت بای باکس".to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pricing: PricingConfig,
    pub marketplace: MarketplaceConfig,
    pub spot_price: SpotPriceConfig,
    pub columns: SheetColumns,
}

impl AppConfig {
    /// Loads the config file (if given and present) and applies environment
    /// overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Ok(env_file) = dotenvy::dotenv() {
            debug_println!("Loaded environment from {}", env_file.display());
        }

        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(path)?,
            Some(path) => {
                debug_println!("Config file {} not found, using defaults", path.display());
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
            .context(format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Overrides secrets and the seller code from the given variable lookup.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = non_empty(ENV_MARKETPLACE_TOKEN) {
            self.marketplace.token = Some(token);
        }
        if let Some(seller) = non_empty(ENV_SELLER_CODE) {
            self.marketplace.seller_code = seller;
        }
        if let Some(key) = non_empty(ENV_SPOT_API_KEY) {
            self.spot_price.api_key = Some(key);
        }
    }
}
