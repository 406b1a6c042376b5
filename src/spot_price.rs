//! Sources for the current gold price per gram.

use crate::config::SpotPriceConfig;
use crate::{debug_eprintln, debug_println};
use anyhow::{anyhow, bail, Context, Result};
use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration;

pub trait SpotPriceProvider {
    fn name(&self) -> &str;
    fn spot_price_per_gram(&self) -> Result<f64>;
}

/// Quote API at navasan.tech.
pub struct NavasanProvider {
    client: Client,
    api_url: String,
    api_key: String,
    item: String,
}

impl NavasanProvider {
    pub fn new(config: &SpotPriceConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .context("No spot price API key configured (set NAVASAN_TOKEN)")?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key,
            item: config.item.clone(),
        })
    }
}

impl SpotPriceProvider for NavasanProvider {
    fn name(&self) -> &str {
        "navasan"
    }

    fn spot_price_per_gram(&self) -> Result<f64> {
        debug_println!("Fetching {} quote from {}", self.item, self.api_url);

        let response = self
            .client
            .get(&self.api_url)
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .context("Failed to reach spot price API")?;

        if !response.status().is_success() {
            bail!("Spot price API returned HTTP {}", response.status());
        }

        let body: Value = response
            .json()
            .context("Failed to parse spot price response")?;
        parse_quote(&body, &self.item)
    }
}

/// Reads `body[item].value`, which the API sends as a string or a number.
pub fn parse_quote(body: &Value, item: &str) -> Result<f64> {
    let value = body
        .get(item)
        .and_then(|quote| quote.get("value"))
        .ok_or_else(|| anyhow!("Quote '{}' missing from spot price response", item))?;

    let price = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.replace(',', "").trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| anyhow!("Quote '{}' has a non-numeric value: {}", item, value))?;

    if !price.is_finite() || price <= 0.0 {
        bail!("Quote '{}' is not a positive price: {}", item, price);
    }
    Ok(price)
}

/// A price supplied up front, such as an operator override or a stored default.
pub struct FixedPriceProvider {
    name: String,
    price: f64,
}

impl FixedPriceProvider {
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            price,
        }
    }
}

impl SpotPriceProvider for FixedPriceProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn spot_price_per_gram(&self) -> Result<f64> {
        if !self.price.is_finite() || self.price <= 0.0 {
            bail!("{} price is not positive: {}", self.name, self.price);
        }
        Ok(self.price)
    }
}

/// Tries each provider in order and returns the first price obtained.
#[derive(Default)]
pub struct FallbackChain {
    providers: Vec<Box<dyn SpotPriceProvider>>,
}

impl FallbackChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, provider: impl SpotPriceProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Price together with the name of the provider that produced it.
    pub fn resolve(&self) -> Result<(f64, String)> {
        let mut failures = Vec::new();

        for provider in &self.providers {
            match provider.spot_price_per_gram() {
                Ok(price) => {
                    debug_println!("Spot price {} from {}", price, provider.name());
                    return Ok((price, provider.name().to_string()));
                }
                Err(e) => {
                    debug_eprintln!("Spot price provider {} failed: {:#}", provider.name(), e);
                    failures.push(format!("{}: {:#}", provider.name(), e));
                }
            }
        }

        if failures.is_empty() {
            bail!("No spot price provider configured");
        }
        bail!("All spot price providers failed ({})", failures.join("; "))
    }
}

impl SpotPriceProvider for FallbackChain {
    fn name(&self) -> &str {
        "fallback-chain"
    }

    fn spot_price_per_gram(&self) -> Result<f64> {
        self.resolve().map(|(price, _)| price)
    }
}

/// Builds the provider chain: operator override first, then the quote API,
/// then the stored fallback price.
pub fn build_chain(config: &SpotPriceConfig, override_price: Option<f64>) -> Result<FallbackChain> {
    let mut chain = FallbackChain::new();

    if let Some(price) = override_price {
        chain = chain.with(FixedPriceProvider::new("operator override", price));
    }

    match NavasanProvider::new(config) {
        Ok(provider) => chain = chain.with(provider),
        Err(e) => debug_println!("Quote API disabled: {:#}", e),
    }

    if let Some(price) = config.fallback_gold_price {
        chain = chain.with(FixedPriceProvider::new("stored default", price));
    }

    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Failing;

    impl SpotPriceProvider for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn spot_price_per_gram(&self) -> Result<f64> {
            bail!("connection refused")
        }
    }

    #[test]
    fn parses_string_and_numeric_quotes() {
        let body = json!({ "18ayar": { "value": "6809180", "change": 1200 } });
        assert_eq!(parse_quote(&body, "18ayar").unwrap(), 6_809_180.0);

        let body = json!({ "18ayar": { "value": 6809180 } });
        assert_eq!(parse_quote(&body, "18ayar").unwrap(), 6_809_180.0);

        let body = json!({ "18ayar": { "value": "6,809,180" } });
        assert_eq!(parse_quote(&body, "18ayar").unwrap(), 6_809_180.0);
    }

    #[test]
    fn rejects_missing_or_zero_quote() {
        assert!(parse_quote(&json!({ "usd": { "value": "1" } }), "18ayar").is_err());
        assert!(parse_quote(&json!({ "18ayar": { "value": "0" } }), "18ayar").is_err());
        assert!(parse_quote(&json!({ "18ayar": { "value": "n/a" } }), "18ayar").is_err());
    }

    #[test]
    fn chain_falls_through_to_next_provider() {
        let chain = FallbackChain::new()
            .with(Failing)
            .with(FixedPriceProvider::new("stored default", 6_500_000.0));

        let (price, source) = chain.resolve().unwrap();
        assert_eq!(price, 6_500_000.0);
        assert_eq!(source, "stored default");
    }

    #[test]
    fn chain_reports_every_failure() {
        let chain = FallbackChain::new()
            .with(Failing)
            .with(FixedPriceProvider::new("stored default", 0.0));

        let err = chain.resolve().unwrap_err().to_string();
        assert!(err.contains("failing: connection refused"), "{}", err);
        assert!(err.contains("stored default"), "{}", err);
    }

    #[test]
    fn empty_chain_is_an_error() {
        assert!(FallbackChain::new().spot_price_per_gram().is_err());
    }

    #[test]
    fn override_takes_precedence_without_api_key() {
        let config = SpotPriceConfig {
            fallback_gold_price: Some(1.0),
            ..SpotPriceConfig::default()
        };
        let chain = build_chain(&config, Some(7_000_000.0)).unwrap();
        assert_eq!(chain.resolve().unwrap(), (7_000_000.0, "operator override".to_string()));
    }
}
