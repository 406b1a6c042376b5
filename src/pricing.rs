//! Retail price calculation for gold products.
//!
//! Labor is charged on the raw gold value, shop profit on gold plus labor, and
//! tax on top of that. Which amount the tax is levied on is selected with
//! [`TaxBase`]. The final amount is rounded half away from zero to a whole
//! currency unit.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Amount the tax percentage is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxBase {
    /// Gold value plus labor plus shop profit.
    #[default]
    Full,
    /// Labor plus shop profit only; the gold value itself is untaxed.
    LaborAndProfitOnly,
}

impl std::str::FromStr for TaxBase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "full" => Ok(TaxBase::Full),
            "labor_and_profit_only" => Ok(TaxBase::LaborAndProfitOnly),
            other => Err(format!(
                "unknown tax base '{}', expected 'full' or 'labor_and_profit_only'",
                other
            )),
        }
    }
}

impl std::fmt::Display for TaxBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaxBase::Full => write!(f, "full"),
            TaxBase::LaborAndProfitOnly => write!(f, "labor_and_profit_only"),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum PricingError {
    #[error("Invalid input: {field} must be a finite non-negative number, got {value}")]
    InvalidInput { field: &'static str, value: f64 },
}

/// Inputs for one price calculation. Percentages are whole numbers (23 = 23%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingInput {
    pub weight: f64,
    pub gold_price_per_gram: f64,
    pub labor_percentage: f64,
    pub shop_profit_percentage: f64,
    pub tax_percentage: f64,
}

impl PricingInput {
    /// Rejects negative or non-finite values. The calculator itself does not
    /// call this; it is meant for boundaries that accept user input.
    pub fn validate(&self) -> Result<(), PricingError> {
        let fields = [
            ("weight", self.weight),
            ("gold_price_per_gram", self.gold_price_per_gram),
            ("labor_percentage", self.labor_percentage),
            ("shop_profit_percentage", self.shop_profit_percentage),
            ("tax_percentage", self.tax_percentage),
        ];
        for (field, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(PricingError::InvalidInput { field, value });
            }
        }
        Ok(())
    }
}

/// Every intermediate amount of a calculation, in calculation order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceBreakdown {
    pub base_price: f64,
    pub labor_cost: f64,
    pub shop_profit: f64,
    pub subtotal: f64,
    pub tax: f64,
    pub unrounded_total: f64,
    pub total: i64,
}

pub fn calculate_breakdown(input: &PricingInput, tax_base: TaxBase) -> PriceBreakdown {
    let base_price = input.weight * input.gold_price_per_gram;
    let labor_cost = base_price * (input.labor_percentage / 100.0);
    let profit_base = base_price + labor_cost;
    let shop_profit = profit_base * (input.shop_profit_percentage / 100.0);
    let subtotal = profit_base + shop_profit;

    let taxable = match tax_base {
        TaxBase::Full => subtotal,
        TaxBase::LaborAndProfitOnly => labor_cost + shop_profit,
    };
    let tax = taxable * (input.tax_percentage / 100.0);
    let unrounded_total = subtotal + tax;

    PriceBreakdown {
        base_price,
        labor_cost,
        shop_profit,
        subtotal,
        tax,
        unrounded_total,
        total: round_currency(unrounded_total),
    }
}

/// Final retail price in whole currency units.
pub fn calculate_price(input: &PricingInput, tax_base: TaxBase) -> i64 {
    calculate_breakdown(input, tax_base).total
}

/// Validates the input before calculating.
pub fn calculate_checked(input: &PricingInput, tax_base: TaxBase) -> Result<i64, PricingError> {
    input.validate()?;
    Ok(calculate_price(input, tax_base))
}

// Half away from zero.
fn round_currency(amount: f64) -> i64 {
    amount.round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(weight: f64, gold: f64, labor: f64, profit: f64, tax: f64) -> PricingInput {
        PricingInput {
            weight,
            gold_price_per_gram: gold,
            labor_percentage: labor,
            shop_profit_percentage: profit,
            tax_percentage: tax,
        }
    }

    #[test]
    fn regression_fixture_full_tax_base() {
        let i = input(0.98, 6_809_180.0, 23.0, 7.0, 10.0);
        assert_eq!(calculate_price(&i, TaxBase::Full), 9_660_564);
    }

    #[test]
    fn regression_fixture_labor_and_profit_tax_base() {
        let i = input(0.98, 6_809_180.0, 23.0, 7.0, 10.0);
        assert_eq!(calculate_price(&i, TaxBase::LaborAndProfitOnly), 8_993_264);
    }

    #[test]
    fn zero_percentages_yield_rounded_gold_value() {
        let i = input(2.37, 5_000_001.0, 0.0, 0.0, 0.0);
        let expected = (2.37_f64 * 5_000_001.0).round() as i64;
        assert_eq!(calculate_price(&i, TaxBase::Full), expected);
        assert_eq!(calculate_price(&i, TaxBase::LaborAndProfitOnly), expected);
    }

    #[test]
    fn zero_weight_yields_zero() {
        let i = input(0.0, 6_809_180.0, 23.0, 7.0, 10.0);
        assert_eq!(calculate_price(&i, TaxBase::Full), 0);
        assert_eq!(calculate_price(&i, TaxBase::LaborAndProfitOnly), 0);
    }

    #[test]
    fn stages_compound_in_order() {
        let b = calculate_breakdown(&input(1.0, 1000.0, 20.0, 10.0, 10.0), TaxBase::Full);
        assert_eq!(b.base_price, 1000.0);
        assert_eq!(b.labor_cost, 200.0);
        assert!((b.shop_profit - 120.0).abs() < 1e-9);
        assert!((b.subtotal - 1320.0).abs() < 1e-9);
        assert!((b.tax - 132.0).abs() < 1e-9);
        assert_eq!(b.total, 1452);

        let b = calculate_breakdown(
            &input(1.0, 1000.0, 20.0, 10.0, 10.0),
            TaxBase::LaborAndProfitOnly,
        );
        assert!((b.tax - 32.0).abs() < 1e-9);
        assert_eq!(b.total, 1352);
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(calculate_price(&input(1.0, 10.5, 0.0, 0.0, 0.0), TaxBase::Full), 11);
        assert_eq!(calculate_price(&input(1.0, 10.49, 0.0, 0.0, 0.0), TaxBase::Full), 10);
    }

    #[test]
    fn negative_inputs_propagate() {
        let i = input(1.0, -1000.0, 0.0, 0.0, 0.0);
        assert_eq!(calculate_price(&i, TaxBase::Full), -1000);
    }

    #[test]
    fn monotonic_in_gold_price() {
        for tax_base in [TaxBase::Full, TaxBase::LaborAndProfitOnly] {
            let mut previous = i64::MIN;
            for step in 0..200 {
                let gold = step as f64 * 37_517.3;
                let price = calculate_price(&input(1.73, gold, 18.0, 7.0, 10.0), tax_base);
                assert!(price >= 0);
                assert!(price >= previous, "price dropped at gold={}", gold);
                previous = price;
            }
        }
    }

    #[test]
    fn calculation_is_idempotent() {
        let i = input(3.21, 6_500_000.0, 24.0, 7.0, 10.0);
        assert_eq!(calculate_price(&i, TaxBase::Full), calculate_price(&i, TaxBase::Full));
    }

    #[test]
    fn checked_calculation_rejects_negative_and_nan() {
        let err = calculate_checked(&input(1.0, 100.0, -5.0, 7.0, 10.0), TaxBase::Full)
            .unwrap_err();
        assert_eq!(
            err,
            PricingError::InvalidInput { field: "labor_percentage", value: -5.0 }
        );
        assert!(calculate_checked(&input(f64::NAN, 100.0, 5.0, 7.0, 10.0), TaxBase::Full).is_err());
        assert_eq!(
            calculate_checked(&input(1.0, 1000.0, 20.0, 10.0, 10.0), TaxBase::Full),
            Ok(1452)
        );
    }

    #[test]
    fn tax_base_parses_from_config_strings() {
        assert_eq!("full".parse::<TaxBase>(), Ok(TaxBase::Full));
        assert_eq!(
            "labor-and-profit-only".parse::<TaxBase>(),
            Ok(TaxBase::LaborAndProfitOnly)
        );
        assert!("labor".parse::<TaxBase>().is_err());
        assert_eq!(TaxBase::LaborAndProfitOnly.to_string(), "labor_and_profit_only");
    }
}
